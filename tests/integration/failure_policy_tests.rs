/*!
 * Failed and timed-out oracle calls under both failure policies
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rentura::acquisition::{PdfTextStrategy, TextAcquirer};
use rentura::aggregation::prompts::ANSWERS_HEADING;
use rentura::aggregation::Aggregator;
use rentura::app_config::FailurePolicy;
use rentura::document::Document;
use rentura::errors::{AnalysisError, ProviderError};
use rentura::evaluation::PromptBatteryRunner;
use rentura::oracle::Oracle;
use rentura::pipeline::AnalysisPipeline;
use rentura::providers::mock::MockOracle;
use rentura::questions::{EvaluationQuestion, QuestionSet};

use crate::common::{self, TimeoutOracle};

const PLACEHOLDER: &str = "Diese Prüfung konnte nicht durchgeführt werden.";

fn questions() -> QuestionSet {
    QuestionSet::new(vec![
        EvaluationQuestion::new("01_kaution", "Ist die Kaution zulässig?"),
        EvaluationQuestion::new("02_nebenkosten", "LANGSAM: Sind die Nebenkosten umlagefähig?"),
        EvaluationQuestion::new("03_kuendigung", "Ist der Kündigungsverzicht wirksam?"),
    ])
}

fn pipeline(oracle: Arc<dyn Oracle>, policy: FailurePolicy) -> AnalysisPipeline {
    AnalysisPipeline::new(
        TextAcquirer::new(10, 15_000).with_strategy(PdfTextStrategy),
        PromptBatteryRunner::new(oracle.clone(), "Du bist Fachanwalt für Mietrecht.", 3)
            .with_policy(policy, PLACEHOLDER),
        Aggregator::new(oracle, "Du bist Fachanwalt für Mietrecht.", 10),
        questions(),
    )
}

fn contract() -> Document {
    Document::new(
        "vertrag.pdf",
        common::make_text_pdf(&["Paragraph 4 Nebenkosten: Der Mieter traegt saemtliche Kosten des Hauses."]),
    )
}

#[tokio::test]
async fn test_analyse_withTimeoutUnderAbort_shouldFailWithEvaluationError() {
    let slow = Arc::new(MockOracle::slow_for("LANGSAM", 5_000));
    let oracle = Arc::new(TimeoutOracle::new(slow, Duration::from_millis(100)));
    let start = Instant::now();

    let err = pipeline(oracle, FailurePolicy::Abort)
        .analyse(&contract())
        .await
        .unwrap_err();

    match &err {
        AnalysisError::Evaluation { question, source } => {
            assert_eq!(question, "02_nebenkosten");
            assert!(matches!(source, ProviderError::Timeout(_)));
        }
        other => panic!("expected evaluation error, got {:?}", other),
    }
    assert_eq!(err.status_code(), 502);
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_analyse_withTimeoutUnderDegrade_shouldUsePlaceholderAndSummarize() -> Result<()> {
    let slow = Arc::new(MockOracle::slow_for("LANGSAM", 5_000));
    let oracle = Arc::new(TimeoutOracle::new(slow.clone(), Duration::from_millis(100)));

    let result = pipeline(oracle, FailurePolicy::Degrade).analyse(&contract()).await?;

    assert_eq!(result.checks.len(), 3);
    assert!(!result.checks[0].failed);
    assert!(result.checks[1].failed);
    assert_eq!(result.checks[1].answer, PLACEHOLDER);
    assert!(!result.checks[2].failed);

    // The synthesis still ran and saw the placeholder
    let summary_request = slow
        .requests()
        .into_iter()
        .find(MockOracle::is_summary_request)
        .expect("summary request");
    assert!(summary_request.user.contains(PLACEHOLDER));
    assert!(!result.issues.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_analyse_withFailingQuestionUnderAbort_shouldNotSummarize() {
    let oracle = Arc::new(MockOracle::failing_for("Kündigungsverzicht"));

    let err = pipeline(oracle.clone(), FailurePolicy::Abort)
        .analyse(&contract())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "evaluation_error");
    assert!(!oracle.requests().iter().any(MockOracle::is_summary_request));
}

#[tokio::test]
async fn test_analyse_withFailingSynthesis_shouldBeAggregationError() {
    let oracle = Arc::new(MockOracle::failing_for(ANSWERS_HEADING));

    let err = tokio_test::assert_err!(pipeline(oracle.clone(), FailurePolicy::Degrade).analyse(&contract()).await);

    assert!(matches!(err, AnalysisError::Aggregation(_)));
    assert_eq!(err.status_code(), 502);
    // All three questions were answered before synthesis failed
    assert_eq!(oracle.call_count(), 4);
}

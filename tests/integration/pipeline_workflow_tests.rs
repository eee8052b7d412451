/*!
 * End-to-end tests: PDF bytes in, analysis result out
 */

use anyhow::Result;
use std::sync::Arc;

use rentura::acquisition::{AcquisitionMethod, OcrStrategy, PdfTextStrategy, TextAcquirer};
use rentura::aggregation::Aggregator;
use rentura::document::Document;
use rentura::evaluation::PromptBatteryRunner;
use rentura::oracle::Oracle;
use rentura::pipeline::AnalysisPipeline;
use rentura::providers::mock::MockOracle;
use rentura::questions::{EvaluationQuestion, QuestionSet};

use crate::common::{self, ScannedPages, ScriptedOcr};

const PAGES: [&str; 3] = [
    "Paragraph 1 Mietsache: Die Wohnung im zweiten Obergeschoss wird vermietet.",
    "Paragraph 2 Kaution: Der Mieter leistet eine Kaution von vier Nettokaltmieten.",
    "Paragraph 3 Renovierung: Der Mieter renoviert alle drei Jahre die Kueche.",
];

#[tokio::test]
async fn test_analyse_withThreePagePdf_shouldAskEveryQuestionAgainstAllPages() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(
        dir.path(),
        &[("02_renovierung", "Sind die Renovierungsklauseln wirksam?"), ("01_kaution", "Ist die Kaution zulässig?")],
    )?;
    let config = common::test_config(&questions);
    let oracle = Arc::new(MockOracle::working());

    let pipeline = AnalysisPipeline::with_oracle(&config, oracle.clone())?;
    let document = Document::new("mietvertrag.pdf", common::make_text_pdf(&PAGES));
    let result = pipeline.analyse(&document).await?;

    let names: Vec<&str> = result.checks.iter().map(|c| c.question.as_str()).collect();
    assert_eq!(names, vec!["01_kaution", "02_renovierung"]);
    assert_eq!(result.checks[0].answer, "Antwort zu: Ist die Kaution zulässig?");
    assert_eq!(result.acquisition.method, AcquisitionMethod::Structural);
    assert_eq!(result.acquisition.page_count, 3);
    assert!(!result.acquisition.truncated);

    // Two questions plus one synthesis call
    assert_eq!(oracle.call_count(), 3);
    for request in oracle.requests().iter().filter(|r| !MockOracle::is_summary_request(r)) {
        assert_eq!(request.system, "Du bist Fachanwalt für Mietrecht.");
        let first = request.user.find("Mietsache").expect("page 1 missing");
        let second = request.user.find("Kaution:").expect("page 2 missing");
        let third = request.user.find("Renovierung:").expect("page 3 missing");
        assert!(first < second && second < third);
    }

    // Every summary entry is a bullet line followed by its severity line
    assert!(!result.summary.is_empty());
    assert!((1..=10).contains(&result.issues.len()));
    assert!(result.unparsed.is_empty(), "unparsed lines: {:?}", result.unparsed);
    assert!(result.issues.iter().all(|issue| (1..=10).contains(&issue.severity)));
    assert!(result.issues.windows(2).all(|pair| pair[0].severity >= pair[1].severity));
    Ok(())
}

#[tokio::test]
async fn test_analyse_withScannedPdf_shouldFallBackToOcr() -> Result<()> {
    common::init_test_logging();
    let oracle: Arc<dyn Oracle> = Arc::new(MockOracle::working());
    let acquirer = TextAcquirer::new(100, 15_000)
        .with_strategy(PdfTextStrategy)
        .with_strategy(OcrStrategy::new(
            Arc::new(ScannedPages { pages: 2 }),
            Arc::new(ScriptedOcr),
            "deu",
            2,
        ));
    let pipeline = AnalysisPipeline::new(
        acquirer,
        PromptBatteryRunner::new(oracle.clone(), "System", 2),
        Aggregator::new(oracle, "System", 10),
        QuestionSet::new(vec![EvaluationQuestion::new("01_kaution", "Kaution?")]),
    );

    // Text layer of a scan: a stamp and nothing else
    let document = Document::new("scan.pdf", common::make_text_pdf(&["Eingang", "23.04."]));
    let result = pipeline.analyse(&document).await?;

    assert_eq!(result.acquisition.method, AcquisitionMethod::Ocr);
    assert_eq!(result.acquisition.page_count, 2);
    assert!(result.acquisition.characters >= 100);
    Ok(())
}

#[tokio::test]
async fn test_analyse_withTinyBudget_shouldTruncateContract() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Kaution?")])?;
    let mut config = common::test_config(&questions);
    config.acquisition.short_text_threshold = 10;
    config.acquisition.max_chars = 40;
    let oracle = Arc::new(MockOracle::working());

    let pipeline = AnalysisPipeline::with_oracle(&config, oracle.clone())?;
    let result = pipeline
        .analyse(&Document::new("vertrag.pdf", common::make_text_pdf(&PAGES)))
        .await?;

    assert!(result.acquisition.truncated);
    assert_eq!(result.acquisition.characters, 40);
    let question_request = &oracle.requests()[0];
    let contract = question_request.user.split("Vertragstext:\n").nth(1).unwrap_or_default();
    assert_eq!(contract.chars().count(), 40);
    Ok(())
}

#[tokio::test]
async fn test_analyse_withShuffledCompletion_shouldKeepQuestionOrder() -> Result<()> {
    let oracle: Arc<dyn Oracle> = Arc::new(MockOracle::shuffled(40));
    let names = ["01_a", "02_b", "03_c", "04_d", "05_e", "06_f"];
    let questions = QuestionSet::new(
        names
            .iter()
            .map(|name| EvaluationQuestion::new(*name, format!("Frage {}", name)))
            .collect(),
    );
    let pipeline = AnalysisPipeline::new(
        TextAcquirer::new(10, 15_000).with_strategy(PdfTextStrategy),
        PromptBatteryRunner::new(oracle.clone(), "System", names.len()),
        Aggregator::new(oracle, "System", 10),
        questions,
    );

    let result = pipeline
        .analyse(&Document::new("vertrag.pdf", common::make_text_pdf(&PAGES)))
        .await?;

    let got: Vec<&str> = result.checks.iter().map(|c| c.question.as_str()).collect();
    assert_eq!(got, names.to_vec());
    for check in &result.checks {
        assert!(check.answer.ends_with(&check.question), "answer belongs to another question: {:?}", check);
    }
    Ok(())
}

#[tokio::test]
async fn test_analyse_withSameInputTwice_shouldProduceSameChecks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Kaution?"), ("02_miete", "Miete?")])?;
    let config = common::test_config(&questions);
    let pipeline = AnalysisPipeline::with_oracle(&config, Arc::new(MockOracle::working()))?;
    let document = Document::new("vertrag.pdf", common::make_text_pdf(&PAGES));

    let first = pipeline.analyse(&document).await?;
    let second = pipeline.analyse(&document).await?;

    assert_eq!(first.checks, second.checks);
    assert_eq!(first.summary, second.summary);
    assert_ne!(first.run_id, second.run_id);
    Ok(())
}

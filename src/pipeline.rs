/*!
 * Pipeline orchestration: document in, analysis result out.
 *
 * Stages run strictly in sequence:
 * `Received -> Acquiring -> Evaluating -> Aggregating -> Completed`,
 * and any failure moves the run to `Failed`. Runs share nothing mutable, so
 * one pipeline can serve any number of concurrent runs.
 */

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::acquisition::{AcquiredText, AcquisitionMethod, TextAcquirer};
use crate::aggregation::{Aggregator, Issue};
use crate::app_config::Config;
use crate::document::Document;
use crate::errors::AnalysisError;
use crate::evaluation::{PromptBatteryRunner, Verdict};
use crate::oracle::{Oracle, OracleService};
use crate::questions::QuestionSet;

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Acquiring,
    Evaluating,
    Aggregating,
    Completed,
    /// Terminal failure with the error classification
    Failed(String),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Acquiring => write!(f, "acquiring"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Callback invoked on every stage transition
pub type StageObserver = Arc<dyn Fn(&PipelineStage) + Send + Sync>;

/// How the text of the analysed document was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub method: AcquisitionMethod,
    pub page_count: usize,
    /// Characters handed to the evaluation stage
    pub characters: usize,
    pub truncated: bool,
}

impl From<&AcquiredText> for AcquisitionReport {
    fn from(acquired: &AcquiredText) -> Self {
        Self {
            method: acquired.method,
            page_count: acquired.page_count,
            characters: acquired.char_count(),
            truncated: acquired.truncated,
        }
    }
}

/// Output of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// One verdict per question, in question order
    pub checks: Vec<Verdict>,
    /// Synthesized summary in the two-line issue format
    pub summary: String,
    /// Issues parsed from the summary, most severe first
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Summary lines that did not fit the issue format
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
    pub acquisition: AcquisitionReport,
    pub run_id: String,
}

/// Sequences acquisition, evaluation and aggregation
pub struct AnalysisPipeline {
    acquirer: TextAcquirer,
    runner: PromptBatteryRunner,
    aggregator: Aggregator,
    questions: QuestionSet,
    observer: Option<StageObserver>,
}

impl AnalysisPipeline {
    pub fn new(
        acquirer: TextAcquirer,
        runner: PromptBatteryRunner,
        aggregator: Aggregator,
        questions: QuestionSet,
    ) -> Self {
        Self {
            acquirer,
            runner,
            aggregator,
            questions,
            observer: None,
        }
    }

    /// Build the production pipeline. Every configuration problem surfaces
    /// here, before any document is processed.
    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        config.validate()?;
        let oracle: Arc<dyn Oracle> = Arc::new(OracleService::from_config(&config.oracle)?);
        Self::with_oracle(config, oracle)
    }

    /// Build a pipeline around a given oracle, loading questions and
    /// acquisition settings from the config
    pub fn with_oracle(config: &Config, oracle: Arc<dyn Oracle>) -> Result<Self, AnalysisError> {
        let questions = QuestionSet::load_from_dir(&config.evaluation.questions_dir)?;
        let acquirer = TextAcquirer::from_config(&config.acquisition);
        let runner = PromptBatteryRunner::from_config(
            oracle.clone(),
            &config.evaluation,
            config.oracle.get_concurrent_requests(),
        );
        let aggregator = Aggregator::new(
            oracle,
            config.evaluation.system_prompt.clone(),
            config.evaluation.max_issues,
        );

        Ok(Self::new(acquirer, runner, aggregator, questions))
    }

    pub fn with_observer(mut self, observer: StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    fn transition(&self, run_id: &Uuid, stage: PipelineStage) {
        info!("[run {}] {}", run_id, stage);
        if let Some(observer) = &self.observer {
            observer(&stage);
        }
    }

    /// Analyse one document
    pub async fn analyse(&self, document: &Document) -> Result<AnalysisResult, AnalysisError> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            "[run {}] Analysing {} ({} bytes)",
            run_id,
            document.filename,
            document.len()
        );
        self.transition(&run_id, PipelineStage::Received);

        match self.run_stages(&run_id, document).await {
            Ok(result) => {
                self.transition(&run_id, PipelineStage::Completed);
                info!("[run {}] Finished in {:.1?}", run_id, start.elapsed());
                Ok(result)
            }
            Err(e) => {
                error!("[run {}] {}", run_id, e);
                self.transition(&run_id, PipelineStage::Failed(e.kind().to_string()));
                Err(e)
            }
        }
    }

    async fn run_stages(&self, run_id: &Uuid, document: &Document) -> Result<AnalysisResult, AnalysisError> {
        self.transition(run_id, PipelineStage::Acquiring);
        let acquired = self.acquirer.acquire(document).await?;
        info!(
            "[run {}] Acquired {} characters via {} from {} page(s)",
            run_id,
            acquired.char_count(),
            acquired.method,
            acquired.page_count
        );

        self.transition(run_id, PipelineStage::Evaluating);
        let checks = self.runner.run(&acquired.text, &self.questions).await?;

        self.transition(run_id, PipelineStage::Aggregating);
        let summary = self.aggregator.aggregate(&checks).await?;

        Ok(AnalysisResult {
            checks,
            summary: summary.text,
            issues: summary.parsed.issues,
            unparsed: summary.parsed.unparsed,
            acquisition: AcquisitionReport::from(&acquired),
            run_id: run_id.to_string(),
        })
    }
}

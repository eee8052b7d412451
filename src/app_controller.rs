use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::document::Document;
use crate::oracle::{Oracle, OracleService};
use crate::pipeline::{AnalysisPipeline, AnalysisResult, PipelineStage};
use crate::questions::QuestionSet;
use crate::server::NOT_A_PDF_MESSAGE;

// @module: Application controller for the command line

/// Runs CLI commands against a validated configuration
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Oracle override, used instead of the configured provider
    oracle: Option<Arc<dyn Oracle>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config, oracle: None })
    }

    /// Controller that sends every request to the given oracle
    pub fn with_oracle(config: Config, oracle: Arc<dyn Oracle>) -> Result<Self> {
        Ok(Self {
            config,
            oracle: Some(oracle),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the analysis pipeline; configuration problems surface here
    pub fn build_pipeline(&self) -> Result<AnalysisPipeline> {
        let pipeline = match &self.oracle {
            Some(oracle) => AnalysisPipeline::with_oracle(&self.config, oracle.clone())?,
            None => AnalysisPipeline::from_config(&self.config)?,
        };
        Ok(pipeline)
    }

    /// Analyse a PDF on disk, showing a spinner with the current stage
    pub async fn analyse_file(&self, input_file: &Path) -> Result<AnalysisResult> {
        let start_time = std::time::Instant::now();

        let document = Document::from_path(input_file).await?;
        if !document.has_pdf_name() {
            return Err(anyhow!("{}: {}", NOT_A_PDF_MESSAGE, input_file.display()));
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let observer_spinner = spinner.clone();
        let pipeline = self.build_pipeline()?.with_observer(Arc::new(move |stage: &PipelineStage| {
            let message = match stage {
                PipelineStage::Received => "Dokument empfangen".to_string(),
                PipelineStage::Acquiring => "Text wird gelesen".to_string(),
                PipelineStage::Evaluating => "Prüfungen laufen".to_string(),
                PipelineStage::Aggregating => "Zusammenfassung wird erstellt".to_string(),
                PipelineStage::Completed => "Fertig".to_string(),
                PipelineStage::Failed(reason) => format!("Fehlgeschlagen: {}", reason),
            };
            observer_spinner.set_message(message);
        }));

        let result = pipeline.analyse(&document).await;
        spinner.finish_and_clear();

        let result = result.with_context(|| format!("Analysis of {} failed", input_file.display()))?;
        info!(
            "Analysed {} in {:.1?}: {} checks, {} issues",
            document.filename,
            start_time.elapsed(),
            result.checks.len(),
            result.issues.len()
        );
        if result.checks.iter().any(|check| check.failed) {
            warn!("Some checks failed and carry a placeholder answer");
        }

        Ok(result)
    }

    /// The question battery in evaluation order
    pub fn list_questions(&self) -> Result<QuestionSet> {
        Ok(QuestionSet::load_from_dir(&self.config.evaluation.questions_dir)?)
    }

    /// Check that the configured provider answers; returns its description
    pub async fn check_connection(&self) -> Result<String> {
        let service = OracleService::from_config(&self.config.oracle)?;
        service
            .test_connection()
            .await
            .with_context(|| format!("Failed to connect to {}", service.describe()))?;
        Ok(service.describe())
    }

    /// Human-readable report: summary first, then every check
    pub fn render_report(result: &AnalysisResult) -> String {
        let mut report = String::new();

        let _ = writeln!(report, "Zusammenfassung");
        let _ = writeln!(report, "===============");
        let _ = writeln!(report, "{}", result.summary);

        let _ = writeln!(report);
        let _ = writeln!(report, "Einzelprüfungen");
        let _ = writeln!(report, "===============");
        for check in &result.checks {
            let marker = if check.failed { " (fehlgeschlagen)" } else { "" };
            let _ = writeln!(report, "\n## {}{}\n{}", check.question, marker, check.answer);
        }

        if result.acquisition.truncated {
            let _ = writeln!(
                report,
                "\nHinweis: Der Vertragstext wurde auf {} Zeichen gekürzt.",
                result.acquisition.characters
            );
        }

        report
    }

    /// Write output to a file, or to stdout when no path is given
    pub fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
        match output {
            Some(path) => {
                std::fs::write(path, contents)
                    .with_context(|| format!("Failed to write output file: {}", path.display()))?;
                info!("Wrote {}", path.display());
            }
            None => println!("{}", contents),
        }
        Ok(())
    }
}

/*!
 * Aggregation: compress all verdicts into a short, ranked issue list.
 *
 * A single synthesis call produces the summary text. The text is returned as
 * the oracle wrote it; the structured issues are parsed from it separately
 * and never affect the text.
 */

use log::{info, warn};
use std::sync::Arc;

use crate::errors::{AnalysisError, ProviderError};
use crate::evaluation::Verdict;
use crate::oracle::{Oracle, OracleRequest};

pub mod issues;
pub mod prompts;

pub use issues::{parse_summary, Issue, IssueSummary};

/// Result of the synthesis step
#[derive(Debug, Clone)]
pub struct Summary {
    /// Trimmed synthesis text in the two-line issue format
    pub text: String,
    /// Issues parsed from `text`, at most `max_issues`
    pub parsed: IssueSummary,
}

pub struct Aggregator {
    oracle: Arc<dyn Oracle>,
    system_prompt: String,
    max_issues: usize,
}

impl Aggregator {
    pub fn new(oracle: Arc<dyn Oracle>, system_prompt: impl Into<String>, max_issues: usize) -> Self {
        Self {
            oracle,
            system_prompt: system_prompt.into(),
            max_issues: max_issues.max(1),
        }
    }

    pub fn max_issues(&self) -> usize {
        self.max_issues
    }

    /// Synthesize the summary. All or nothing: any failure is an
    /// [`AnalysisError::Aggregation`].
    pub async fn aggregate(&self, verdicts: &[Verdict]) -> Result<Summary, AnalysisError> {
        let message = prompts::summary_message(verdicts, self.max_issues)
            .map_err(|e| AnalysisError::Aggregation(ProviderError::RequestFailed(e.to_string())))?;
        let request = OracleRequest::new(self.system_prompt.clone(), message);

        let text = self
            .oracle
            .ask(&request)
            .await
            .map_err(AnalysisError::Aggregation)?
            .trim()
            .to_string();

        let parsed = parse_summary(&text, self.max_issues);
        if !parsed.unparsed.is_empty() {
            warn!(
                "{} summary line(s) did not match the issue format",
                parsed.unparsed.len()
            );
        }
        info!("Summary lists {} issue(s)", parsed.issues.len());

        Ok(Summary { text, parsed })
    }
}

/*!
 * Evaluation: one oracle verdict per question.
 */

use serde::{Deserialize, Serialize};

pub mod prompts;
pub mod runner;

pub use runner::PromptBatteryRunner;

/// The answer to one evaluation question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Name of the question
    #[serde(rename = "prompt")]
    pub question: String,
    /// Trimmed oracle answer, or the placeholder when the call failed
    pub answer: String,
    /// Set when the answer is a placeholder for a failed call
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl Verdict {
    pub fn answered(question: impl Into<String>, answer: &str) -> Self {
        Self {
            question: question.into(),
            answer: answer.trim().to_string(),
            failed: false,
        }
    }

    pub fn placeholder(question: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: placeholder.into(),
            failed: true,
        }
    }
}

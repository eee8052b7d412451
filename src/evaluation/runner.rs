use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{EvaluationConfig, FailurePolicy};
use crate::errors::AnalysisError;
use crate::oracle::Oracle;
use crate::questions::QuestionSet;

use super::prompts::question_request;
use super::Verdict;

/// Applies every question to the acquired text.
///
/// Questions are sent concurrently, up to `concurrency` at a time. Each
/// request carries only its own instruction and the contract text, so no
/// verdict depends on another. Verdicts come back in question order.
pub struct PromptBatteryRunner {
    oracle: Arc<dyn Oracle>,
    system_prompt: String,
    concurrency: usize,
    policy: FailurePolicy,
    placeholder_answer: String,
}

impl PromptBatteryRunner {
    pub fn new(oracle: Arc<dyn Oracle>, system_prompt: impl Into<String>, concurrency: usize) -> Self {
        Self {
            oracle,
            system_prompt: system_prompt.into(),
            concurrency: concurrency.max(1),
            policy: FailurePolicy::default(),
            placeholder_answer: String::new(),
        }
    }

    pub fn from_config(oracle: Arc<dyn Oracle>, config: &EvaluationConfig, concurrency: usize) -> Self {
        Self::new(oracle, config.system_prompt.clone(), concurrency)
            .with_policy(config.failure_policy, config.placeholder_answer.clone())
    }

    /// Set what happens when a single question fails
    pub fn with_policy(mut self, policy: FailurePolicy, placeholder_answer: impl Into<String>) -> Self {
        self.policy = policy;
        self.placeholder_answer = placeholder_answer.into();
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run the battery.
    ///
    /// Under [`FailurePolicy::Abort`] the first failed call ends the run and
    /// the calls still in flight are dropped. Under [`FailurePolicy::Degrade`]
    /// a failed call yields a placeholder verdict.
    pub async fn run(&self, contract_text: &str, questions: &QuestionSet) -> Result<Vec<Verdict>, AnalysisError> {
        let start = Instant::now();
        let total = questions.len();
        info!(
            "Evaluating {} questions with {} (up to {} at once)",
            total,
            self.oracle.describe(),
            self.concurrency
        );

        // Each call owns its request, so the stream borrows nothing from `self`
        let calls: Vec<_> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let oracle = Arc::clone(&self.oracle);
                let request = question_request(&self.system_prompt, question, contract_text);
                let name = question.name.clone();
                async move {
                    let result = oracle.ask(&request).await;
                    (index, name, result)
                }
            })
            .collect();
        let mut calls = stream::iter(calls).buffer_unordered(self.concurrency);

        let mut verdicts = Vec::with_capacity(total);
        while let Some((index, name, result)) = calls.next().await {
            match result {
                Ok(answer) => {
                    debug!("Verdict {}/{} '{}' received", verdicts.len() + 1, total, name);
                    verdicts.push((index, Verdict::answered(name, &answer)));
                }
                Err(source) => match self.policy {
                    FailurePolicy::Abort => {
                        error!("Question '{}' failed, aborting: {}", name, source);
                        return Err(AnalysisError::Evaluation { question: name, source });
                    }
                    FailurePolicy::Degrade => {
                        warn!("Question '{}' failed, using placeholder: {}", name, source);
                        verdicts.push((index, Verdict::placeholder(name, self.placeholder_answer.clone())));
                    }
                },
            }
        }

        // Completion order is arbitrary; question order is not
        verdicts.sort_by_key(|(index, _)| *index);

        info!("Evaluated {} questions in {:.1?}", total, start.elapsed());
        Ok(verdicts.into_iter().map(|(_, verdict)| verdict).collect())
    }
}

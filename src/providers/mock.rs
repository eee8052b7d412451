/*!
 * Mock oracle for testing.
 *
 * This module provides a scriptable oracle that simulates different behaviors:
 * - `MockOracle::working()` - Always answers; synthesis requests get a well-formed summary
 * - `MockOracle::failing()` - Always fails with an error
 * - `MockOracle::slow(ms)` - Answers after a delay (for timeout testing)
 * - `MockOracle::failing_for(needle)` - Fails only requests mentioning `needle`
 * - `MockOracle::shuffled(max_ms)` - Answers after a per-request pseudo-random delay
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::aggregation::prompts::ANSWERS_HEADING;
use crate::errors::ProviderError;
use crate::oracle::{Oracle, OracleRequest};

/// Behavior mode for the mock oracle
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with a server error
    Failing,
    /// Succeeds after a fixed delay
    Slow { delay_ms: u64 },
    /// Fails requests whose user message contains the needle
    FailFor { needle: String },
    /// Sleeps for `delay_ms` on requests whose user message contains the needle
    SlowFor { needle: String, delay_ms: u64 },
    /// Succeeds after a delay derived from the request text
    Shuffled { max_delay_ms: u64 },
}

/// Mock oracle recording every request it receives
#[derive(Debug, Clone)]
pub struct MockOracle {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Requests in arrival order
    requests: Arc<Mutex<Vec<OracleRequest>>>,
    /// Custom answer generator (optional)
    responder: Option<fn(&OracleRequest) -> String>,
}

impl MockOracle {
    /// Create a new mock oracle with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn failing_for(needle: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailFor { needle: needle.into() })
    }

    pub fn slow_for(needle: impl Into<String>, delay_ms: u64) -> Self {
        Self::new(MockBehavior::SlowFor {
            needle: needle.into(),
            delay_ms,
        })
    }

    pub fn shuffled(max_delay_ms: u64) -> Self {
        Self::new(MockBehavior::Shuffled { max_delay_ms })
    }

    /// Set a custom answer generator
    pub fn with_responder(mut self, responder: fn(&OracleRequest) -> String) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }

    /// Whether a request is a synthesis request rather than a question
    pub fn is_summary_request(request: &OracleRequest) -> bool {
        request.user.contains(ANSWERS_HEADING)
    }

    /// A summary in the two-line issue format with `count` issues
    pub fn generate_summary(count: usize) -> String {
        (0..count)
            .map(|i| {
                format!(
                    "• Problem {}\nWahrscheinlichkeit der Unwirksamkeit (wobei 10 bedeutet, dass die Klausel sicher unwirksam ist): {}/10",
                    i + 1,
                    (i % 10) + 1
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn default_answer(request: &OracleRequest) -> String {
        if Self::is_summary_request(request) {
            return Self::generate_summary(2);
        }
        let first_line = request.user.lines().next().unwrap_or_default();
        format!("  Antwort zu: {}  \n", first_line)
    }

    fn answer(&self, request: &OracleRequest) -> String {
        match self.responder {
            Some(responder) => responder(request),
            None => Self::default_answer(request),
        }
    }

    /// Deterministic delay in [0, max) derived from the request text
    fn shuffled_delay(request: &OracleRequest, max_delay_ms: u64) -> u64 {
        if max_delay_ms == 0 {
            return 0;
        }
        let hash = request
            .user
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
        hash % max_delay_ms
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn ask(&self, request: &OracleRequest) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match &self.behavior {
            MockBehavior::Working => Ok(self.answer(request)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated oracle failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(self.answer(request))
            }

            MockBehavior::FailFor { needle } => {
                if request.user.contains(needle.as_str()) {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated failure for '{}'", needle),
                        status_code: 503,
                    })
                } else {
                    Ok(self.answer(request))
                }
            }

            MockBehavior::SlowFor { needle, delay_ms } => {
                if request.user.contains(needle.as_str()) {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                }
                Ok(self.answer(request))
            }

            MockBehavior::Shuffled { max_delay_ms } => {
                let delay = Self::shuffled_delay(request, *max_delay_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(self.answer(request))
            }
        }
    }

    fn describe(&self) -> String {
        format!("mock ({:?})", self.behavior)
    }
}

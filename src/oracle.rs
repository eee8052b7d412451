/*!
 * The oracle: an opaque text-in/text-out reasoning service.
 *
 * `OracleService` wraps the configured provider client and adds the per-call
 * timeout and retry policy. Everything above this module only sees the
 * [`Oracle`] trait.
 */

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use std::time::Duration;

use crate::app_config::{OracleConfig, OracleProvider};
use crate::errors::{AnalysisError, ProviderError};
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

/// A single oracle call: a system role and one user message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub system: String,
    pub user: String,
}

impl OracleRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Text reasoning service used for question evaluation and synthesis
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one request and return the answer text
    async fn ask(&self, request: &OracleRequest) -> Result<String, ProviderError>;

    /// Human-readable description, e.g. "OpenAI (gpt-4.1)"
    fn describe(&self) -> String {
        "oracle".to_string()
    }
}

/// Provider client variants
enum OracleProviderImpl {
    OpenAI { client: OpenAI },
    /// LM Studio local server (OpenAI-compatible)
    LMStudio { client: OpenAI },
    Anthropic { client: Anthropic },
    Ollama { client: Ollama },
}

/// Sampling temperature sent with every request, so repeated runs agree
pub const PINNED_TEMPERATURE: f32 = 0.0;

/// Oracle backed by a real provider
pub struct OracleService {
    provider: OracleProviderImpl,
    kind: OracleProvider,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry_count: u32,
    retry_backoff_ms: u64,
    rate_limit: Option<u32>,
}

impl OracleService {
    /// Build the service for the active provider.
    ///
    /// A hosted provider without a resolvable API key is a configuration error.
    pub fn from_config(config: &OracleConfig) -> Result<Self, AnalysisError> {
        let api_key = config.resolve_api_key()?;
        if config.provider.requires_api_key() && api_key.is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "No API key configured for {}",
                config.provider.display_name()
            )));
        }

        let model = config.get_model();
        let endpoint = config.get_endpoint();
        let timeout = Duration::from_secs(config.get_timeout_secs());

        let provider = match config.provider {
            OracleProvider::OpenAI => OracleProviderImpl::OpenAI {
                client: OpenAI::new(api_key, endpoint, model.clone(), timeout),
            },
            OracleProvider::LMStudio => {
                // LM Studio accepts any key
                let api_key = if api_key.is_empty() { "lm-studio".to_string() } else { api_key };
                OracleProviderImpl::LMStudio {
                    client: OpenAI::new(api_key, endpoint, model.clone(), timeout),
                }
            }
            OracleProvider::Anthropic => OracleProviderImpl::Anthropic {
                client: Anthropic::new(api_key, endpoint, model.clone(), timeout),
            },
            OracleProvider::Ollama => OracleProviderImpl::Ollama {
                client: Ollama::new(endpoint, timeout),
            },
        };

        Ok(Self {
            provider,
            kind: config.provider.clone(),
            model,
            max_tokens: config.common.max_tokens,
            timeout,
            retry_count: config.common.retry_count,
            retry_backoff_ms: config.common.retry_backoff_ms,
            rate_limit: config.get_rate_limit(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn temperature(&self) -> f32 {
        PINNED_TEMPERATURE
    }

    /// Check that the provider is reachable and accepts our credentials
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            OracleProviderImpl::OpenAI { client } | OracleProviderImpl::LMStudio { client } => {
                client.test_connection().await
            }
            OracleProviderImpl::Anthropic { client } => client.test_connection().await,
            OracleProviderImpl::Ollama { client } => client.test_connection().await,
        }
    }

    async fn complete_once(&self, request: &OracleRequest) -> Result<String, ProviderError> {
        match &self.provider {
            OracleProviderImpl::OpenAI { client } | OracleProviderImpl::LMStudio { client } => {
                let chat = OpenAIRequest::new(self.model.clone())
                    .add_message("system", request.system.clone())
                    .add_message("user", request.user.clone())
                    .temperature(PINNED_TEMPERATURE)
                    .max_tokens(self.max_tokens);
                let response = client.complete(chat).await?;
                self.log_usage(response.token_usage(), response.is_truncated());
                Ok(OpenAI::extract_text(&response))
            }
            OracleProviderImpl::Anthropic { client } => {
                let message = AnthropicRequest::new(self.model.clone(), self.max_tokens)
                    .system(request.system.clone())
                    .temperature(PINNED_TEMPERATURE)
                    .add_message("user", request.user.clone());
                let response = client.complete(message).await?;
                self.log_usage(response.token_usage(), response.is_truncated());
                Ok(Anthropic::extract_text(&response))
            }
            OracleProviderImpl::Ollama { client } => {
                let chat = ChatRequest::new(self.model.clone())
                    .add_message("system", request.system.clone())
                    .add_message("user", request.user.clone())
                    .temperature(PINNED_TEMPERATURE)
                    .num_predict(self.max_tokens);
                let response = client.complete(chat).await?;
                Ok(Ollama::extract_text(&response))
            }
        }
    }

    fn log_usage(&self, usage: Option<(u64, u64)>, truncated: bool) {
        if let Some((prompt_tokens, completion_tokens)) = usage {
            debug!(
                "{} used {} prompt and {} completion tokens",
                self.kind.display_name(),
                prompt_tokens,
                completion_tokens
            );
        }
        if truncated {
            warn!(
                "{} answer was cut off at the limit of {} tokens",
                self.kind.display_name(),
                self.max_tokens
            );
        }
    }

    /// Retry transient failures with exponential backoff
    async fn complete_with_retry(&self, request: &OracleRequest) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry_count => {
                    attempt += 1;
                    let delay = retry_delay(self.retry_backoff_ms, attempt, self.rate_limit);
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        self.kind.display_name(),
                        e,
                        attempt,
                        self.retry_count,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): the doubled backoff, but
/// never less than the rate limit interval
pub fn retry_delay(backoff_base_ms: u64, attempt: u32, rate_limit: Option<u32>) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let backoff_ms = backoff_base_ms.saturating_mul(1u64 << shift);
    let rate_ms = rate_limit
        .filter(|rpm| *rpm > 0)
        .map(|rpm| 60_000 / rpm as u64)
        .unwrap_or(0);
    Duration::from_millis(backoff_ms.max(rate_ms))
}

#[async_trait]
impl Oracle for OracleService {
    async fn ask(&self, request: &OracleRequest) -> Result<String, ProviderError> {
        debug!(
            "Oracle request to {} ({} characters)",
            self.describe(),
            request.user.chars().count()
        );

        match tokio::time::timeout(self.timeout, self.complete_with_retry(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.kind.display_name(), self.model)
    }
}

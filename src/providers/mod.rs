/*!
 * Oracle provider clients.
 *
 * This module contains client implementations for the supported LLM services:
 * - OpenAI: chat completions API (also used for LM Studio, which speaks the same protocol)
 * - Anthropic: messages API
 * - Ollama: local LLM server
 * - Mock: scriptable oracle for tests
 */

use async_trait::async_trait;
use log::error;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the oracle service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    ///
    /// # Arguments
    /// * `response` - The response from the provider
    ///
    /// # Returns
    /// * `String` - The extracted text
    fn extract_text(response: &Self::Response) -> String;
}

/// Turn a non-success HTTP response into a provider error, logging the body
pub(crate) async fn error_from_response(service: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", service, status, error_text);
    ProviderError::from_status(status.as_u16(), error_text)
}

/// First 500 characters of a response body, for log lines
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > 500 {
        text.chars().take(500).collect()
    } else {
        text.to_string()
    }
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

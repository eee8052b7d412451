/*!
 * Error types for the rentura application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an oracle provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not finish within its time budget
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether a retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::Timeout(_) => false,
        }
    }

    /// Map an HTTP status and body returned by a provider to an error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Terminal classification of a failed analysis run.
///
/// Every run that does not complete ends in exactly one of these.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The document could not be read by any acquisition strategy
    #[error("Document could not be read: {0}")]
    Acquisition(String),

    /// The oracle call for a single question failed
    #[error("Evaluation of '{question}' failed: {source}")]
    Evaluation {
        /// Name of the question whose call failed
        question: String,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// The synthesis call failed
    #[error("Summary synthesis failed: {0}")]
    Aggregation(#[source] ProviderError),

    /// Missing credential, missing questions or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    /// Short machine-readable classification of the error
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Acquisition(_) => "acquisition_error",
            Self::Evaluation { .. } => "evaluation_error",
            Self::Aggregation(_) => "aggregation_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// HTTP status used when the error crosses the upload endpoint
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Acquisition(_) => 422,
            Self::Evaluation { .. } | Self::Aggregation(_) => 502,
            Self::Configuration(_) => 500,
        }
    }

    /// Message safe to show to a client: the classification and the
    /// top-level reason, without provider response bodies.
    pub fn public_message(&self) -> String {
        match self {
            Self::Acquisition(_) => "Das Dokument konnte nicht gelesen werden.".to_string(),
            Self::Evaluation { question, .. } => {
                format!("Die Prüfung '{}' ist fehlgeschlagen.", question)
            }
            Self::Aggregation(_) => "Die Zusammenfassung konnte nicht erstellt werden.".to_string(),
            Self::Configuration(_) => "Der Dienst ist nicht korrekt konfiguriert.".to_string(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from an analysis run
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Process exit code for the command line (sysexits-style)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::File(_) => 74,
            Self::Provider(_) => 69,
            Self::Analysis(AnalysisError::Acquisition(_)) => 65,
            Self::Analysis(AnalysisError::Configuration(_)) => 78,
            Self::Analysis(_) => 69,
            Self::Unknown(_) => 1,
        }
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<AnalysisError>() {
            Ok(analysis) => return Self::Analysis(analysis),
            Err(error) => error,
        };
        let error = match error.downcast::<ProviderError>() {
            Ok(provider) => return Self::Provider(provider),
            Err(error) => error,
        };
        match error.downcast::<std::io::Error>() {
            Ok(io) => Self::File(io.to_string()),
            Err(error) => Self::Unknown(format!("{:#}", error)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::AnalysisError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Oracle (LLM provider) config
    pub oracle: OracleConfig,

    /// Text acquisition settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Question battery and summary settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Upload endpoint settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Oracle provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl OracleProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Hosted providers refuse requests without a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: File holding the API key, read at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds per oracle call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: OracleProvider) -> Self {
        let (model, endpoint, rate_limit) = match provider_type {
            OracleProvider::OpenAI => (default_openai_model(), default_openai_endpoint(), Some(60)),
            OracleProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint(), Some(45)),
            OracleProvider::Ollama => (default_ollama_model(), default_ollama_endpoint(), None),
            OracleProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint(), None),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            api_key_file: None,
            endpoint,
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            rate_limit,
        }
    }
}

/// Oracle service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: OracleProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: OracleCommonConfig,
}

/// Common oracle settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleCommonConfig {
    /// Retry count for transient failures, within the call timeout
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of tokens the oracle may generate per answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OracleCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Settings for turning a PDF into text
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AcquisitionConfig {
    /// Structural text shorter than this (in characters) triggers OCR
    #[serde(default = "default_short_text_threshold")]
    pub short_text_threshold: usize,

    /// Character budget of the text handed to the oracle
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Tesseract language code(s), e.g. "deu" or "deu+eng"
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Render resolution for OCR
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,

    /// Pages rendered and recognized at the same time
    #[serde(default = "default_ocr_concurrency")]
    pub ocr_concurrency: usize,

    /// Timeout for a single external tool invocation
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    /// Path to poppler's pdftoppm
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: String,

    /// Path to the tesseract binary
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            short_text_threshold: default_short_text_threshold(),
            max_chars: default_max_chars(),
            ocr_language: default_ocr_language(),
            ocr_dpi: default_ocr_dpi(),
            ocr_concurrency: default_ocr_concurrency(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            pdftoppm_path: default_pdftoppm_path(),
            tesseract_path: default_tesseract_path(),
        }
    }
}

/// What happens to a run when one question's oracle call fails
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole run with the first evaluation error
    #[default]
    Abort,
    /// Record a placeholder verdict and continue to the summary
    Degrade,
}

impl std::str::FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "degrade" => Ok(Self::Degrade),
            _ => Err(anyhow!("Invalid failure policy: {}", s)),
        }
    }
}

/// Question battery and summary settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvaluationConfig {
    /// Directory holding one `*.txt` file per question
    #[serde(default = "default_questions_dir")]
    pub questions_dir: PathBuf,

    /// System role sent with every oracle request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Policy for failed question calls
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Answer recorded for a failed question under the degrade policy
    #[serde(default = "default_placeholder_answer")]
    pub placeholder_answer: String,

    /// Upper bound of issues in the summary
    #[serde(default = "default_max_issues")]
    pub max_issues: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            questions_dir: default_questions_dir(),
            system_prompt: default_system_prompt(),
            failure_policy: FailurePolicy::default(),
            placeholder_answer: default_placeholder_answer(),
            max_issues: default_max_issues(),
        }
    }
}

/// Upload endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Largest accepted upload body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Environment variable consulted when no key is configured
pub const API_KEY_ENV: &str = "RENTURA_API_KEY";

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_short_text_threshold() -> usize {
    100
}

fn default_max_chars() -> usize {
    15_000
}

fn default_ocr_language() -> String {
    "deu".to_string()
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_ocr_concurrency() -> usize {
    2
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_pdftoppm_path() -> String {
    "pdftoppm".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_questions_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_system_prompt() -> String {
    "Du bist Fachanwalt für Mietrecht.".to_string()
}

fn default_placeholder_answer() -> String {
    "Diese Prüfung konnte nicht durchgeführt werden.".to_string()
}

fn default_max_issues() -> usize {
    10
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// Everything checked here is a startup condition: a config that passes
    /// never produces a `Configuration` error in the middle of a run.
    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        let endpoint = self.oracle.get_endpoint();
        url::Url::parse(&endpoint).map_err(|e| {
            AnalysisError::Configuration(format!("Invalid oracle endpoint '{}': {}", endpoint, e))
        })?;

        if self.oracle.provider.requires_api_key() && self.oracle.resolve_api_key()?.is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "API key is required for {} provider (set api_key, api_key_file or {})",
                self.oracle.provider.display_name(),
                API_KEY_ENV
            )));
        }

        if self.oracle.get_concurrent_requests() == 0 {
            return Err(AnalysisError::Configuration("concurrent_requests must be at least 1".into()));
        }

        if self.acquisition.max_chars == 0 {
            return Err(AnalysisError::Configuration("max_chars must be at least 1".into()));
        }

        if self.acquisition.ocr_concurrency == 0 {
            return Err(AnalysisError::Configuration("ocr_concurrency must be at least 1".into()));
        }

        if self.evaluation.max_issues == 0 {
            return Err(AnalysisError::Configuration("max_issues must be at least 1".into()));
        }

        if !self.evaluation.questions_dir.is_dir() {
            return Err(AnalysisError::Configuration(format!(
                "Question directory does not exist: {}",
                self.evaluation.questions_dir.display()
            )));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            oracle: OracleConfig::default(),
            acquisition: AcquisitionConfig::default(),
            evaluation: EvaluationConfig::default(),
            server: ServerConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl OracleConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &OracleProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created on demand
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        ProviderConfig::new(self.provider.clone()).model
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        ProviderConfig::new(self.provider.clone()).endpoint
    }

    /// Get the max concurrent requests for the active provider
    pub fn get_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the per-call timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit,
            None => ProviderConfig::new(self.provider.clone()).rate_limit,
        }
    }

    /// Resolve the API key for the active provider.
    ///
    /// Order: inline `api_key`, then `api_key_file`, then the
    /// `RENTURA_API_KEY` environment variable. A configured key file that
    /// cannot be read is an error even if the environment holds a key.
    pub fn resolve_api_key(&self) -> std::result::Result<String, AnalysisError> {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return Ok(provider_config.api_key.clone());
            }

            if let Some(key_path) = &provider_config.api_key_file {
                let key = std::fs::read_to_string(key_path).map_err(|e| {
                    AnalysisError::Configuration(format!(
                        "API key file missing: {} ({})",
                        key_path.display(),
                        e
                    ))
                })?;
                return Ok(key.trim().to_string());
            }
        }

        Ok(std::env::var(API_KEY_ENV).map(|k| k.trim().to_string()).unwrap_or_default())
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            available_providers: vec![
                ProviderConfig::new(OracleProvider::OpenAI),
                ProviderConfig::new(OracleProvider::Anthropic),
                ProviderConfig::new(OracleProvider::Ollama),
                ProviderConfig::new(OracleProvider::LMStudio),
            ],
            common: OracleCommonConfig::default(),
        }
    }
}

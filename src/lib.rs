/*!
 * # Rentura - rental contract review with AI
 *
 * A Rust library that reads a German rental contract (PDF), asks a fixed
 * battery of legal questions about it and condenses the answers into a
 * ranked list of problematic clauses.
 *
 * ## Features
 *
 * - Text acquisition from digital PDFs, with OCR fallback for scans
 * - Concurrent question evaluation through various AI providers:
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Severity-ranked issue summary with structured parsing
 * - HTTP upload endpoint
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Uploaded documents
 * - `acquisition`: PDF text layer and OCR strategies, normalization
 * - `questions`: The evaluation question battery
 * - `oracle`: Provider dispatch with timeout and retry
 * - `evaluation`: Per-question verdicts
 * - `aggregation`: Summary synthesis and issue parsing
 * - `pipeline`: Stage sequencing and the analysis result
 * - `server`: HTTP upload endpoint
 * - `app_controller`: Command line front end
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod acquisition;
pub mod aggregation;
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod evaluation;
pub mod oracle;
pub mod pipeline;
pub mod providers;
pub mod questions;
pub mod server;

// Re-export main types for easier usage
pub use acquisition::{AcquiredText, AcquisitionMethod, TextAcquirer};
pub use aggregation::{Aggregator, Issue, IssueSummary};
pub use app_config::{Config, FailurePolicy};
pub use document::Document;
pub use errors::{AnalysisError, AppError, ProviderError};
pub use evaluation::{PromptBatteryRunner, Verdict};
pub use oracle::{Oracle, OracleRequest, OracleService};
pub use pipeline::{AnalysisPipeline, AnalysisResult, PipelineStage};
pub use questions::{EvaluationQuestion, QuestionSet};

// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rentura::app_config::{self, Config, FailurePolicy, OracleProvider};
use rentura::app_controller::Controller;
use rentura::errors::AppError;
use rentura::pipeline::AnalysisPipeline;
use rentura::server;

/// CLI Wrapper for OracleProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOracleProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliOracleProvider> for OracleProvider {
    fn from(cli_provider: CliOracleProvider) -> Self {
        match cli_provider {
            CliOracleProvider::Ollama => OracleProvider::Ollama,
            CliOracleProvider::OpenAI => OracleProvider::OpenAI,
            CliOracleProvider::Anthropic => OracleProvider::Anthropic,
            CliOracleProvider::LMStudio => OracleProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for FailurePolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFailurePolicy {
    Abort,
    Degrade,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli_policy: CliFailurePolicy) -> Self {
        match cli_policy {
            CliFailurePolicy::Abort => FailurePolicy::Abort,
            CliFailurePolicy::Degrade => FailurePolicy::Degrade,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a rental contract PDF (default command)
    #[command(alias = "analyze")]
    Analyse(AnalyseArgs),

    /// List the evaluation questions in the order they are asked
    Questions,

    /// Serve the HTTP upload endpoint
    Serve {
        /// Address to bind, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Check that the configured provider is reachable
    Check,

    /// Generate shell completions for rentura
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct AnalyseArgs {
    /// Contract PDF to analyse
    #[arg(value_name = "PDF")]
    input_file: PathBuf,

    /// Print the result as JSON instead of a report
    #[arg(short, long)]
    json: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to do when a single question fails
    #[arg(long, value_enum)]
    policy: Option<CliFailurePolicy>,
}

/// Rentura - rental contract review with AI
///
/// Reads a German rental contract, asks a battery of legal questions about it
/// and condenses the answers into a ranked list of problematic clauses.
#[derive(Parser, Debug)]
#[command(name = "rentura")]
#[command(version)]
#[command(about = "AI-assisted review of German rental contracts")]
#[command(long_about = "Rentura reads a rental contract PDF (OCR for scans), evaluates it with an AI provider and lists the most severe issues.

EXAMPLES:
    rentura vertrag.pdf                          # Analyse using default config
    rentura analyse --json vertrag.pdf           # Print the full result as JSON
    rentura -p ollama -m llama3.1 vertrag.pdf    # Use specific provider and model
    rentura analyse --policy degrade vertrag.pdf # Keep going when a question fails
    rentura questions                            # Show the question battery
    rentura serve --bind 127.0.0.1:8000          # Start the upload endpoint
    rentura completions bash > rentura.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The API key can also come from RENTURA_API_KEY.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key, default: gpt-4.1)
    anthropic - Anthropic Claude API (requires API key)
    ollama    - Local Ollama server
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Contract PDF to analyse
    #[arg(value_name = "PDF")]
    input_file: Option<PathBuf>,

    /// Oracle provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliOracleProvider>,

    /// Model name to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Dependencies (hyper, reqwest) stay quiet below warn
        metadata.level() <= self.level
            && (metadata.target().starts_with("rentura") || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() {
    // Logger starts at trace so the config can lower it later
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to install logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(AppError::from(e).exit_code());
    }
}

async fn run(cli: CommandLineOptions) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "rentura", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(level_filter(&config.log_level));

    match cli.command {
        Some(Commands::Analyse(args)) => run_analyse(config, args).await,
        Some(Commands::Questions) => run_questions(config),
        Some(Commands::Serve { bind }) => run_serve(config, bind).await,
        Some(Commands::Check) => run_check(config).await,
        Some(Commands::Completions { .. }) => Ok(()),
        None => {
            let input_file = cli
                .input_file
                .ok_or_else(|| anyhow!("PDF is required when no subcommand is specified"))?;
            let args = AnalyseArgs {
                input_file,
                json: false,
                output: None,
                policy: None,
            };
            run_analyse(config, args).await
        }
    }
}

/// Load or create the configuration file, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);
        let config = Config::default();
        config.write_to_file(config_path)?;
        config
    };

    if let Some(provider) = &cli.provider {
        config.oracle.provider = provider.clone().into();
    }

    if let Some(model) = &cli.model {
        config.oracle.active_provider_config_mut().model = model.clone();
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

async fn run_analyse(mut config: Config, args: AnalyseArgs) -> Result<()> {
    if let Some(policy) = args.policy {
        config.evaluation.failure_policy = policy.into();
    }
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let result = controller.analyse_file(&args.input_file).await?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&result).context("Failed to serialize analysis result")?
    } else {
        Controller::render_report(&result)
    };

    Controller::write_output(&rendered, args.output.as_deref())
}

fn run_questions(config: Config) -> Result<()> {
    let controller = Controller::with_config(config)?;
    let questions = controller.list_questions()?;

    for (index, question) in questions.iter().enumerate() {
        let first_line = question.instruction.lines().next().unwrap_or_default();
        println!("{:>3}. {:<32} {}", index + 1, question.name, first_line);
    }
    info!("{} question(s)", questions.len());
    Ok(())
}

async fn run_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    config.validate().context("Configuration validation failed")?;

    let pipeline = Arc::new(AnalysisPipeline::from_config(&config)?);
    info!("Loaded {} question(s)", pipeline.questions().len());
    server::serve(pipeline, &config.server).await
}

async fn run_check(config: Config) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let provider = controller.check_connection().await?;
    info!("{} is reachable", provider);
    Ok(())
}

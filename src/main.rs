// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use subtrans::app_config::{self, Config, ProviderKind};
use subtrans::app_controller::Controller;
use subtrans::credentials::{CredentialStore, FileCredentialStore, env_var_name};

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    Gemini,
    #[value(name = "openai")]
    OpenAI,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Gemini => ProviderKind::Gemini,
            CliProvider::OpenAI => ProviderKind::OpenAI,
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files (default command)
    Translate(TranslateArgs),

    /// Manage stored provider API keys
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Store an API key; read from stdin when --key is omitted
    Set {
        #[arg(value_enum)]
        provider: CliProvider,
        /// The API key
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove a stored API key
    Clear {
        #[arg(value_enum)]
        provider: CliProvider,
    },
    /// Show which providers have a key available
    Status,
}

#[derive(Args, Debug, Default)]
struct TranslateArgs {
    /// Subtitle files or directories containing .srt files
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Style instruction, e.g. "casual, keep slang"
    #[arg(long)]
    prompt: Option<String>,

    /// Maximum subtitle entries per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Delay between batches in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Target language code (e.g., 'vi', 'fr', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Directory for translated files; defaults to each input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subtrans - batch subtitle translation with AI providers
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Translate SRT subtitle files with Gemini or OpenAI")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subtrans splits subtitle files into batches, translates them with an AI provider and writes the result next to the input.

EXAMPLES:
    subtrans movie.srt                            # Translate using default config
    subtrans -p openai -t fr movie.srt            # Use OpenAI, translate to French
    subtrans --prompt \"casual, keep slang\" dir/   # Every .srt in a directory
    subtrans auth set gemini                      # Store a key read from stdin
    subtrans completions bash > subtrans.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. API keys come from SUBTRANS_GEMINI_API_KEY /
    SUBTRANS_OPENAI_API_KEY or from the key store managed by `subtrans auth`.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Auth { action }) => run_auth(action),
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

fn run_auth(action: AuthAction) -> Result<ExitCode> {
    let store = FileCredentialStore::open_default()?;

    match action {
        AuthAction::Set { provider, key } => {
            let provider = ProviderKind::from(provider);
            let key = match key {
                Some(key) => key,
                None => {
                    eprint!("{} API key: ", provider.display_name());
                    let _ = std::io::stderr().flush();
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            if key.trim().is_empty() {
                return Err(anyhow!("API key must not be empty"));
            }
            store.set(provider, &key)?;
            info!("Stored {} API key in {:?}", provider.display_name(), store.path());
        }
        AuthAction::Clear { provider } => {
            let provider = ProviderKind::from(provider);
            store.remove(provider)?;
            info!("Removed {} API key", provider.display_name());
        }
        AuthAction::Status => {
            for provider in ProviderKind::ALL {
                let source = if std::env::var(env_var_name(provider)).is_ok_and(|v| !v.trim().is_empty()) {
                    "environment"
                } else if store.get(provider).is_some() {
                    "key store"
                } else {
                    "not configured"
                };
                println!("{:<8} {}", provider.display_name(), source);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_translate(options: TranslateArgs) -> Result<ExitCode> {
    if options.inputs.is_empty() {
        return Err(anyhow!("At least one INPUT is required"));
    }

    if let Some(level) = &options.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let summary = controller.run(&options.inputs).await?;

    for path in &summary.exported {
        info!("Success: {}", path.display());
    }
    for (file_name, message) in &summary.errors {
        warn!("Failed: {} ({})", file_name, message);
    }

    Ok(if summary.has_errors() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

// @applies: Command line values on top of the loaded config
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = options.provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = &options.model {
        let active = config.translation.provider;
        config.translation.provider_config_mut(active).model = model.clone();
    }
    if let Some(prompt) = &options.prompt {
        config.translation.common.default_prompt = prompt.clone();
    }
    if let Some(batch_size) = options.batch_size {
        config.translation.common.batch_size = batch_size;
    }
    if let Some(delay_ms) = options.delay_ms {
        config.translation.common.batch_delay_ms = delay_ms;
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(output_dir) = &options.output_dir {
        config.output.output_dir = Some(output_dir.clone());
    }
    if options.force_overwrite {
        config.output.force_overwrite = true;
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }
}

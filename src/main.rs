// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use srtbatch::app_config::{self, Config};
use srtbatch::file_utils::FileManager;
use srtbatch::providers::Provider;
use srtbatch::providers::gemini::Gemini;
use srtbatch::{Controller, FileJob, JobId, JobState};

// @const: Interval between progress snapshots
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(200);

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

    /// Check that the configured model is reachable
    Check(ConfigArgs),

    /// Generate shell completions for srtbatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Subtitle files or directories to translate
    #[arg(value_name = "INPUT_PATH")]
    input_paths: Vec<PathBuf>,

    /// Style hint applied to every file (tone, register, terminology)
    #[arg(short, long)]
    style: Option<String>,

    /// Directory for translated files (defaults to each input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Language to translate into
    #[arg(short, long)]
    target_language: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

/// srtbatch - batch subtitle translation with an LLM
#[derive(Parser, Debug)]
#[command(name = "srtbatch")]
#[command(version)]
#[command(about = "Batch SRT subtitle translation through Gemini")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "srtbatch translates SRT subtitle files in paced batches through the Gemini API.

EXAMPLES:
    srtbatch movie.srt                              # Translate using default config
    srtbatch -f movie.srt                           # Force overwrite existing files
    srtbatch -t French -s \"casual, modern\" a.srt    # Pick language and style
    srtbatch -o out/ /subtitles/                    # Translate a whole directory
    srtbatch check                                  # Verify the model is reachable
    srtbatch completions bash > srtbatch.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The API key is read from GEMINI_API_KEY.")]
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

    // @returns: ANSI colour and emoji for a level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
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
            let (colour, emoji) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "srtbatch", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Check(args)) => run_check(args).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

// @loads: Config file with command line overrides applied
fn load_config(args: &ConfigArgs, target_language: Option<&str>) -> Result<Config> {
    if let Some(level) = &args.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config_path)?;

    if let Some(model) = &args.model {
        config.translation.model = model.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.translation.api_key = api_key.clone();
    }
    if let Some(target_language) = target_language {
        config.target_language = target_language.to_string();
    }
    match &args.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_check(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args, None)?;
    let translation = &config.translation;
    let provider = Gemini::new(
        translation.get_api_key(),
        translation.endpoint.clone(),
        translation.model.clone(),
        translation.timeout_secs,
    );

    info!("Checking {} model {}", translation.provider.display_name(), provider.model());
    provider.test_connection().await
        .map_err(|e| anyhow!("Connection check failed: {}", e))?;
    info!("Model {} is reachable", provider.model());
    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if options.input_paths.is_empty() {
        return Err(anyhow!("INPUT_PATH is required when no subcommand is specified"));
    }

    let config = load_config(&options.config, options.target_language.as_deref())?;
    let controller = Controller::with_config(&config)?;

    let files = FileManager::collect_subtitle_files(&options.input_paths)?;
    if files.is_empty() {
        warn!("No subtitle files found");
        return Ok(());
    }

    // Output directory per job, defaulting to the input's parent
    let mut destinations: HashMap<JobId, PathBuf> = HashMap::new();
    for path in &files {
        let (file_name, bytes) = FileManager::read_subtitle_file(path)?;
        let job = controller.upload(&file_name, &bytes);
        if let Some(style) = &options.style {
            controller.update_prompt(job.file_id, style)?;
        }
        let output_dir = options.output_dir.clone()
            .or_else(|| path.parent().map(|parent| parent.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        destinations.insert(job.file_id, output_dir);
    }

    info!(
        "Translating {} files into {} with {}",
        files.len(), config.target_language, config.translation.model
    );

    let summary = run_queue_with_progress(&controller).await?;
    info!("Queue finished: {} completed, {} failed", summary.0, summary.1);

    let mut written = 0;
    for job in controller.list_jobs() {
        match job.state {
            JobState::Completed => {
                let file = controller.download(job.file_id)?;
                let output_dir = destinations.get(&job.file_id)
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from("."));
                match FileManager::write_translated(&output_dir, &file, options.force_overwrite)? {
                    Some(path) => {
                        info!("Success: {:?}", path);
                        written += 1;
                    }
                    None => warn!(
                        "Output file already exists: {:?}. Use -f to force overwrite.",
                        output_dir.join(&file.file_name)
                    ),
                }
            }
            JobState::Failed => error!(
                "{}: {}",
                job.file_name,
                job.last_error.as_deref().unwrap_or("unknown error")
            ),
            JobState::Idle | JobState::Processing => {}
        }
    }

    info!("Wrote {} translated files", written);
    Ok(())
}

// @runs: Queue while a poller mirrors job progress into progress bars
async fn run_queue_with_progress(controller: &Controller) -> Result<(usize, usize)> {
    let multi_progress = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");

    let bars: HashMap<JobId, ProgressBar> = controller.list_jobs().into_iter()
        .map(|job| {
            let bar = multi_progress.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_message(job.file_name.clone());
            (job.file_id, bar)
        })
        .collect();

    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
    let poller = {
        let controller = controller.clone();
        let bars = bars.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PROGRESS_POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => refresh_bars(&bars, &controller.list_jobs()),
                    _ = &mut stop_rx => break,
                }
            }
        })
    };

    let summary = controller.start_queue().await;
    let _ = stop_tx.send(());
    poller.await.context("Progress poller panicked")?;

    let jobs = controller.list_jobs();
    refresh_bars(&bars, &jobs);
    for job in &jobs {
        if let Some(bar) = bars.get(&job.file_id) {
            bar.finish_with_message(format!("{} ({})", job.file_name, job.state));
        }
    }

    let summary = summary.ok_or_else(|| anyhow!("A queue run is already active"))?;
    Ok((summary.completed, summary.failed))
}

fn refresh_bars(bars: &HashMap<JobId, ProgressBar>, jobs: &[FileJob]) {
    for job in jobs {
        if let Some(bar) = bars.get(&job.file_id) {
            bar.set_position(u64::from(job.progress_percent));
        }
    }
}

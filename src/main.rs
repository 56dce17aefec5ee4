// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{LevelFilter, Log, error, info};
use std::path::PathBuf;

use bilingual_book::app_config::{self, Config, OutputFormat};
use bilingual_book::app_controller::{BatchOptions, Controller};
use bilingual_book::logging::CustomLogger;
use bilingual_book::pipeline::{PRESETS, RunOptions, StepMask};

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

/// CLI Wrapper for OutputFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Epub,
    Pdf,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Epub => OutputFormat::Epub,
            CliOutputFormat::Pdf => OutputFormat::Pdf,
        }
    }
}

/// Options shared by every subcommand
#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline for one document
    Run(RunArgs),

    /// Run the full pipeline for every document of a folder or manifest
    Batch(BatchArgs),

    /// Generate shell completions for bilingual-book
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input document (PDF, or Markdown/text to skip conversion)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pipeline preset to run
    #[arg(long, default_value = "all", value_parser = clap::builder::PossibleValuesParser::new(PRESETS))]
    preset: String,

    /// Step range to run instead of a preset, e.g. '0-4' or '5'
    #[arg(long, conflicts_with = "preset")]
    steps: Option<String>,

    /// Resume from the saved pipeline state
    #[arg(short, long)]
    resume: bool,

    /// Only report completed steps, run nothing
    #[arg(long)]
    check: bool,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    format: Option<CliOutputFormat>,

    /// Pipeline state file (default: <output>/<stem>/pipeline_state.json)
    #[arg(long)]
    state_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Folder holding the input documents (overrides config)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Folder receiving the batch run directory (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON manifest listing the files to process
    #[arg(long, env = "BATCH_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    format: Option<CliOutputFormat>,
}

/// bilingual-book - resumable bilingual document translator
///
/// Converts a document to structured text, translates its prose blocks with an
/// OpenAI-compatible model and typesets an interleaved bilingual EPUB or PDF.
#[derive(Parser, Debug)]
#[command(name = "bilingual-book")]
#[command(version)]
#[command(about = "Resumable bilingual document translator")]
#[command(long_about = "bilingual-book turns a PDF or Markdown document into a bilingual EPUB or PDF.

EXAMPLES:
    bilingual-book run book.pdf                        # Full pipeline
    bilingual-book run book.pdf --preset prepare_only  # Convert and segment only
    bilingual-book run book.pdf --steps 5-7 --resume   # Translate from saved state
    bilingual-book run book.pdf --check                # Show completed steps
    bilingual-book batch --manifest batch.json         # Process a batch
    bilingual-book completions bash > bilingual-book.bash

STEPS:
    0 prepare_paths       5 load_glossary
    1 convert_to_text     6 translate
    2 read_text           7 merge_translations
    3 segment_text        8 reconstruct_document
    4 identify_translatable_blocks    9 generate_output

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. LLM_API_KEY, LLM_BASE_URL and LLM_MODEL (also read
    from a .env file) override the endpoint settings.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    // Info level until the config is read
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();
    if let Err(e) = dispatch(cli).await {
        error!("{:?}", e);
        log::logger().flush();
        std::process::exit(1);
    }
}

async fn dispatch(cli: CommandLineOptions) -> Result<()> {
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "bilingual-book", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => {
            let config = load_config(&cli.common)?;
            run_single(config, args).await
        }
        Commands::Batch(args) => {
            let config = load_config(&cli.common)?;
            run_batch(config, args).await
        }
    }
}

fn load_config(common: &CommonArgs) -> Result<Config> {
    if let Some(level) = &common.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    // A missing .env file is fine
    let _ = dotenv::dotenv();

    let mut config = Config::load_or_create(&common.config_path)?;
    config.apply_env_overrides()?;

    if let Some(level) = &common.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_single(config: Config, args: RunArgs) -> Result<()> {
    let mask = match &args.steps {
        Some(range) => StepMask::range(range)?,
        None => StepMask::preset(&args.preset)?,
    };

    let options = RunOptions {
        input_file: args.input,
        output_dir: args.output.unwrap_or_else(|| config.paths.output_dir.clone()),
        mask,
        resume: args.resume,
        check_only: args.check,
        format: args.format.map(OutputFormat::from).unwrap_or(config.output_format),
        state_file: args.state_file,
    };

    let controller = Controller::with_config(config)?;
    let report = controller.run(options).await?;

    if let Some(output) = report.output_file {
        info!("Output: {}", output.display());
    }
    Ok(())
}

async fn run_batch(config: Config, args: BatchArgs) -> Result<()> {
    let mut options = BatchOptions::from_config(&config);
    if let Some(input_dir) = args.input_dir {
        options.input_dir = input_dir;
    }
    if let Some(output_dir) = args.output_dir {
        options.output_dir = output_dir;
    }
    if let Some(format) = args.format {
        options.format = format.into();
    }
    options.manifest = args.manifest;

    let controller = Controller::with_config(config)?;
    let summary = controller.run_batch(options).await?;

    if !summary.failed.is_empty() {
        for (file, reason) in &summary.failed {
            error!("{}: {}", file.display(), reason);
        }
        return Err(anyhow::anyhow!(
            "{} of {} documents failed",
            summary.failed.len(),
            summary.total()
        ));
    }
    Ok(())
}

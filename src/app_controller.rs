use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{error, info, warn};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::app_config::{Config, OutputFormat};
use crate::file_utils::FileManager;
use crate::logging::DocumentLog;
use crate::pipeline::{Orchestrator, RunOptions, RunReport, StepMask};

// @module: Application controller for single and batch document runs

/// Batch manifest: `{"files": [{"filename": "book.pdf"}, ...]}`
#[derive(Debug, Deserialize)]
pub struct BatchManifest {
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

/// One manifest entry, relative to the batch input directory
#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
}

/// Settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub manifest: Option<PathBuf>,
    pub format: OutputFormat,
    // @field: Pause between documents
    pub pause: Duration,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_dir: config.paths.batch_input_dir.clone(),
            output_dir: config.paths.batch_output_dir.clone(),
            manifest: None,
            format: config.output_format,
            pause: Duration::from_secs(1),
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub run_dir: PathBuf,
    pub log_file: PathBuf,
    pub succeeded: Vec<PathBuf>,
    // @field: Failed documents with the error message
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    orchestrator: Orchestrator,
}

impl Controller {
    // @method: Create a controller wired to the configured endpoint and tools
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let orchestrator = Orchestrator::from_config(&config).with_progress(MultiProgress::new());
        Ok(Self { config, orchestrator })
    }

    /// Create a controller around an already built orchestrator
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self { config, orchestrator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline for one document.
    ///
    /// The document log file is attached for the duration of the run and
    /// detached on every exit path. A failure is logged with its full cause
    /// chain before being returned.
    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        if options.check_only {
            return self.orchestrator.run(&options).await;
        }

        let (paths, _) = self.orchestrator.locate(&options);
        let _log = match DocumentLog::attach(paths.log_file()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("Document log unavailable: {}", e);
                None
            }
        };

        let start_time = std::time::Instant::now();
        info!("Starting pipeline for: {:?}", options.input_file);

        match self.orchestrator.run(&options).await {
            Ok(report) => {
                info!(
                    "Pipeline finished in {}: {} executed, {} restored, {} skipped",
                    Self::format_duration(start_time.elapsed()),
                    report.executed.len(),
                    report.restored.len(),
                    report.skipped.len()
                );
                if report.failed_translations > 0 {
                    warn!("{} blocks carry a translation failure marker", report.failed_translations);
                }
                if let Some(output) = &report.output_file {
                    info!("Success: {:?}", output);
                }
                Ok(report)
            }
            Err(e) => {
                error!("Pipeline failed for {:?}\n{:?}", options.input_file, e);
                Err(e)
            }
        }
    }

    /// Documents to process: manifest entries if given, otherwise every PDF in the input dir
    pub fn collect_batch_inputs(options: &BatchOptions) -> Result<Vec<PathBuf>> {
        if let Some(manifest_path) = &options.manifest {
            if FileManager::file_exists(manifest_path) {
                let content = FileManager::read_to_string(manifest_path)?;
                let manifest: BatchManifest = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse batch manifest: {:?}", manifest_path))?;
                if !manifest.files.is_empty() {
                    info!("Loaded batch manifest from {:?}", manifest_path);
                    return Ok(manifest
                        .files
                        .iter()
                        .map(|entry| options.input_dir.join(&entry.filename))
                        .collect());
                }
            }
            warn!("Batch manifest {:?} missing or empty, scanning input directory", manifest_path);
        }

        if !FileManager::dir_exists(&options.input_dir) {
            return Err(anyhow::anyhow!("Input directory does not exist: {:?}", options.input_dir));
        }

        let mut files: Vec<PathBuf> = FileManager::find_files(&options.input_dir, "pdf")?
            .into_iter()
            .filter(|path| path.parent() == Some(options.input_dir.as_path()))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Run the full pipeline for every document, continuing past failures
    pub async fn run_batch(&self, options: BatchOptions) -> Result<BatchSummary> {
        FileManager::ensure_dir(&options.output_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut summary = BatchSummary {
            run_dir: options.output_dir.join(format!("batch_run_{}", timestamp)),
            log_file: options.output_dir.join(format!("batch_run_{}.log", timestamp)),
            ..BatchSummary::default()
        };
        FileManager::ensure_dir(&summary.run_dir)?;

        let log = |message: &str| {
            info!("{}", message);
            if let Err(e) = FileManager::append_to_log_file(&summary.log_file, message) {
                warn!("Failed to write batch log: {}", e);
            }
        };

        log("Starting batch processing...");
        log(&format!("Input Directory: {}", options.input_dir.display()));
        log(&format!("Output Directory: {}", options.output_dir.display()));

        let files = Self::collect_batch_inputs(&options)?;
        if files.is_empty() {
            log("No PDF files found to process.");
            return Ok(summary);
        }
        log(&format!("Found {} files to process.", files.len()));

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (i, file) in files.iter().enumerate() {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            log(&"=".repeat(50));
            log(&format!("Processing file {}/{}: {}", i + 1, files.len(), file_name));

            let run_options = RunOptions {
                input_file: file.clone(),
                output_dir: summary.run_dir.clone(),
                mask: StepMask::all(),
                resume: true,
                check_only: false,
                format: options.format,
                state_file: None,
            };

            match self.run(run_options).await {
                Ok(_) => {
                    log(&format!("✅ Successfully processed: {}", file_name));
                    succeeded.push(file.clone());
                }
                Err(e) => {
                    log(&format!("❌ Failed to process: {}", file_name));
                    log(&format!("Error: {:#}", e));
                    failed.push((file.clone(), format!("{:#}", e)));
                }
            }

            if i + 1 < files.len() && !options.pause.is_zero() {
                tokio::time::sleep(options.pause).await;
            }
        }

        log(&"=".repeat(50));
        log("Batch processing completed.");
        log(&format!(
            "Total: {}, Success: {}, Failed: {}",
            files.len(),
            succeeded.len(),
            failed.len()
        ));
        log(&format!("Log saved to: {}", summary.log_file.display()));

        summary.succeeded = succeeded;
        summary.failed = failed;
        Ok(summary)
    }

    // @returns: Human readable duration such as `1m 05s`
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs >= 3600 {
            format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        } else if secs >= 60 {
            format!("{}m {:02}s", secs / 60, secs % 60)
        } else {
            format!("{}.{:01}s", secs, duration.subsec_millis() / 100)
        }
    }
}


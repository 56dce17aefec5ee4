/*!
 * Step orchestrator.
 *
 * Drives the ten pipeline steps for one document. For every step the
 * orchestrator either recovers the output (disabled step), restores it from
 * resumed state, or executes the step and checkpoints the whole state. A step
 * that fails is not checkpointed, so a resumed run repeats it from scratch.
 */

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::{Config, OutputFormat};
use crate::document::{self, ContentBlock};
use crate::errors::PipelineError;
use crate::external::{DocumentConverter, DocumentRenderer, MagicPdf, Pandoc, RenderRequest};
use crate::file_utils::FileManager;
use crate::pipeline::paths::{self, DocumentPaths};
use crate::pipeline::source::{Recovery, StateSource};
use crate::pipeline::state::{PipelineState, StateStore, StepOutput};
use crate::pipeline::steps::{PipelineStep, StepMask};
use crate::providers::openai::OpenAI;
use crate::translation::{Glossary, TranslationClient, TranslationRequest, is_sentinel};

/// Per-run invocation settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub mask: StepMask,
    // @field: Continue from the checkpoint instead of starting over
    pub resume: bool,
    // @field: Only report completed steps
    pub check_only: bool,
    pub format: OutputFormat,
    // @field: Overrides `<output>/<stem>/<state_file_name>`
    pub state_file: Option<PathBuf>,
}

impl RunOptions {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input_file: P, output_dir: Q) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: output_dir.into(),
            mask: StepMask::all(),
            resume: false,
            check_only: false,
            format: OutputFormat::default(),
            state_file: None,
        }
    }
}

/// Settings shared by every document the orchestrator processes
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub glossary_path: Option<PathBuf>,
    pub max_glossary_terms: usize,
    pub state_file_name: String,
    pub table_of_contents: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            glossary_path: config.paths.glossary_path(),
            max_glossary_terms: config.translation.max_glossary_terms,
            state_file_name: config.paths.state_file_name.clone(),
            table_of_contents: true,
        }
    }
}

/// What happened during one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub state_file: PathBuf,
    pub executed: Vec<PipelineStep>,
    pub restored: Vec<PipelineStep>,
    pub skipped: Vec<PipelineStep>,
    // @field: Steps up to the last checkpointed one
    pub completed_steps: Vec<PipelineStep>,
    pub output_file: Option<PathBuf>,
    // @field: Text blocks that came back as sentinels
    pub failed_translations: usize,
}

/// Working data of one run, filled by executed, restored or recovered steps
#[derive(Debug, Default)]
struct RunContext {
    text_file: Option<PathBuf>,
    cover_image: Option<PathBuf>,
    content: Option<String>,
    blocks: Option<Vec<ContentBlock>>,
    indices: Option<Vec<usize>>,
    glossary: Option<Arc<Glossary>>,
    translations: Option<Vec<String>>,
    merged: Option<Vec<ContentBlock>>,
    bilingual_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl RunContext {
    fn apply(&mut self, output: &StepOutput) -> Result<()> {
        match output {
            StepOutput::PreparePaths { .. } | StepOutput::Unknown => {}
            StepOutput::ConvertToText { text_file, cover_image } => {
                self.text_file = Some(text_file.clone());
                self.cover_image = cover_image.clone();
            }
            StepOutput::ReadText { text_file, content } => {
                self.text_file.get_or_insert_with(|| text_file.clone());
                self.content = Some(content.clone());
            }
            StepOutput::SegmentText { blocks } => self.blocks = Some(blocks.clone()),
            StepOutput::IdentifyTranslatableBlocks { indices } => self.indices = Some(indices.clone()),
            StepOutput::LoadGlossary { glossary_file, .. } => {
                if self.glossary.is_none() {
                    let glossary = match glossary_file {
                        Some(path) => Glossary::load(path)?,
                        None => Glossary::new(),
                    };
                    self.glossary = Some(Arc::new(glossary));
                }
            }
            StepOutput::Translate { translations } => self.translations = Some(translations.clone()),
            StepOutput::MergeTranslations { blocks, .. } => self.merged = Some(blocks.clone()),
            StepOutput::ReconstructDocument { bilingual_file } => self.bilingual_file = Some(bilingual_file.clone()),
            StepOutput::GenerateOutput { output_file } => self.output_file = Some(output_file.clone()),
        }
        Ok(())
    }
}

/// Leading characters of a digest for log lines; the stored value may not be hex
fn short_digest(digest: &str) -> String {
    digest.chars().take(8).collect()
}

fn missing(step: PipelineStep, what: &str) -> PipelineError {
    PipelineError::MissingInput { step: step.name().to_string(), what: what.to_string() }
}

// @returns: Name of the data a step produces, for log lines
fn produces(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::PreparePaths => "paths",
        PipelineStep::ConvertToText => "text file",
        PipelineStep::ReadText => "text",
        PipelineStep::SegmentText => "blocks",
        PipelineStep::IdentifyTranslatableBlocks => "translatable block indices",
        PipelineStep::LoadGlossary => "glossary",
        PipelineStep::Translate => "translations",
        PipelineStep::MergeTranslations => "merged blocks",
        PipelineStep::ReconstructDocument => "bilingual document",
        PipelineStep::GenerateOutput => "output document",
    }
}

/// Ten-step document pipeline
#[derive(Debug)]
pub struct Orchestrator {
    client: TranslationClient,
    converter: Arc<dyn DocumentConverter>,
    renderer: Arc<dyn DocumentRenderer>,
    settings: PipelineSettings,
    progress: Option<MultiProgress>,
}

impl Orchestrator {
    pub fn new(
        client: TranslationClient,
        converter: Arc<dyn DocumentConverter>,
        renderer: Arc<dyn DocumentRenderer>,
        settings: PipelineSettings,
    ) -> Self {
        Self { client, converter, renderer, settings, progress: None }
    }

    /// Production wiring: OpenAI-compatible endpoint, magic-pdf and pandoc
    pub fn from_config(config: &Config) -> Self {
        let translation = &config.translation;
        let transport = OpenAI::new(&translation.api_key, &translation.base_url, translation.timeout_secs);
        let client = TranslationClient::new(Arc::new(transport), translation.client_options());

        Self::new(
            client,
            Arc::new(MagicPdf::new(config.converter.clone())),
            Arc::new(Pandoc::new(config.renderer.clone())),
            PipelineSettings::from_config(config),
        )
    }

    /// Show a translation progress bar under the given multi-bar
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Paths and state store for an invocation
    pub fn locate(&self, options: &RunOptions) -> (DocumentPaths, StateStore) {
        let paths = DocumentPaths::new(&options.input_file, &options.output_dir);
        let state_file = options
            .state_file
            .clone()
            .unwrap_or_else(|| paths.state_file(&self.settings.state_file_name));
        (paths, StateStore::new(state_file))
    }

    /// Run the enabled steps for one document
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let (paths, store) = self.locate(options);
        let mut report = RunReport { state_file: store.path().to_path_buf(), ..RunReport::default() };

        if options.check_only {
            report.completed_steps = store.completed_steps()?;
            if report.completed_steps.is_empty() {
                info!("No completed steps recorded in {:?}", store.path());
            } else {
                let names: Vec<&str> = report.completed_steps.iter().map(|s| s.name()).collect();
                info!("Completed steps: {}", names.join(", "));
            }
            return Ok(report);
        }

        if !FileManager::file_exists(&paths.input_file) {
            return Err(PipelineError::InputNotFound(paths.input_file.clone()).into());
        }

        let digest = FileManager::hash_file(&paths.input_file).await?;
        let mut state = self.initial_state(options, &store, &digest)?;
        state.input_digest = Some(digest);

        info!("Steps enabled: {}", options.mask);
        let source = StateSource::new(&paths, self.settings.glossary_path.clone(), options.format);
        let mut context = RunContext::default();

        for step in PipelineStep::ALL {
            if !options.mask.contains(step) {
                report.skipped.push(step);
                match source.recover(step, &state)? {
                    Some((output, origin)) => {
                        context.apply(&output)?;
                        debug!(
                            "{} disabled, {} recovered from {}",
                            step,
                            produces(step),
                            if origin == Recovery::State { "state" } else { "conventional paths" }
                        );
                    }
                    None => debug!("{} disabled, no {} available", step, produces(step)),
                }
                continue;
            }

            if let Some(output) = state.output(step).cloned() {
                context.apply(&output)?;
                info!("{}: {} restored from state", step, produces(step));
                report.restored.push(step);
                continue;
            }

            info!("Step {}/{}: {}", step.index() + 1, PipelineStep::ALL.len(), step);
            let output = self
                .execute(step, &paths, options, &mut context, &mut report)
                .await
                .with_context(|| format!("Step '{}' failed for {:?}", step, paths.input_file))?;

            context.apply(&output)?;
            state.complete(output);
            store.save(&mut state)?;
            report.executed.push(step);
        }

        report.completed_steps = state.completed_steps();
        report.output_file = context.output_file;
        Ok(report)
    }

    fn initial_state(&self, options: &RunOptions, store: &StateStore, digest: &str) -> Result<PipelineState> {
        if !options.resume {
            return Ok(PipelineState::new());
        }

        let state = store.load()?;
        match &state.input_digest {
            Some(previous) if previous != digest => {
                warn!(
                    "Input changed since the checkpoint was written (old: {}, new: {}), starting over",
                    short_digest(previous),
                    short_digest(digest)
                );
                Ok(PipelineState::new())
            }
            _ => Ok(state),
        }
    }

    async fn execute(
        &self,
        step: PipelineStep,
        paths: &DocumentPaths,
        options: &RunOptions,
        context: &mut RunContext,
        report: &mut RunReport,
    ) -> Result<StepOutput> {
        let output = match step {
            PipelineStep::PreparePaths => {
                FileManager::ensure_dir(&paths.work_dir)?;
                StepOutput::PreparePaths {
                    input_file: paths.input_file.clone(),
                    work_dir: paths.work_dir.clone(),
                }
            }
            PipelineStep::ConvertToText => {
                if paths.input_is_text() {
                    info!("Input is already text, conversion skipped");
                    StepOutput::ConvertToText {
                        text_file: paths.input_file.clone(),
                        cover_image: paths::find_cover(&paths.input_file),
                    }
                } else {
                    let converted = self.converter.convert(paths).await?;
                    info!("Text generated at: {:?}", converted.text_file);
                    StepOutput::ConvertToText {
                        text_file: converted.text_file,
                        cover_image: converted.cover_image,
                    }
                }
            }
            PipelineStep::ReadText => {
                let text_file = context
                    .text_file
                    .clone()
                    .ok_or_else(|| missing(step, "converted text file"))?;
                let content = FileManager::read_to_string(&text_file)?;
                StepOutput::ReadText { text_file, content }
            }
            PipelineStep::SegmentText => {
                let content = context.content.as_deref().ok_or_else(|| missing(step, "document text"))?;
                let blocks = document::segment(content);
                info!("Found {} blocks", blocks.len());
                StepOutput::SegmentText { blocks }
            }
            PipelineStep::IdentifyTranslatableBlocks => {
                let blocks = context.blocks.as_deref().ok_or_else(|| missing(step, "blocks"))?;
                let indices = document::translatable_indices(blocks);
                info!("{} of {} blocks need translation", indices.len(), blocks.len());
                StepOutput::IdentifyTranslatableBlocks { indices }
            }
            PipelineStep::LoadGlossary => {
                let glossary = match &self.settings.glossary_path {
                    Some(path) => Glossary::load(path)?,
                    None => {
                        info!("No glossary configured");
                        Glossary::new()
                    }
                };
                info!("Glossary has {} terms", glossary.len());
                let term_count = glossary.len();
                context.glossary = Some(Arc::new(glossary));
                StepOutput::LoadGlossary { glossary_file: self.settings.glossary_path.clone(), term_count }
            }
            PipelineStep::Translate => {
                let translations = self.translate(step, context).await?;
                let failed = translations.iter().filter(|t| is_sentinel(t)).count();
                if failed > 0 {
                    warn!("{} of {} blocks failed to translate", failed, translations.len());
                }
                report.failed_translations = failed;
                StepOutput::Translate { translations }
            }
            PipelineStep::MergeTranslations => {
                let blocks = context.blocks.as_deref().ok_or_else(|| missing(step, "blocks"))?;
                let translations = context.translations.as_deref().ok_or_else(|| missing(step, "translations"))?;
                let mut merged = blocks.to_vec();
                let translated = document::inject_translations(&mut merged, translations);
                info!("Merged {} translations", translated);
                StepOutput::MergeTranslations { blocks: merged, translated }
            }
            PipelineStep::ReconstructDocument => {
                let blocks = context
                    .merged
                    .as_deref()
                    .or(context.blocks.as_deref())
                    .ok_or_else(|| missing(step, "blocks"))?;
                let text_file = context.text_file.as_deref().ok_or_else(|| missing(step, "converted text file"))?;

                let bilingual_file = paths::bilingual_path(text_file);
                FileManager::write_to_file(&bilingual_file, &document::reconstruct(blocks, true))?;
                info!("Bilingual document saved to: {:?}", bilingual_file);
                StepOutput::ReconstructDocument { bilingual_file }
            }
            PipelineStep::GenerateOutput => {
                let bilingual_file = context
                    .bilingual_file
                    .clone()
                    .ok_or_else(|| missing(step, "bilingual document"))?;
                let cover_image = context.cover_image.clone().or_else(|| paths::find_cover(&bilingual_file));

                let request = RenderRequest {
                    output: bilingual_file.with_extension(options.format.extension()),
                    source: bilingual_file,
                    title: paths.stem.clone(),
                    cover_image,
                    format: options.format,
                    table_of_contents: self.settings.table_of_contents,
                };
                let output_file = self.renderer.render(&request).await?;
                info!("{} generated: {:?}", options.format.extension().to_uppercase(), output_file);
                StepOutput::GenerateOutput { output_file }
            }
        };
        Ok(output)
    }

    async fn translate(&self, step: PipelineStep, context: &RunContext) -> Result<Vec<String>> {
        let blocks = context.blocks.as_deref().ok_or_else(|| missing(step, "blocks"))?;
        let indices = context
            .indices
            .as_deref()
            .ok_or_else(|| missing(step, "translatable block indices"))?;
        let glossary = context.glossary.clone().unwrap_or_else(|| {
            warn!("Glossary not loaded, translating without terminology hints");
            Arc::new(Glossary::new())
        });

        let requests = indices
            .iter()
            .map(|&index| {
                let text = blocks
                    .get(index)
                    .map(|block| block.content.clone())
                    .ok_or_else(|| missing(step, &format!("block {}", index)))?;
                let glossary_terms = glossary.relevant_terms(&text, self.settings.max_glossary_terms);
                Ok(TranslationRequest { text, glossary_terms })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        info!("Translating {} text blocks...", requests.len());
        let progress_bar = self.progress_bar(requests.len() as u64);
        let translations = self
            .client
            .translate_all(&requests, |done, _| progress_bar.set_position(done as u64))
            .await;
        progress_bar.finish_with_message("done");

        Ok(translations)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        let Some(multi_progress) = &self.progress else {
            return ProgressBar::hidden();
        };
        let progress_bar = multi_progress.add(ProgressBar::new(total));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }
}

/*!
 * Versioned pipeline checkpoint and its JSON file store.
 *
 * The state is an envelope around one typed output per completed step. It is
 * rewritten in full after every step; there is no incremental log. Files
 * written before the envelope existed (a flat object with `input_file`,
 * `md_file`, `blocks`, `translations` and `last_completed_step`) are migrated
 * when loaded.
 */

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::document::ContentBlock;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::pipeline::steps::PipelineStep;

/// Envelope version written by this build
pub const STATE_VERSION: u32 = 1;

/// Output recorded by one completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutput {
    PreparePaths {
        input_file: PathBuf,
        work_dir: PathBuf,
    },
    ConvertToText {
        text_file: PathBuf,
        #[serde(default)]
        cover_image: Option<PathBuf>,
    },
    ReadText {
        text_file: PathBuf,
        content: String,
    },
    SegmentText {
        blocks: Vec<ContentBlock>,
    },
    IdentifyTranslatableBlocks {
        indices: Vec<usize>,
    },
    LoadGlossary {
        #[serde(default)]
        glossary_file: Option<PathBuf>,
        term_count: usize,
    },
    Translate {
        translations: Vec<String>,
    },
    MergeTranslations {
        blocks: Vec<ContentBlock>,
        translated: usize,
    },
    ReconstructDocument {
        bilingual_file: PathBuf,
    },
    GenerateOutput {
        output_file: PathBuf,
    },
    /// Output of a step this build does not know about
    #[serde(other)]
    Unknown,
}

impl StepOutput {
    // @returns: The step that produced this output, none for unknown tags
    pub fn step(&self) -> Option<PipelineStep> {
        let step = match self {
            Self::PreparePaths { .. } => PipelineStep::PreparePaths,
            Self::ConvertToText { .. } => PipelineStep::ConvertToText,
            Self::ReadText { .. } => PipelineStep::ReadText,
            Self::SegmentText { .. } => PipelineStep::SegmentText,
            Self::IdentifyTranslatableBlocks { .. } => PipelineStep::IdentifyTranslatableBlocks,
            Self::LoadGlossary { .. } => PipelineStep::LoadGlossary,
            Self::Translate { .. } => PipelineStep::Translate,
            Self::MergeTranslations { .. } => PipelineStep::MergeTranslations,
            Self::ReconstructDocument { .. } => PipelineStep::ReconstructDocument,
            Self::GenerateOutput { .. } => PipelineStep::GenerateOutput,
            Self::Unknown => return None,
        };
        Some(step)
    }
}

/// Accumulated checkpoint for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub version: u32,

    #[serde(default)]
    pub last_completed_step: Option<PipelineStep>,

    // @field: Local time of the last save, RFC 3339
    #[serde(default)]
    pub timestamp: Option<String>,

    // @field: SHA-256 of the input document when the run started
    #[serde(default)]
    pub input_digest: Option<String>,

    #[serde(default)]
    pub outputs: Vec<StepOutput>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_completed_step: None,
            timestamp: None,
            input_digest: None,
            outputs: Vec::new(),
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.last_completed_step.is_none()
    }

    /// Output recorded for a step, if any
    pub fn output(&self, step: PipelineStep) -> Option<&StepOutput> {
        self.outputs.iter().find(|output| output.step() == Some(step))
    }

    pub fn has_output(&self, step: PipelineStep) -> bool {
        self.output(step).is_some()
    }

    /// Add or replace the output of a step, keeping outputs in canonical order
    pub fn record(&mut self, output: StepOutput) {
        let Some(step) = output.step() else {
            return;
        };
        self.outputs.retain(|existing| existing.step() != Some(step));
        self.outputs.push(output);
        self.outputs
            .sort_by_key(|output| output.step().map(PipelineStep::index).unwrap_or(usize::MAX));
    }

    /// Record a step output and mark the step as the last completed one
    pub fn complete(&mut self, output: StepOutput) {
        let step = output.step();
        self.record(output);
        if step.is_some() {
            self.last_completed_step = step;
        }
    }

    /// Steps up to `last_completed_step` in canonical order.
    ///
    /// Outputs of earlier steps are not checked for presence.
    pub fn completed_steps(&self) -> Vec<PipelineStep> {
        self.last_completed_step
            .map(|step| step.through().to_vec())
            .unwrap_or_default()
    }

    /// Convert a flat pre-envelope record into the current layout
    fn from_legacy(object: Map<String, Value>, state_path: &Path) -> Self {
        let mut state = Self::new();
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        if let Some(input_file) = text("input_file") {
            let work_dir = state_path.parent().map(Path::to_path_buf).unwrap_or_default();
            state.record(StepOutput::PreparePaths { input_file: PathBuf::from(input_file), work_dir });
        }

        if let Some(md_file) = text("md_file") {
            state.record(StepOutput::ConvertToText { text_file: PathBuf::from(md_file), cover_image: None });
        }

        if let Some(blocks) = object.get("blocks") {
            match serde_json::from_value::<Vec<ContentBlock>>(blocks.clone()) {
                Ok(blocks) => {
                    let translated = blocks.iter().filter(|b| b.translation.is_some()).count();
                    if translated > 0 {
                        state.record(StepOutput::MergeTranslations { blocks: blocks.clone(), translated });
                    }
                    state.record(StepOutput::SegmentText { blocks });
                }
                Err(e) => warn!("Ignoring unreadable legacy blocks: {}", e),
            }
        }

        if let Some(translations) = object.get("translations") {
            match serde_json::from_value::<Vec<String>>(translations.clone()) {
                Ok(translations) => state.record(StepOutput::Translate { translations }),
                Err(e) => warn!("Ignoring unreadable legacy translations: {}", e),
            }
        }

        state.last_completed_step = text("last_completed_step").and_then(|name| match name.parse() {
            Ok(step) => Some(step),
            Err(_) => {
                warn!("Ignoring unknown legacy step name '{}'", name);
                None
            }
        });
        state.timestamp = text("timestamp");
        state
    }
}

/// JSON file holding the checkpoint of one document
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        FileManager::file_exists(&self.path)
    }

    /// Stamp the state and overwrite the backing file with it
    pub fn save(&self, state: &mut PipelineState) -> Result<()> {
        state.version = STATE_VERSION;
        state.timestamp = Some(Local::now().to_rfc3339());

        let json = serde_json::to_string_pretty(state).context("Failed to serialize pipeline state")?;
        FileManager::write_to_file(&self.path, &json)?;

        debug!("State saved to: {:?}", self.path);
        Ok(())
    }

    /// Load the checkpoint; a missing file yields an empty state
    pub fn load(&self) -> Result<PipelineState> {
        if !self.exists() {
            return Ok(PipelineState::new());
        }

        let content = FileManager::read_to_string(&self.path)?;
        let malformed = |message: String| PipelineError::MalformedState { path: self.path.clone(), message };

        let value: Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(malformed("expected a JSON object".to_string()).into());
        };

        let mut state = match object.get("version") {
            None => {
                info!("Migrating legacy pipeline state from {:?}", self.path);
                PipelineState::from_legacy(object, &self.path)
            }
            Some(version) => {
                let found = version
                    .as_u64()
                    .ok_or_else(|| malformed("version is not a number".to_string()))?;
                if found > u64::from(STATE_VERSION) {
                    return Err(PipelineError::UnsupportedStateVersion {
                        found: u32::try_from(found).unwrap_or(u32::MAX),
                        supported: STATE_VERSION,
                    }
                    .into());
                }
                serde_json::from_value::<PipelineState>(Value::Object(object))
                    .map_err(|e| malformed(e.to_string()))?
            }
        };

        let before = state.outputs.len();
        state.outputs.retain(|output| output.step().is_some());
        if state.outputs.len() < before {
            debug!("Ignored {} step outputs with unknown tags", before - state.outputs.len());
        }

        info!(
            "State loaded from {:?} (last updated: {}, last completed step: {})",
            self.path,
            state.timestamp.as_deref().unwrap_or("unknown"),
            state.last_completed_step.map(PipelineStep::name).unwrap_or("none")
        );
        Ok(state)
    }

    /// Steps recorded as completed in the backing file
    pub fn completed_steps(&self) -> Result<Vec<PipelineStep>> {
        Ok(self.load()?.completed_steps())
    }
}

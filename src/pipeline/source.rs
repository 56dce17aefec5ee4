/*!
 * Recovery of step outputs for steps that are disabled in the current run.
 *
 * Strategies are tried in order: the loaded state, then the conventional
 * filesystem locations. When both fail the output stays absent and the first
 * enabled step that needs it reports a missing input.
 */

use anyhow::Result;
use std::path::PathBuf;

use crate::app_config::OutputFormat;
use crate::document::{ContentBlock, translatable_indices};
use crate::file_utils::FileManager;
use crate::pipeline::paths::{self, DocumentPaths};
use crate::pipeline::state::{PipelineState, StepOutput};
use crate::pipeline::steps::PipelineStep;
use crate::translation::Glossary;

/// Where a recovered output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    State,
    Filesystem,
}

/// Ordered recovery chain for one document
#[derive(Debug, Clone)]
pub struct StateSource<'a> {
    paths: &'a DocumentPaths,
    glossary_path: Option<PathBuf>,
    format: OutputFormat,
}

impl<'a> StateSource<'a> {
    pub fn new(paths: &'a DocumentPaths, glossary_path: Option<PathBuf>, format: OutputFormat) -> Self {
        Self { paths, glossary_path, format }
    }

    /// Recover the output of `step`, consulting `state` first
    pub fn recover(&self, step: PipelineStep, state: &PipelineState) -> Result<Option<(StepOutput, Recovery)>> {
        if let Some(output) = state.output(step) {
            return Ok(Some((output.clone(), Recovery::State)));
        }
        Ok(self.probe(step, state)?.map(|output| (output, Recovery::Filesystem)))
    }

    fn text_file(&self, state: &PipelineState) -> Option<PathBuf> {
        match state.output(PipelineStep::ConvertToText) {
            Some(StepOutput::ConvertToText { text_file, .. }) => Some(text_file.clone()),
            _ => self.paths.find_text_file(),
        }
    }

    fn blocks<'s>(&self, state: &'s PipelineState) -> Option<&'s Vec<ContentBlock>> {
        match state.output(PipelineStep::SegmentText) {
            Some(StepOutput::SegmentText { blocks }) => Some(blocks),
            _ => None,
        }
    }

    fn probe(&self, step: PipelineStep, state: &PipelineState) -> Result<Option<StepOutput>> {
        let output = match step {
            PipelineStep::PreparePaths => Some(StepOutput::PreparePaths {
                input_file: self.paths.input_file.clone(),
                work_dir: self.paths.work_dir.clone(),
            }),
            PipelineStep::ConvertToText => self.paths.find_text_file().map(|text_file| {
                let cover_image = paths::find_cover(&text_file);
                StepOutput::ConvertToText { text_file, cover_image }
            }),
            PipelineStep::ReadText => match self.text_file(state) {
                Some(text_file) if FileManager::file_exists(&text_file) => {
                    let content = FileManager::read_to_string(&text_file)?;
                    Some(StepOutput::ReadText { text_file, content })
                }
                _ => None,
            },
            PipelineStep::IdentifyTranslatableBlocks => self
                .blocks(state)
                .map(|blocks| StepOutput::IdentifyTranslatableBlocks { indices: translatable_indices(blocks) }),
            PipelineStep::LoadGlossary => match &self.glossary_path {
                Some(path) if FileManager::file_exists(path) => {
                    let glossary = Glossary::load(path)?;
                    Some(StepOutput::LoadGlossary {
                        glossary_file: Some(path.clone()),
                        term_count: glossary.len(),
                    })
                }
                _ => None,
            },
            PipelineStep::ReconstructDocument => self
                .text_file(state)
                .map(|text_file| paths::bilingual_path(&text_file))
                .filter(|bilingual| FileManager::file_exists(bilingual))
                .map(|bilingual_file| StepOutput::ReconstructDocument { bilingual_file }),
            PipelineStep::GenerateOutput => self
                .text_file(state)
                .map(|text_file| paths::output_path(&text_file, self.format))
                .filter(|output| FileManager::file_exists(output))
                .map(|output_file| StepOutput::GenerateOutput { output_file }),
            // Only ever held in state
            PipelineStep::SegmentText | PipelineStep::Translate | PipelineStep::MergeTranslations => None,
        };
        Ok(output)
    }
}

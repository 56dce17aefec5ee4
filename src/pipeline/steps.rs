/*!
 * The ten pipeline steps and the mask that enables a subset of them.
 *
 * Steps have a fixed canonical order. Older state files used different names
 * for some of them; those names are accepted as aliases when parsing.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::PipelineError;

/// One step of the document pipeline, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    PreparePaths,
    #[serde(alias = "pdf_to_markdown")]
    ConvertToText,
    #[serde(alias = "read_markdown")]
    ReadText,
    #[serde(alias = "parse_markdown")]
    SegmentText,
    #[serde(alias = "identify_text_blocks")]
    IdentifyTranslatableBlocks,
    LoadGlossary,
    Translate,
    MergeTranslations,
    #[serde(alias = "reconstruct_markdown")]
    ReconstructDocument,
    #[serde(alias = "generate_epub")]
    GenerateOutput,
}

impl PipelineStep {
    /// All steps in execution order
    pub const ALL: [PipelineStep; 10] = [
        PipelineStep::PreparePaths,
        PipelineStep::ConvertToText,
        PipelineStep::ReadText,
        PipelineStep::SegmentText,
        PipelineStep::IdentifyTranslatableBlocks,
        PipelineStep::LoadGlossary,
        PipelineStep::Translate,
        PipelineStep::MergeTranslations,
        PipelineStep::ReconstructDocument,
        PipelineStep::GenerateOutput,
    ];

    /// Highest valid step index
    pub const LAST_INDEX: usize = Self::ALL.len() - 1;

    // @returns: Position in the canonical order (0..=9)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Canonical snake_case name
    pub fn name(self) -> &'static str {
        match self {
            Self::PreparePaths => "prepare_paths",
            Self::ConvertToText => "convert_to_text",
            Self::ReadText => "read_text",
            Self::SegmentText => "segment_text",
            Self::IdentifyTranslatableBlocks => "identify_translatable_blocks",
            Self::LoadGlossary => "load_glossary",
            Self::Translate => "translate",
            Self::MergeTranslations => "merge_translations",
            Self::ReconstructDocument => "reconstruct_document",
            Self::GenerateOutput => "generate_output",
        }
    }

    /// Steps up to and including this one
    pub fn through(self) -> &'static [PipelineStep] {
        &Self::ALL[..=self.index()]
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PipelineStep {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let step = match name.as_str() {
            "prepare_paths" => Self::PreparePaths,
            "convert_to_text" | "pdf_to_markdown" => Self::ConvertToText,
            "read_text" | "read_markdown" => Self::ReadText,
            "segment_text" | "parse_markdown" => Self::SegmentText,
            "identify_translatable_blocks" | "identify_text_blocks" => Self::IdentifyTranslatableBlocks,
            "load_glossary" => Self::LoadGlossary,
            "translate" => Self::Translate,
            "merge_translations" => Self::MergeTranslations,
            "reconstruct_document" | "reconstruct_markdown" => Self::ReconstructDocument,
            "generate_output" | "generate_epub" => Self::GenerateOutput,
            _ => return Err(PipelineError::UnknownStep(s.to_string())),
        };
        Ok(step)
    }
}

/// Named step subsets selectable from the command line
pub const PRESETS: [&str; 4] = ["all", "prepare_only", "translate_only", "finalize_only"];

/// Immutable set of enabled steps for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMask {
    enabled: [bool; 10],
}

impl Default for StepMask {
    fn default() -> Self {
        Self::all()
    }
}

impl StepMask {
    /// Every step enabled
    pub fn all() -> Self {
        Self { enabled: [true; 10] }
    }

    /// No step enabled
    pub fn none() -> Self {
        Self { enabled: [false; 10] }
    }

    /// Enable exactly the given steps
    pub fn from_steps(steps: &[PipelineStep]) -> Self {
        let mut mask = Self::none();
        for step in steps {
            mask.enabled[step.index()] = true;
        }
        mask
    }

    /// Build a mask from a named preset
    pub fn preset(name: &str) -> Result<Self, PipelineError> {
        use PipelineStep::*;

        let mask = match name.trim() {
            "all" => Self::all(),
            "prepare_only" => Self::from_steps(&[
                PreparePaths,
                ConvertToText,
                ReadText,
                SegmentText,
                IdentifyTranslatableBlocks,
            ]),
            "translate_only" => Self::from_steps(&[LoadGlossary, Translate, MergeTranslations]),
            "finalize_only" => Self::from_steps(&[ReconstructDocument, GenerateOutput]),
            other => return Err(PipelineError::UnknownPreset(other.to_string())),
        };
        Ok(mask)
    }

    /// Build a mask from an inclusive index range such as `3-6`, or a single index
    pub fn range(spec: &str) -> Result<Self, PipelineError> {
        let invalid = || PipelineError::InvalidStepRange(spec.to_string());
        let parse = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());

        let (start, end) = match spec.split_once('-') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None => {
                let single = parse(spec)?;
                (single, single)
            }
        };

        if start > end || end > PipelineStep::LAST_INDEX {
            return Err(invalid());
        }

        let mut mask = Self::none();
        for index in start..=end {
            mask.enabled[index] = true;
        }
        Ok(mask)
    }

    pub fn contains(&self, step: PipelineStep) -> bool {
        self.enabled[step.index()]
    }

    /// Enabled steps in canonical order
    pub fn enabled_steps(&self) -> Vec<PipelineStep> {
        PipelineStep::ALL
            .into_iter()
            .filter(|step| self.contains(*step))
            .collect()
    }
}

impl fmt::Display for StepMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.enabled_steps().into_iter().map(PipelineStep::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

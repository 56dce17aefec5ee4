use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a document block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Natural-language prose, the only kind sent for translation
    Text,
    /// Fenced code, kept verbatim
    Code,
    /// Display math fenced by `$$`
    Formula,
    /// A line starting with image syntax
    Image,
    /// A `#` heading line
    Header,
    /// A blank line
    Separator,
}

impl BlockKind {
    // @returns: Lowercase name as written to state files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Formula => "formula",
            Self::Image => "image",
            Self::Header => "header",
            Self::Separator => "separator",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One classified unit of document structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    // @field: Block classification
    #[serde(alias = "type")]
    pub kind: BlockKind,

    // @field: Translation input (empty for separators)
    pub content: String,

    // @field: Exact source text used for reconstruction
    pub original: String,

    // @field: Set on text blocks once translations are merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl ContentBlock {
    /// Create a block whose content equals its original text
    pub fn new(kind: BlockKind, original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            kind,
            content: original.clone(),
            original,
            translation: None,
        }
    }

    /// Create a separator for one blank line; `raw_line` excludes the line terminator
    pub fn separator(raw_line: &str) -> Self {
        Self {
            kind: BlockKind::Separator,
            content: String::new(),
            original: format!("{}\n", raw_line),
            translation: None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == BlockKind::Text
    }
}

/// Positions of the text blocks, in document order
pub fn translatable_indices(blocks: &[ContentBlock]) -> Vec<usize> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.is_text())
        .map(|(index, _)| index)
        .collect()
}

/// Assign translations to text blocks by position in the text-block sequence.
///
/// Only the first `min(text_blocks, translations)` blocks receive a translation;
/// extra translations are ignored. Returns how many blocks were updated.
pub fn inject_translations(blocks: &mut [ContentBlock], translations: &[String]) -> usize {
    blocks
        .iter_mut()
        .filter(|block| block.is_text())
        .zip(translations)
        .map(|(block, translation)| block.translation = Some(translation.clone()))
        .count()
}

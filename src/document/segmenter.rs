/*!
 * Block segmentation.
 *
 * Lines are scanned once with a three-state machine (plain, inside a code
 * fence, inside a display-math fence). Original text is never rewritten, only
 * classified, so `reconstruct(segment(text), false)` reproduces `text`.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{BlockKind, ContentBlock};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```").unwrap());
static MATH_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\$").unwrap());
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[.*?\]\(.*?\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Plain,
    InCodeFence,
    InMathFence,
}

impl ScanState {
    fn fence_kind(self) -> Option<BlockKind> {
        match self {
            Self::Plain => None,
            Self::InCodeFence => Some(BlockKind::Code),
            Self::InMathFence => Some(BlockKind::Formula),
        }
    }

    fn closes(self, line: &str) -> bool {
        match self {
            Self::Plain => false,
            Self::InCodeFence => CODE_FENCE.is_match(line),
            Self::InMathFence => MATH_FENCE.is_match(line),
        }
    }
}

/// Incremental segmenter fed one line at a time
struct Segmenter<'a> {
    state: ScanState,
    blocks: Vec<ContentBlock>,
    // @field: Pending plain-text lines
    text_lines: Vec<&'a str>,
    // @field: Lines of the currently open fence, opening marker included
    fence_lines: Vec<&'a str>,
}

impl<'a> Segmenter<'a> {
    fn new() -> Self {
        Self {
            state: ScanState::Plain,
            blocks: Vec::new(),
            text_lines: Vec::new(),
            fence_lines: Vec::new(),
        }
    }

    fn feed(&mut self, line: &'a str) {
        if self.state != ScanState::Plain {
            self.fence_lines.push(line);
            if self.state.closes(line) {
                self.close_fence();
            }
            return;
        }

        if CODE_FENCE.is_match(line) {
            self.open_fence(ScanState::InCodeFence, line);
        } else if MATH_FENCE.is_match(line) {
            self.open_fence(ScanState::InMathFence, line);
        } else if HEADER.is_match(line) {
            self.push_block(ContentBlock::new(BlockKind::Header, line));
        } else if IMAGE.is_match(line) {
            self.push_block(ContentBlock::new(BlockKind::Image, line));
        } else if line.trim().is_empty() {
            self.push_block(ContentBlock::separator(line));
        } else {
            self.text_lines.push(line);
        }
    }

    fn open_fence(&mut self, state: ScanState, line: &'a str) {
        self.flush_text();
        self.state = state;
        self.fence_lines.push(line);
    }

    fn close_fence(&mut self) {
        if let Some(kind) = self.state.fence_kind() {
            let original = self.fence_lines.join("\n");
            self.blocks.push(ContentBlock::new(kind, original));
        }
        self.fence_lines.clear();
        self.state = ScanState::Plain;
    }

    fn push_block(&mut self, block: ContentBlock) {
        self.flush_text();
        self.blocks.push(block);
    }

    fn flush_text(&mut self) {
        if self.text_lines.is_empty() {
            return;
        }
        let text = self.text_lines.join("\n");
        self.text_lines.clear();
        if !text.trim().is_empty() {
            self.blocks.push(ContentBlock::new(BlockKind::Text, text));
        }
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        // An unterminated fence swallows the rest of the document
        if self.state != ScanState::Plain {
            self.close_fence();
        }
        self.flush_text();
        self.blocks
    }
}

/// Lines of `text`; a trailing `\n` terminates the last line instead of opening a new one
fn lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let has_lines = !text.is_empty();
    body.split('\n').filter(move |_| has_lines)
}

/// Split raw document text into an ordered block sequence
pub fn segment(text: &str) -> Vec<ContentBlock> {
    let mut segmenter = Segmenter::new();
    for line in lines(text) {
        segmenter.feed(line);
    }
    segmenter.finish()
}

use super::model::{BlockKind, ContentBlock};

/// Join blocks back into document text.
///
/// With `bilingual` set, each text block carrying a non-empty translation is
/// followed by a blank line and the translation.
pub fn reconstruct(blocks: &[ContentBlock], bilingual: bool) -> String {
    let mut output = String::new();
    for block in blocks {
        match (block.kind, block.translation.as_deref()) {
            (BlockKind::Text, Some(translation)) if bilingual && !translation.is_empty() => {
                output.push_str(&block.original);
                output.push_str("\n\n");
                output.push_str(translation);
                output.push('\n');
            }
            (BlockKind::Separator, _) => output.push_str(&block.original),
            _ => {
                output.push_str(&block.original);
                output.push('\n');
            }
        }
    }
    output
}

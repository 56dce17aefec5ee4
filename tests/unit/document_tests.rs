/*!
 * Tests for segmentation, translation merging and reconstruction
 */

use bilingual_book::document::{BlockKind, ContentBlock, inject_translations, reconstruct, segment, translatable_indices};

use crate::common::SAMPLE_MARKDOWN;

fn kinds(blocks: &[ContentBlock]) -> Vec<BlockKind> {
    blocks.iter().map(|b| b.kind).collect()
}

#[test]
fn test_segment_sampleDocument_shouldClassifyEveryBlockKind() {
    let blocks = segment(SAMPLE_MARKDOWN);

    assert_eq!(
        kinds(&blocks),
        vec![
            BlockKind::Header,
            BlockKind::Separator,
            BlockKind::Text,
            BlockKind::Separator,
            BlockKind::Code,
            BlockKind::Separator,
            BlockKind::Formula,
            BlockKind::Separator,
            BlockKind::Image,
            BlockKind::Separator,
            BlockKind::Text,
        ]
    );
    assert_eq!(blocks[2].original, "A black hole bends light.\nIts event horizon hides everything.");
    assert_eq!(blocks[4].original, "```\nprint(1)\n```");
    assert_eq!(blocks[8].original, "![disk](images/disk.png)");
}

#[test]
fn test_segment_helloWorld_shouldYieldSingleTextBlock() {
    let blocks = segment("Hello World");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Text);
    assert_eq!(blocks[0].original, "Hello World");
}

#[test]
fn test_segment_fencedCode_shouldKeepBothFenceLines() {
    let blocks = segment("```\nprint(1)\n```");
    assert_eq!(kinds(&blocks), vec![BlockKind::Code]);
    assert!(blocks[0].original.starts_with("```\n"));
    assert!(blocks[0].original.ends_with("\n```"));
}

#[test]
fn test_reconstruct_withoutTranslations_shouldReproduceInput() {
    let blocks = segment(SAMPLE_MARKDOWN);
    assert_eq!(reconstruct(&blocks, false), SAMPLE_MARKDOWN);
    assert_eq!(reconstruct(&blocks, true), SAMPLE_MARKDOWN);
}

#[test]
fn test_translatableIndices_shouldListTextBlocksOnly() {
    let blocks = segment(SAMPLE_MARKDOWN);
    assert_eq!(translatable_indices(&blocks), vec![2, 10]);
}

#[test]
fn test_reconstruct_bilingual_shouldFollowEachTextBlockWithItsTranslation() {
    let mut blocks = segment(SAMPLE_MARKDOWN);
    let updated = inject_translations(&mut blocks, &["黑洞弯曲光线。".to_string(), "红移随距离增长。".to_string()]);
    assert_eq!(updated, 2);

    let output = reconstruct(&blocks, true);
    assert!(output.contains("Its event horizon hides everything.\n\n黑洞弯曲光线。\n"));
    assert!(output.ends_with("Red Shift grows with distance.\n\n红移随距离增长。\n"));
    assert!(output.contains("```\nprint(1)\n```\n"));

    // Monolingual output ignores translations
    assert_eq!(reconstruct(&blocks, false), SAMPLE_MARKDOWN);
}

#[test]
fn test_reconstruct_emptyTranslation_shouldNotAddParagraph() {
    let mut blocks = segment("Only prose\n");
    inject_translations(&mut blocks, &[String::new()]);
    assert_eq!(reconstruct(&blocks, true), "Only prose\n");
}

#[test]
fn test_injectTranslations_withExtraTranslations_shouldIgnoreSurplus() {
    let mut blocks = segment("one\n\ntwo\n");
    let translations: Vec<String> = ["一", "二", "三"].iter().map(|s| s.to_string()).collect();

    assert_eq!(inject_translations(&mut blocks, &translations), 2);
    assert_eq!(blocks[0].translation.as_deref(), Some("一"));
    assert_eq!(blocks[1].translation, None);
    assert_eq!(blocks[2].translation.as_deref(), Some("二"));
}

#[test]
fn test_contentBlock_serde_shouldAcceptLegacyTypeField() {
    let json = r#"{"type": "text", "content": "Hi", "original": "Hi"}"#;
    let block: ContentBlock = serde_json::from_str(json).unwrap();
    assert_eq!(block.kind, BlockKind::Text);
    assert_eq!(block.translation, None);
}

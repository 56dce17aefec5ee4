/*!
 * Tests for glossary loading and term selection
 */

use bilingual_book::document::segment;
use bilingual_book::translation::Glossary;
use bilingual_book::translation::prompt::{GLOSSARY_SECTION_HEADER, system_message};

use crate::common::{self, SAMPLE_GLOSSARY, SAMPLE_MARKDOWN};

#[test]
fn test_glossary_loadFromFile_shouldResolveSpacingVariants() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "astro.txt", SAMPLE_GLOSSARY).unwrap();

    let glossary = Glossary::load(&path).unwrap();
    assert_eq!(glossary.len(), 3);
    assert_eq!(glossary.lookup("redshift"), Some("红移"));
    assert_eq!(glossary.lookup("RedShift"), Some("红移"));
    assert_eq!(glossary.lookup("event  horizon"), Some("事件视界"));
}

#[test]
fn test_glossary_relevantTerms_perSampleBlock_shouldPickOnlyMentionedTerms() {
    let glossary = Glossary::parse(SAMPLE_GLOSSARY);
    let blocks = segment(SAMPLE_MARKDOWN);

    let first = glossary.relevant_terms(&blocks[2].content, 50);
    assert_eq!(
        first,
        vec![
            ("Black Hole".to_string(), "黑洞".to_string()),
            ("Event Horizon".to_string(), "事件视界".to_string()),
        ]
    );

    let last = glossary.relevant_terms(&blocks[10].content, 50);
    assert_eq!(last, vec![("Red Shift".to_string(), "红移".to_string())]);
}

#[test]
fn test_systemMessage_withTerms_shouldAppendGlossarySection() {
    let glossary = Glossary::parse(SAMPLE_GLOSSARY);
    let terms = glossary.relevant_terms("Red Shift of a black hole", 50);

    let message = system_message("Translate.", &terms);
    assert!(message.starts_with("Translate."));
    assert!(message.contains(GLOSSARY_SECTION_HEADER));
    assert!(message.contains("    - Black Hole → 黑洞"));
    assert!(message.contains("    - Red Shift → 红移"));

    assert_eq!(system_message("Translate.", &[]), "Translate.");
}

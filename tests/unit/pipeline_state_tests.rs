/*!
 * Tests for the pipeline checkpoint store
 */

use std::path::PathBuf;

use bilingual_book::document::segment;
use bilingual_book::errors::PipelineError;
use bilingual_book::pipeline::{PipelineState, PipelineStep, STATE_VERSION, StateStore, StepOutput};

use crate::common::{self, SAMPLE_MARKDOWN};

fn segmented_state() -> PipelineState {
    let mut state = PipelineState::new();
    state.complete(StepOutput::PreparePaths {
        input_file: PathBuf::from("books/sky.pdf"),
        work_dir: PathBuf::from("output/sky"),
    });
    state.complete(StepOutput::SegmentText { blocks: segment(SAMPLE_MARKDOWN) });
    state
}

#[test]
fn test_stateStore_saveThenLoad_shouldRestoreOutputs() {
    let temp_dir = common::create_temp_dir().unwrap();
    let store = StateStore::new(temp_dir.path().join("pipeline_state.json"));
    let mut state = segmented_state();
    state.input_digest = Some("abc123".to_string());

    store.save(&mut state).unwrap();
    assert!(store.exists());
    assert_eq!(state.version, STATE_VERSION);
    assert!(state.timestamp.is_some());

    let loaded = store.load().unwrap();
    assert_eq!(loaded.last_completed_step, Some(PipelineStep::SegmentText));
    assert_eq!(loaded.input_digest.as_deref(), Some("abc123"));
    match loaded.output(PipelineStep::SegmentText) {
        Some(StepOutput::SegmentText { blocks }) => assert_eq!(blocks, &segment(SAMPLE_MARKDOWN)),
        other => panic!("unexpected output: {:?}", other),
    }
}

#[test]
fn test_stateStore_missingFile_shouldLoadEmptyState() {
    let temp_dir = common::create_temp_dir().unwrap();
    let store = StateStore::new(temp_dir.path().join("absent.json"));

    let state = store.load().unwrap();
    assert!(state.is_empty());
    assert!(store.completed_steps().unwrap().is_empty());
}

#[test]
fn test_stateStore_completedSteps_shouldListStepsThroughLastCompleted() {
    let temp_dir = common::create_temp_dir().unwrap();
    let store = StateStore::new(temp_dir.path().join("pipeline_state.json"));
    store.save(&mut segmented_state()).unwrap();

    assert_eq!(
        store.completed_steps().unwrap(),
        vec![
            PipelineStep::PreparePaths,
            PipelineStep::ConvertToText,
            PipelineStep::ReadText,
            PipelineStep::SegmentText,
        ]
    );
}

#[test]
fn test_stateStore_garbageFile_shouldReportMalformedState() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "pipeline_state.json", "[1, 2").unwrap();

    let error = StateStore::new(path).load().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::MalformedState { .. })
    ));
}

#[test]
fn test_stateStore_newerVersion_shouldBeRejected() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        temp_dir.path(),
        "pipeline_state.json",
        r#"{"version": 99, "outputs": []}"#,
    )
    .unwrap();

    let error = StateStore::new(path).load().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::UnsupportedStateVersion { found: 99, .. })
    ));
}

#[test]
fn test_stateStore_legacyFlatRecord_shouldMigrate() {
    let temp_dir = common::create_temp_dir().unwrap();
    let legacy = r##"{
        "input_file": "input/sky.pdf",
        "md_file": "output/sky/auto/sky.md",
        "blocks": [
            {"type": "header", "content": "# Sky", "original": "# Sky"},
            {"type": "text", "content": "Stars", "original": "Stars", "translation": "恒星"}
        ],
        "translations": ["恒星"],
        "last_completed_step": "merge_translations",
        "timestamp": "2024-10-20T12:00:00"
    }"##;
    let path = common::create_test_file(temp_dir.path(), "pipeline_state.json", legacy).unwrap();

    let state = StateStore::new(&path).load().unwrap();

    assert_eq!(state.last_completed_step, Some(PipelineStep::MergeTranslations));
    assert!(state.has_output(PipelineStep::PreparePaths));
    assert!(state.has_output(PipelineStep::SegmentText));
    match state.output(PipelineStep::ConvertToText) {
        Some(StepOutput::ConvertToText { text_file, .. }) => {
            assert_eq!(text_file, &PathBuf::from("output/sky/auto/sky.md"))
        }
        other => panic!("unexpected output: {:?}", other),
    }
    match state.output(PipelineStep::Translate) {
        Some(StepOutput::Translate { translations }) => assert_eq!(translations, &vec!["恒星".to_string()]),
        other => panic!("unexpected output: {:?}", other),
    }
    match state.output(PipelineStep::MergeTranslations) {
        Some(StepOutput::MergeTranslations { translated, .. }) => assert_eq!(*translated, 1),
        other => panic!("unexpected output: {:?}", other),
    }
}

#[test]
fn test_stateStore_legacyTranslationsWithoutMerge_shouldMigrateTranslateOutput() {
    let temp_dir = common::create_temp_dir().unwrap();
    let legacy = r##"{
        "input_file": "input/sky.pdf",
        "blocks": [{"type": "text", "content": "Stars", "original": "Stars"}],
        "translations": ["恒星", "星系"],
        "last_completed_step": "translate"
    }"##;
    let path = common::create_test_file(temp_dir.path(), "pipeline_state.json", legacy).unwrap();

    let state = StateStore::new(&path).load().unwrap();

    assert_eq!(state.last_completed_step, Some(PipelineStep::Translate));
    assert!(!state.has_output(PipelineStep::MergeTranslations));
    assert_eq!(
        state.output(PipelineStep::Translate),
        Some(&StepOutput::Translate { translations: vec!["恒星".to_string(), "星系".to_string()] })
    );
}

#[test]
fn test_stateStore_unknownOutputTag_shouldBeDropped() {
    let temp_dir = common::create_temp_dir().unwrap();
    let json = r#"{
        "version": 1,
        "last_completed_step": "segment_text",
        "outputs": [
            {"step": "prepare_paths", "input_file": "a.md", "work_dir": "out/a"},
            {"step": "summarize", "summary": "later feature"}
        ]
    }"#;
    let path = common::create_test_file(temp_dir.path(), "pipeline_state.json", json).unwrap();

    let state = StateStore::new(path).load().unwrap();
    assert_eq!(state.outputs.len(), 1);
    assert!(state.has_output(PipelineStep::PreparePaths));
}

#[test]
fn test_pipelineState_record_shouldReplaceAndKeepCanonicalOrder() {
    let mut state = PipelineState::new();
    state.record(StepOutput::Translate { translations: vec!["一".to_string()] });
    state.record(StepOutput::IdentifyTranslatableBlocks { indices: vec![0] });
    state.record(StepOutput::Translate { translations: vec!["二".to_string()] });

    let steps: Vec<_> = state.outputs.iter().filter_map(StepOutput::step).collect();
    assert_eq!(steps, vec![PipelineStep::IdentifyTranslatableBlocks, PipelineStep::Translate]);
    assert!(matches!(
        state.output(PipelineStep::Translate),
        Some(StepOutput::Translate { translations }) if translations[0] == "二"
    ));
    assert_eq!(state.last_completed_step, None);
}

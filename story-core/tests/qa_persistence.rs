//! QA tests for save/load: the envelope, flatten/reconstitute round
//! trips, version checking, and the serialization guard.

use std::time::Duration;
use story_core::testing::{assert_forest_coverage, sample_story};
use story_core::{
    auto_save_path, ElementType, ForestKind, PersistError, SavedOutline, SharedOutline, StatusSink,
};
use tempfile::TempDir;

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn encode_decode_round_trip_preserves_topology() {
    let story = sample_story();
    let saved = SavedOutline::from_outline(&story.outline);

    let json = saved.to_json_string().expect("encode");
    let reloaded = SavedOutline::from_json_string(&json)
        .expect("decode")
        .into_outline()
        .expect("rebuild");

    for kind in [ForestKind::Explorer, ForestKind::Narrator, ForestKind::Trash] {
        assert_eq!(
            reloaded.forest(kind).flatten(),
            story.outline.forest(kind).flatten(),
            "{kind:?} topology must survive the round trip"
        );
    }
    assert_eq!(reloaded.registry().len(), story.outline.registry().len());

    // Per-view identity: the scene has distinct entries in both views.
    assert!(reloaded.forest(ForestKind::Explorer).contains(story.scene));
    assert!(reloaded.forest(ForestKind::Narrator).contains(story.scene));
    assert!(!reloaded.is_dirty(), "a freshly loaded outline is clean");
    assert_forest_coverage(&reloaded);
}

#[test]
fn trash_contents_round_trip() {
    let mut story = sample_story();
    story.outline.move_to_trash(story.setting).expect("trash");

    let reloaded = SavedOutline::from_outline(&story.outline)
        .into_outline()
        .expect("rebuild");

    assert!(reloaded.is_in_trash(story.setting));
    assert_forest_coverage(&reloaded);
}

#[test]
fn expansion_state_round_trips() {
    let mut story = sample_story();
    story
        .outline
        .set_expanded(ForestKind::Explorer, story.problem, true)
        .expect("expand");

    let reloaded = SavedOutline::from_outline(&story.outline)
        .into_outline()
        .expect("rebuild");

    assert!(
        reloaded
            .forest(ForestKind::Explorer)
            .node(story.problem)
            .expect("problem node")
            .is_expanded
    );
}

#[test]
fn element_payloads_survive_the_polymorphic_list() {
    let story = sample_story();
    let reloaded = SavedOutline::from_outline(&story.outline)
        .into_outline()
        .expect("rebuild");

    for (id, element_type) in [
        (story.problem, ElementType::Problem),
        (story.protagonist, ElementType::Character),
        (story.scene, ElementType::Scene),
        (story.setting, ElementType::Setting),
    ] {
        assert_eq!(
            reloaded.registry().by_id(id).expect("element").element_type(),
            element_type
        );
    }
}

// =============================================================================
// Files
// =============================================================================

#[tokio::test]
async fn save_and_load_files() {
    let story = sample_story();
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("sample.json");

    SavedOutline::from_outline(&story.outline)
        .save_json(&path)
        .await
        .expect("save");
    assert!(path.exists());

    let loaded = SavedOutline::load_json(&path)
        .await
        .expect("load")
        .into_outline()
        .expect("rebuild");
    assert_eq!(loaded.name(), "Sample Story");
    assert_eq!(loaded.author(), "QA");
}

#[tokio::test]
async fn peek_reads_metadata_without_rebuilding() {
    let story = sample_story();
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("sample.json");
    SavedOutline::from_outline(&story.outline)
        .save_json(&path)
        .await
        .expect("save");

    let metadata = SavedOutline::peek_metadata(&path).await.expect("peek");
    assert_eq!(metadata.outline_name, "Sample Story");
    assert_eq!(metadata.author, "QA");
    assert_eq!(metadata.element_count, story.outline.registry().len());
}

#[test]
fn auto_save_path_sanitizes_names() {
    let path = auto_save_path("/tmp/saves", "My Novel: Draft #2");
    assert_eq!(
        path.to_string_lossy(),
        "/tmp/saves/My_Novel__Draft__2_autosave.json"
    );
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn version_mismatch_is_rejected() {
    let story = sample_story();
    let mut saved = SavedOutline::from_outline(&story.outline);
    saved.version = 99;

    let json = serde_json::to_string(&saved).expect("raw encode");
    match SavedOutline::from_json_string(&json) {
        Err(PersistError::VersionMismatch { expected: 1, found: 99 }) => {}
        other => panic!("expected a version mismatch, got {other:?}"),
    }
}

#[test]
fn forest_entries_without_elements_are_rejected() {
    let story = sample_story();
    let mut saved = SavedOutline::from_outline(&story.outline);
    saved.elements.retain(|element| element.id != story.scene);

    match saved.into_outline() {
        Err(PersistError::InvalidSave(_)) => {}
        other => panic!("expected invalid save data, got {other:?}"),
    }
}

#[test]
fn duplicate_elements_are_rejected() {
    let story = sample_story();
    let mut saved = SavedOutline::from_outline(&story.outline);
    let copy = saved.elements[0].clone();
    saved.elements.push(copy);

    match saved.into_outline() {
        Err(PersistError::InvalidSave(_)) => {}
        other => panic!("expected invalid save data, got {other:?}"),
    }
}

// =============================================================================
// The serialization guard
// =============================================================================

#[test]
fn guarded_mutation_and_snapshot_cooperate() {
    let story = sample_story();
    let shared = SharedOutline::new(story.outline);

    let added = shared.update(|outline| {
        let root = outline.forest(ForestKind::Explorer).root();
        outline.add_element(ElementType::Notes, "Reminder", ForestKind::Explorer, root)
    });
    let note = added.expect("note added under the guard");

    let saved = shared
        .snapshot_for_save(Duration::from_millis(100), &StatusSink::disabled())
        .expect("snapshot while idle");
    assert!(saved.elements.iter().any(|element| element.id == note));
}

#[test]
fn snapshot_reports_progress() {
    let story = sample_story();
    let shared = SharedOutline::new(story.outline);
    let (sink, mut receiver) = StatusSink::channel();

    shared
        .snapshot_for_save(Duration::from_millis(100), &sink)
        .expect("snapshot");

    let update = receiver.try_recv().expect("progress report");
    assert!(update.message.contains("Sample Story"));
}

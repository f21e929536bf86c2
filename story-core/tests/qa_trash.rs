//! QA tests for the trash lifecycle: soft delete, restore, purge, and
//! the reference-clear cascade.

use story_core::testing::{assert_forest_coverage, sample_story};
use story_core::{ElementBody, ElementId, ElementType, ForestKind, Outline, OutlineTemplate, ServiceError};

// =============================================================================
// Soft delete
// =============================================================================

#[test]
fn trashed_character_leaves_explorer_for_trash() {
    let mut outline = Outline::create("Scenario 2", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let character = outline
        .add_element(ElementType::Character, "Queequeg", ForestKind::Explorer, root)
        .expect("add character");

    outline.move_to_trash(character).expect("trash");

    assert!(!outline.forest(ForestKind::Explorer).contains(character));
    let trash_root = outline.forest(ForestKind::Trash).root();
    assert_eq!(
        outline.forest(ForestKind::Trash).children(trash_root),
        &[character]
    );
    // Still registered: soft delete never destroys the element.
    assert!(outline.registry().contains(character));
    assert_forest_coverage(&outline);
}

#[test]
fn trash_keeps_whole_subtree_intact() {
    let mut outline = Outline::create("Subtrees", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let folder = outline
        .add_element(ElementType::Folder, "Act I", ForestKind::Explorer, root)
        .expect("folder");
    let scene_a = outline
        .add_element(ElementType::Scene, "Storm", ForestKind::Explorer, folder)
        .expect("scene a");
    let scene_b = outline
        .add_element(ElementType::Scene, "Calm", ForestKind::Explorer, folder)
        .expect("scene b");

    outline.move_to_trash(folder).expect("trash folder");

    let trash = outline.forest(ForestKind::Trash);
    assert_eq!(trash.children(folder), &[scene_a, scene_b]);
    assert!(!outline.forest(ForestKind::Explorer).contains(scene_a));
    assert_forest_coverage(&outline);
}

#[test]
fn trash_rejects_roots_missing_and_repeat() {
    let mut story = sample_story();
    let explorer_root = story.outline.forest(ForestKind::Explorer).root();
    let narrator_root = story.outline.forest(ForestKind::Narrator).root();
    let trash_root = story.outline.forest(ForestKind::Trash).root();

    for root in [explorer_root, narrator_root, trash_root] {
        assert_eq!(
            story.outline.move_to_trash(root),
            Err(ServiceError::ForestRoot(root))
        );
    }

    let stranger = ElementId::new();
    assert_eq!(
        story.outline.move_to_trash(stranger),
        Err(ServiceError::NotFound(stranger))
    );

    story.outline.move_to_trash(story.setting).expect("trash once");
    assert_eq!(
        story.outline.move_to_trash(story.setting),
        Err(ServiceError::AlreadyInTrash(story.setting))
    );
}

// =============================================================================
// The reference-clear cascade
// =============================================================================

#[test]
fn trashing_clears_every_reference_to_the_element() {
    let mut story = sample_story();

    story.outline.move_to_trash(story.protagonist).expect("trash");

    // Completeness: nothing in the registry points at it anymore.
    assert!(story
        .outline
        .search_for_uuid_references(story.protagonist)
        .is_empty());

    let problem = story.outline.registry().by_id(story.problem).expect("problem");
    let ElementBody::Problem(p) = &problem.body else {
        panic!("problem payload expected");
    };
    assert_eq!(p.protagonist, None);
    // The untouched reference survives.
    assert_eq!(p.antagonist, Some(story.antagonist));

    let scene = story.outline.registry().by_id(story.scene).expect("scene");
    let ElementBody::Scene(s) = &scene.body else {
        panic!("scene payload expected");
    };
    assert_eq!(s.protagonist, None);
    assert_eq!(s.cast_members, vec![story.antagonist]);
    assert_forest_coverage(&story.outline);
}

#[test]
fn trashing_a_scene_scrubs_it_from_the_narrator_view() {
    let mut story = sample_story();
    assert!(story.outline.forest(ForestKind::Narrator).contains(story.scene));

    story.outline.move_to_trash(story.scene).expect("trash scene");

    assert!(!story.outline.forest(ForestKind::Narrator).contains(story.scene));
    assert!(story.outline.is_in_trash(story.scene));
    assert_forest_coverage(&story.outline);
}

// =============================================================================
// Restore
// =============================================================================

#[test]
fn restore_returns_subtree_under_explorer_root() {
    let mut outline = Outline::create("Restore", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let folder = outline
        .add_element(ElementType::Folder, "Act I", ForestKind::Explorer, root)
        .expect("folder");
    let scene = outline
        .add_element(ElementType::Scene, "Storm", ForestKind::Explorer, folder)
        .expect("scene");

    outline.move_to_trash(folder).expect("trash");
    outline.restore_from_trash(folder).expect("restore");

    let explorer = outline.forest(ForestKind::Explorer);
    assert_eq!(explorer.parent(folder), Some(root));
    assert_eq!(explorer.children(folder), &[scene]);
    let trash_root = outline.forest(ForestKind::Trash).root();
    assert!(outline.forest(ForestKind::Trash).children(trash_root).is_empty());
    assert_forest_coverage(&outline);
}

#[test]
fn nested_descendants_cannot_be_restored_individually() {
    let mut outline = Outline::create("Restore", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let folder = outline
        .add_element(ElementType::Folder, "Act I", ForestKind::Explorer, root)
        .expect("folder");
    let scene = outline
        .add_element(ElementType::Scene, "Storm", ForestKind::Explorer, folder)
        .expect("scene");
    outline.move_to_trash(folder).expect("trash");

    assert_eq!(
        outline.restore_from_trash(scene),
        Err(ServiceError::NotTrashTopLevel(scene))
    );
    // Restoring the ancestor brings the nested node back.
    outline.restore_from_trash(folder).expect("restore ancestor");
    assert!(outline.forest(ForestKind::Explorer).contains(scene));
}

#[test]
fn restore_rejects_elements_not_in_trash() {
    let mut story = sample_story();
    assert_eq!(
        story.outline.restore_from_trash(story.setting),
        Err(ServiceError::NotInTrash(story.setting))
    );
    let trash_root = story.outline.forest(ForestKind::Trash).root();
    assert_eq!(
        story.outline.restore_from_trash(trash_root),
        Err(ServiceError::ForestRoot(trash_root))
    );
}

#[test]
fn restore_does_not_resurrect_cleared_references() {
    let mut story = sample_story();

    story.outline.move_to_trash(story.protagonist).expect("trash");
    story
        .outline
        .restore_from_trash(story.protagonist)
        .expect("restore");

    // The element is back; the references to it are gone for good.
    assert!(story.outline.forest(ForestKind::Explorer).contains(story.protagonist));
    let problem = story.outline.registry().by_id(story.problem).expect("problem");
    let ElementBody::Problem(p) = &problem.body else {
        panic!("problem payload expected");
    };
    assert_eq!(p.protagonist, None);
    assert_forest_coverage(&story.outline);
}

#[test]
fn references_held_by_trashed_elements_survive_the_round_trip() {
    let mut story = sample_story();

    story.outline.move_to_trash(story.scene).expect("trash scene");
    story.outline.restore_from_trash(story.scene).expect("restore");

    let scene = story.outline.registry().by_id(story.scene).expect("scene");
    let ElementBody::Scene(s) = &scene.body else {
        panic!("scene payload expected");
    };
    // Outbound references were never part of the cascade.
    assert_eq!(s.cast_members, vec![story.protagonist, story.antagonist]);
}

// =============================================================================
// Structure inside the trash
// =============================================================================

#[test]
fn nested_trash_nodes_cannot_be_promoted_to_top_level() {
    let mut outline = Outline::create("Trash moves", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let folder = outline
        .add_element(ElementType::Folder, "Act I", ForestKind::Explorer, root)
        .expect("folder");
    let scene = outline
        .add_element(ElementType::Scene, "Storm", ForestKind::Explorer, folder)
        .expect("scene");
    outline.move_to_trash(folder).expect("trash");

    // Promoting the nested scene would make it restorable on its own.
    assert_eq!(
        outline.move_left(ForestKind::Trash, scene),
        Err(ServiceError::TrashTargetRejected)
    );
}

// =============================================================================
// Empty trash
// =============================================================================

#[test]
fn empty_trash_purges_registry_permanently() {
    let mut outline = Outline::create("Purge", "", OutlineTemplate::Blank);
    let root = outline.forest(ForestKind::Explorer).root();
    let folder = outline
        .add_element(ElementType::Folder, "Act I", ForestKind::Explorer, root)
        .expect("folder");
    let scene = outline
        .add_element(ElementType::Scene, "Storm", ForestKind::Explorer, folder)
        .expect("scene");
    let keeper = outline
        .add_element(ElementType::Setting, "The Sea", ForestKind::Explorer, root)
        .expect("keeper");

    outline.move_to_trash(folder).expect("trash");
    let purged = outline.empty_trash().expect("purge");

    assert_eq!(purged, 2);
    assert!(!outline.registry().contains(folder));
    assert!(!outline.registry().contains(scene));
    assert!(outline.registry().contains(keeper));

    let trash_root = outline.forest(ForestKind::Trash).root();
    assert!(outline.forest(ForestKind::Trash).children(trash_root).is_empty());
    assert_eq!(
        outline.restore_from_trash(folder),
        Err(ServiceError::NotFound(folder))
    );
    assert_forest_coverage(&outline);
}

#[test]
fn empty_trash_on_empty_trash_is_a_clean_zero() {
    let mut outline = Outline::create("Purge", "", OutlineTemplate::Blank);
    outline.clear_dirty();
    assert_eq!(outline.empty_trash().expect("nothing to purge"), 0);
    assert!(!outline.is_dirty());
}

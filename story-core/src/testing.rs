//! Testing utilities.
//!
//! Sample outlines for integration tests plus the dual-forest invariant
//! check the qa suites run after every scenario.

use crate::element::{ElementBody, ElementId, ElementType};
use crate::forest::ForestKind;
use crate::outline::{Outline, OutlineTemplate};

/// A starter outline with a scene and setting wired to the cast.
pub struct SampleStory {
    pub outline: Outline,
    pub problem: ElementId,
    pub protagonist: ElementId,
    pub antagonist: ElementId,
    pub scene: ElementId,
    pub setting: ElementId,
}

/// Build the starter template and add one scene (cast: both characters,
/// also placed in the Narrator view) and one setting.
pub fn sample_story() -> SampleStory {
    let mut outline = Outline::create("Sample Story", "QA", OutlineTemplate::StoryProblem);
    let root = outline.forest(ForestKind::Explorer).root();

    let problem = outline.registry().all_of_type(ElementType::Problem)[0].id;
    let characters = outline.registry().all_of_type(ElementType::Character);
    let protagonist = characters[0].id;
    let antagonist = characters[1].id;

    let scene = outline
        .add_element(ElementType::Scene, "Opening Scene", ForestKind::Explorer, root)
        .expect("add scene");
    let setting = outline
        .add_element(ElementType::Setting, "Harbor Town", ForestKind::Explorer, root)
        .expect("add setting");

    {
        let element = outline
            .registry_mut()
            .by_id_mut(scene)
            .expect("scene exists");
        if let ElementBody::Scene(s) = &mut element.body {
            s.protagonist = Some(protagonist);
            s.antagonist = Some(antagonist);
            s.cast_members = vec![protagonist, antagonist];
        }
    }
    outline
        .add_to_narrative(scene, None)
        .expect("scene joins the narrative");

    SampleStory {
        outline,
        problem,
        protagonist,
        antagonist,
        scene,
        setting,
    }
}

/// Assert the dual-forest invariant over a whole container.
///
/// Every non-deleted content element lives in exactly one of
/// Explorer/Trash; Narrator holds only live scenes and Section
/// groupings; every forest node resolves to a registered element.
pub fn assert_forest_coverage(outline: &Outline) {
    for kind in [ForestKind::Explorer, ForestKind::Narrator, ForestKind::Trash] {
        let forest = outline.forest(kind);
        for id in forest.preorder() {
            assert!(
                outline.registry().by_id(id).is_ok(),
                "{kind:?} node {id} has no registered element"
            );
            for child in forest.children(id) {
                assert_eq!(
                    forest.parent(*child),
                    Some(id),
                    "child {child} of {id} has a mismatched parent link"
                );
            }
        }
    }

    let explorer = outline.forest(ForestKind::Explorer);
    let narrator = outline.forest(ForestKind::Narrator);
    let trash = outline.forest(ForestKind::Trash);

    for element in outline.registry().iter() {
        let id = element.id;
        match element.element_type() {
            ElementType::Overview => {
                assert_eq!(explorer.root(), id, "overview must be the Explorer root");
            }
            ElementType::TrashCan => {
                assert_eq!(trash.root(), id, "trash can must be the Trash root");
            }
            ElementType::Section => {
                assert!(
                    narrator.contains(id),
                    "section {id} must live in the Narrator view"
                );
                assert!(
                    !explorer.contains(id) && !trash.contains(id),
                    "section {id} leaked into an owning forest"
                );
            }
            ElementType::Unknown => {}
            _ => {
                let homes =
                    usize::from(explorer.contains(id)) + usize::from(trash.contains(id));
                assert_eq!(
                    homes, 1,
                    "element {id} ({}) must live in exactly one of Explorer/Trash",
                    element.name
                );
            }
        }
    }

    for id in narrator.preorder() {
        if id == narrator.root() {
            continue;
        }
        let element = outline.registry().by_id(id).expect("checked above");
        assert!(
            matches!(
                element.element_type(),
                ElementType::Scene | ElementType::Section
            ),
            "narrator node {id} is a {}, not a scene or grouping",
            element.element_type()
        );
        if element.element_type() == ElementType::Scene {
            assert!(
                explorer.contains(id),
                "narrator scene {id} is not alive in Explorer"
            );
        }
    }
}

//! The operation layer: every mutation of an outline goes through here.
//!
//! Each operation validates its preconditions before touching anything,
//! so a failure is never observable as a half-applied mutation, then
//! marks the container dirty on success. Boundary moves are legal no-ops
//! and report `Ok(false)` rather than failing.

use crate::element::{
    Element, ElementBody, ElementId, ElementType, Problem, Relationship, Scene, StructureBeat,
};
use crate::forest::{ForestError, ForestKind};
use crate::outline::Outline;
use crate::registry::RegistryError;
use std::collections::HashSet;
use thiserror::Error;

/// Errors from outline operations.
///
/// `NotFound` can legitimately arise from stale UI state (a double-click
/// on a just-deleted node); everything else is a caller precondition
/// violation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("element {0} not found")]
    NotFound(ElementId),

    #[error("element {0} is already registered")]
    DuplicateId(ElementId),

    #[error("node {id} not present in the {view:?} view")]
    NodeNotFound { view: ForestKind, id: ElementId },

    #[error("{0} elements are created with the outline, not added")]
    SystemType(ElementType),

    #[error("the trash accepts nodes only through move_to_trash")]
    TrashAddRejected,

    #[error("the Narrator view only accepts Section groupings here; scenes join via add_to_narrative")]
    NarratorTypeRejected(ElementType),

    #[error("a {0} cannot parent Narrator nodes")]
    NarratorParentRejected(ElementType),

    #[error("Section groupings belong to the Narrator view")]
    SectionOutsideNarrator,

    #[error("operation not permitted on forest root {0}")]
    ForestRoot(ElementId),

    #[error("element {0} is already in the trash")]
    AlreadyInTrash(ElementId),

    #[error("element {0} is not in the trash")]
    NotInTrash(ElementId),

    #[error("only direct children of the trash root can be restored; {0} is nested")]
    NotTrashTopLevel(ElementId),

    #[error("relocation into the trash root is not permitted")]
    TrashTargetRejected,

    #[error("scene {0} is already part of the narrative")]
    AlreadyInNarrative(ElementId),

    #[error("node {0} is not part of the narrative")]
    NotInNarrative(ElementId),

    #[error("element {id} is a {actual}, expected a {expected}")]
    WrongType {
        id: ElementId,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("element {0} is in the trash and not a valid query subject")]
    TrashedSubject(ElementId),

    #[error("an element cannot relate to itself")]
    SelfReference(ElementId),

    #[error("beat index {index} out of range ({len} beats)")]
    BeatOutOfRange { index: usize, len: usize },

    #[error("forest error: {0}")]
    Forest(#[from] ForestError),
}

impl From<RegistryError> for ServiceError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::DuplicateId(id) => ServiceError::DuplicateId(id),
            RegistryError::NotFound(id) => ServiceError::NotFound(id),
        }
    }
}

impl Outline {
    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a new element of `element_type` as the last child of
    /// `parent` in the given view, register it, and return its id.
    pub fn add_element(
        &mut self,
        element_type: ElementType,
        name: impl Into<String>,
        view: ForestKind,
        parent: ElementId,
    ) -> Result<ElementId, ServiceError> {
        if view == ForestKind::Trash {
            return Err(ServiceError::TrashAddRejected);
        }
        if !element_type.is_user_creatable() {
            return Err(ServiceError::SystemType(element_type));
        }
        match view {
            ForestKind::Narrator if element_type != ElementType::Section => {
                return Err(ServiceError::NarratorTypeRejected(element_type));
            }
            ForestKind::Explorer if element_type == ElementType::Section => {
                return Err(ServiceError::SectionOutsideNarrator);
            }
            _ => {}
        }
        if !self.forest(view).contains(parent) {
            return Err(ServiceError::NodeNotFound { view, id: parent });
        }
        if view == ForestKind::Narrator && parent != self.forest(view).root() {
            let parent_type = self.registry.by_id(parent)?.element_type();
            if !parent_type.is_grouping() {
                return Err(ServiceError::NarratorParentRejected(parent_type));
            }
        }

        let element = Element::new(element_type, name);
        let id = element.id;
        self.registry.add(element)?;
        self.forest_mut(view)
            .add_node(id, parent)
            .expect("parent checked and id is fresh");
        self.mark_dirty();
        Ok(id)
    }

    /// Rename an element. The node label in every view follows the
    /// registry, so no tree work is needed.
    pub fn rename_element(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
    ) -> Result<(), ServiceError> {
        self.registry.by_id_mut(id)?.name = name.into();
        self.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Structural moves
    // ========================================================================

    /// Move a node one position earlier among its siblings. At position
    /// zero the node relocates to become the last child of its parent's
    /// preceding sibling. Returns whether anything moved.
    pub fn move_up(&mut self, view: ForestKind, id: ElementId) -> Result<bool, ServiceError> {
        self.require_node(view, id)?;
        let forest = self.forest(view);
        let Some((parent, index)) = forest.position(id) else {
            return Ok(false); // forest root
        };

        if index > 0 {
            self.forest_mut(view).shift_within_siblings(id, true)?;
            self.mark_dirty();
            return Ok(true);
        }

        // Wrap across the parent boundary.
        let Some((grandparent, parent_index)) = forest.position(parent) else {
            return Ok(false);
        };
        if parent_index == 0 {
            return Ok(false);
        }
        let target = forest.children(grandparent)[parent_index - 1];
        if target == self.forest(ForestKind::Trash).root() {
            return Err(ServiceError::TrashTargetRejected);
        }
        self.forest_mut(view).relocate(id, target, None)?;
        self.mark_dirty();
        Ok(true)
    }

    /// Move a node one position later among its siblings. At the last
    /// position the node relocates to become the first child of its
    /// parent's following sibling. Returns whether anything moved.
    pub fn move_down(&mut self, view: ForestKind, id: ElementId) -> Result<bool, ServiceError> {
        self.require_node(view, id)?;
        let forest = self.forest(view);
        let Some((parent, index)) = forest.position(id) else {
            return Ok(false);
        };

        if index + 1 < forest.children(parent).len() {
            self.forest_mut(view).shift_within_siblings(id, false)?;
            self.mark_dirty();
            return Ok(true);
        }

        let Some((grandparent, parent_index)) = forest.position(parent) else {
            return Ok(false);
        };
        let uncles = forest.children(grandparent);
        if parent_index + 1 >= uncles.len() {
            return Ok(false);
        }
        let target = uncles[parent_index + 1];
        if target == self.forest(ForestKind::Trash).root() {
            return Err(ServiceError::TrashTargetRejected);
        }
        self.forest_mut(view).relocate(id, target, Some(0))?;
        self.mark_dirty();
        Ok(true)
    }

    /// Promote a node to become the next sibling of its former parent.
    /// No-op for a forest root or a direct child of the root.
    pub fn move_left(&mut self, view: ForestKind, id: ElementId) -> Result<bool, ServiceError> {
        self.require_node(view, id)?;
        let forest = self.forest(view);
        let Some((parent, _)) = forest.position(id) else {
            return Ok(false);
        };
        let Some((grandparent, parent_index)) = forest.position(parent) else {
            return Ok(false);
        };
        if view == ForestKind::Trash && grandparent == self.forest(ForestKind::Trash).root() {
            // Promotion would make the node restorable on its own.
            return Err(ServiceError::TrashTargetRejected);
        }
        self.forest_mut(view)
            .relocate(id, grandparent, Some(parent_index + 1))?;
        self.mark_dirty();
        Ok(true)
    }

    /// Demote a node to become the last child of its preceding sibling.
    /// No-op without a preceding sibling.
    pub fn move_right(&mut self, view: ForestKind, id: ElementId) -> Result<bool, ServiceError> {
        self.require_node(view, id)?;
        let forest = self.forest(view);
        let Some((parent, index)) = forest.position(id) else {
            return Ok(false);
        };
        if index == 0 {
            return Ok(false);
        }
        let target = forest.children(parent)[index - 1];
        self.forest_mut(view).relocate(id, target, None)?;
        self.mark_dirty();
        Ok(true)
    }

    /// Record a node's expansion state in one view. Cosmetic: does not
    /// mark the outline dirty.
    pub fn set_expanded(
        &mut self,
        view: ForestKind,
        id: ElementId,
        expanded: bool,
    ) -> Result<(), ServiceError> {
        self.require_node(view, id)?;
        self.forest_mut(view)
            .node_mut(id)
            .expect("presence checked above")
            .is_expanded = expanded;
        Ok(())
    }

    /// Record a node's selection state in one view. Cosmetic: does not
    /// mark the outline dirty.
    pub fn set_selected(
        &mut self,
        view: ForestKind,
        id: ElementId,
        selected: bool,
    ) -> Result<(), ServiceError> {
        self.require_node(view, id)?;
        self.forest_mut(view)
            .node_mut(id)
            .expect("presence checked above")
            .is_selected = selected;
        Ok(())
    }

    fn require_node(&self, view: ForestKind, id: ElementId) -> Result<(), ServiceError> {
        if self.forest(view).contains(id) {
            Ok(())
        } else {
            Err(ServiceError::NodeNotFound { view, id })
        }
    }

    // ========================================================================
    // Trash lifecycle
    // ========================================================================

    /// Soft-delete: detach the element's subtree from the Explorer view,
    /// file it under the trash root, clear every cross-reference to the
    /// element, and scrub its scenes out of the Narrator view.
    pub fn move_to_trash(&mut self, id: ElementId) -> Result<(), ServiceError> {
        if !self.registry.contains(id) {
            return Err(ServiceError::NotFound(id));
        }
        if self.is_root(id) {
            return Err(ServiceError::ForestRoot(id));
        }
        if self.is_in_trash(id) {
            return Err(ServiceError::AlreadyInTrash(id));
        }
        if !self.forest(ForestKind::Explorer).contains(id) {
            return Err(ServiceError::NodeNotFound {
                view: ForestKind::Explorer,
                id,
            });
        }

        let snapshot = self.forest_mut(ForestKind::Explorer).remove_subtree(id)?;
        for member in snapshot.ids() {
            if self.forest(ForestKind::Narrator).contains(member) {
                self.forest_mut(ForestKind::Narrator)
                    .remove_subtree(member)?;
            }
        }
        let trash_root = self.forest(ForestKind::Trash).root();
        self.forest_mut(ForestKind::Trash)
            .insert_subtree(snapshot, trash_root)?;

        self.clear_references(id);
        self.mark_dirty();
        Ok(())
    }

    /// Restore a top-level trashed subtree under the Explorer root.
    ///
    /// References cleared when the element was trashed stay cleared.
    pub fn restore_from_trash(&mut self, id: ElementId) -> Result<(), ServiceError> {
        if !self.registry.contains(id) {
            return Err(ServiceError::NotFound(id));
        }
        let trash_root = self.forest(ForestKind::Trash).root();
        if id == trash_root {
            return Err(ServiceError::ForestRoot(id));
        }
        if !self.forest(ForestKind::Trash).contains(id) {
            return Err(ServiceError::NotInTrash(id));
        }
        if self.forest(ForestKind::Trash).parent(id) != Some(trash_root) {
            return Err(ServiceError::NotTrashTopLevel(id));
        }

        let snapshot = self.forest_mut(ForestKind::Trash).remove_subtree(id)?;
        let explorer_root = self.forest(ForestKind::Explorer).root();
        self.forest_mut(ForestKind::Explorer)
            .insert_subtree(snapshot, explorer_root)?;
        self.mark_dirty();
        Ok(())
    }

    /// Permanently remove everything under the trash root. Returns how
    /// many elements were purged. Irreversible.
    pub fn empty_trash(&mut self) -> Result<usize, ServiceError> {
        let trash_root = self.forest(ForestKind::Trash).root();
        let top_level: Vec<ElementId> = self
            .forest(ForestKind::Trash)
            .children(trash_root)
            .to_vec();

        let mut purged = 0;
        for top in top_level {
            let snapshot = self.forest_mut(ForestKind::Trash).remove_subtree(top)?;
            for member in snapshot.ids() {
                self.registry.remove(member)?;
                purged += 1;
            }
        }
        if purged > 0 {
            self.mark_dirty();
        }
        Ok(purged)
    }

    // ========================================================================
    // Type conversion
    // ========================================================================

    /// Replace a Problem with a Scene under the same id and node.
    ///
    /// Tree position, expansion state, and children are untouched; since
    /// the id survives, nothing referencing the element needs updating.
    pub fn convert_problem_to_scene(&mut self, id: ElementId) -> Result<(), ServiceError> {
        let element = self.registry.by_id(id)?;
        let ElementBody::Problem(problem) = &element.body else {
            return Err(ServiceError::WrongType {
                id,
                expected: ElementType::Problem,
                actual: element.element_type(),
            });
        };

        let scene = Scene {
            goal: problem.goal.clone(),
            opposition: problem.conflict.clone(),
            outcome: problem.outcome.clone(),
            notes: problem.notes.clone(),
            protagonist: problem.protagonist,
            antagonist: problem.antagonist,
            ..Scene::default()
        };
        let replacement = Element {
            id,
            name: element.name.clone(),
            body: ElementBody::Scene(scene),
        };
        self.registry.replace(replacement)?;
        self.mark_dirty();
        Ok(())
    }

    /// Replace a Scene with a Problem under the same id and node.
    ///
    /// The Explorer node is untouched; any Narrator node is dropped,
    /// since only scenes and groupings may appear there.
    pub fn convert_scene_to_problem(&mut self, id: ElementId) -> Result<(), ServiceError> {
        let element = self.registry.by_id(id)?;
        let ElementBody::Scene(scene) = &element.body else {
            return Err(ServiceError::WrongType {
                id,
                expected: ElementType::Scene,
                actual: element.element_type(),
            });
        };

        let problem = Problem {
            goal: scene.goal.clone(),
            conflict: scene.opposition.clone(),
            outcome: scene.outcome.clone(),
            notes: scene.notes.clone(),
            protagonist: scene.protagonist,
            antagonist: scene.antagonist,
            ..Problem::default()
        };
        let replacement = Element {
            id,
            name: element.name.clone(),
            body: ElementBody::Problem(problem),
        };
        self.registry.replace(replacement)?;
        if self.forest(ForestKind::Narrator).contains(id) {
            self.forest_mut(ForestKind::Narrator).remove_subtree(id)?;
        }
        self.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Narrator membership
    // ========================================================================

    /// Add an existing scene to the Narrator view under `parent`
    /// (`None` means the narrative root).
    pub fn add_to_narrative(
        &mut self,
        scene_id: ElementId,
        parent: Option<ElementId>,
    ) -> Result<(), ServiceError> {
        let element = self.registry.by_id(scene_id)?;
        if element.element_type() != ElementType::Scene {
            return Err(ServiceError::WrongType {
                id: scene_id,
                expected: ElementType::Scene,
                actual: element.element_type(),
            });
        }
        if self.is_in_trash(scene_id) {
            return Err(ServiceError::TrashedSubject(scene_id));
        }
        if self.forest(ForestKind::Narrator).contains(scene_id) {
            return Err(ServiceError::AlreadyInNarrative(scene_id));
        }

        let narrator_root = self.forest(ForestKind::Narrator).root();
        let parent = parent.unwrap_or(narrator_root);
        if !self.forest(ForestKind::Narrator).contains(parent) {
            return Err(ServiceError::NodeNotFound {
                view: ForestKind::Narrator,
                id: parent,
            });
        }
        if parent != narrator_root {
            let parent_type = self.registry.by_id(parent)?.element_type();
            if !parent_type.is_grouping() {
                return Err(ServiceError::NarratorParentRejected(parent_type));
            }
        }

        self.forest_mut(ForestKind::Narrator)
            .add_node(scene_id, parent)?;
        self.mark_dirty();
        Ok(())
    }

    /// Drop a node (with any subtree) from the Narrator view only; the
    /// elements stay alive in the Explorer view.
    pub fn remove_from_narrative(&mut self, id: ElementId) -> Result<(), ServiceError> {
        let narrator = self.forest(ForestKind::Narrator);
        if id == narrator.root() {
            return Err(ServiceError::ForestRoot(id));
        }
        if !narrator.contains(id) {
            return Err(ServiceError::NotInNarrative(id));
        }
        let snapshot = self.forest_mut(ForestKind::Narrator).remove_subtree(id)?;
        // Section groupings exist only in the Narrator view; dropping
        // their nodes orphans the elements, so unregister them too.
        for member in snapshot.ids() {
            if let Ok(element) = self.registry.by_id(member) {
                if element.element_type() == ElementType::Section {
                    self.registry.remove(member)?;
                }
            }
        }
        self.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Relationships and beats
    // ========================================================================

    /// Record a relationship from `a` to `b`; with `mirror`, the inverse
    /// entry is recorded on `b` as well.
    pub fn add_relationship(
        &mut self,
        a: ElementId,
        b: ElementId,
        relation_type: impl Into<String>,
        mirror: bool,
    ) -> Result<(), ServiceError> {
        if a == b {
            return Err(ServiceError::SelfReference(a));
        }
        let relation_type = relation_type.into();
        self.require_character(b)?;

        let forward = Relationship::new(b, relation_type.clone());
        self.character_mut(a)?.relationships.push(forward);
        if mirror {
            let inverse = Relationship::new(a, relation_type);
            self.character_mut(b)?.relationships.push(inverse);
        }
        self.mark_dirty();
        Ok(())
    }

    /// Remove every relationship from `a` to `partner`. Returns whether
    /// anything was removed.
    pub fn remove_relationship(
        &mut self,
        a: ElementId,
        partner: ElementId,
    ) -> Result<bool, ServiceError> {
        let character = self.character_mut(a)?;
        let before = character.relationships.len();
        character.relationships.retain(|r| r.partner_id != partner);
        let removed = character.relationships.len() != before;
        if removed {
            self.mark_dirty();
        }
        Ok(removed)
    }

    /// Append a structure beat to a problem. Returns the beat's index.
    pub fn add_beat(
        &mut self,
        problem_id: ElementId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<usize, ServiceError> {
        let problem = self.problem_mut(problem_id)?;
        problem.beats.push(StructureBeat {
            title: title.into(),
            description: description.into(),
            bound_id: None,
        });
        let index = problem.beats.len() - 1;
        self.mark_dirty();
        Ok(index)
    }

    /// Bind (or unbind) a structure beat to a concrete element.
    pub fn bind_beat(
        &mut self,
        problem_id: ElementId,
        index: usize,
        bound: Option<ElementId>,
    ) -> Result<(), ServiceError> {
        if let Some(target) = bound {
            if !self.registry.contains(target) {
                return Err(ServiceError::NotFound(target));
            }
        }
        let problem = self.problem_mut(problem_id)?;
        let len = problem.beats.len();
        let beat = problem
            .beats
            .get_mut(index)
            .ok_or(ServiceError::BeatOutOfRange { index, len })?;
        beat.bound_id = bound;
        self.mark_dirty();
        Ok(())
    }

    fn require_character(&self, id: ElementId) -> Result<(), ServiceError> {
        let element = self.registry.by_id(id)?;
        if element.element_type() != ElementType::Character {
            return Err(ServiceError::WrongType {
                id,
                expected: ElementType::Character,
                actual: element.element_type(),
            });
        }
        Ok(())
    }

    fn character_mut(&mut self, id: ElementId) -> Result<&mut crate::element::Character, ServiceError> {
        let element = self.registry.by_id_mut(id)?;
        let actual = element.element_type();
        match &mut element.body {
            ElementBody::Character(c) => Ok(c),
            _ => Err(ServiceError::WrongType {
                id,
                expected: ElementType::Character,
                actual,
            }),
        }
    }

    fn problem_mut(&mut self, id: ElementId) -> Result<&mut Problem, ServiceError> {
        let element = self.registry.by_id_mut(id)?;
        let actual = element.element_type();
        match &mut element.body {
            ElementBody::Problem(p) => Ok(p),
            _ => Err(ServiceError::WrongType {
                id,
                expected: ElementType::Problem,
                actual,
            }),
        }
    }

    // ========================================================================
    // Search and reference queries
    // ========================================================================

    /// Case-insensitive substring search over names and textual fields of
    /// every element. Empty or whitespace queries match nothing.
    pub fn search_for_text(&self, text: &str) -> Vec<&Element> {
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.ordered_elements()
            .into_iter()
            .filter(|element| element.matches_text(&query))
            .collect()
    }

    /// Same search, restricted to the subtree rooted at `root` in `view`.
    pub fn search_in_subtree(
        &self,
        view: ForestKind,
        root: ElementId,
        text: &str,
    ) -> Result<Vec<&Element>, ServiceError> {
        self.require_node(view, root)?;
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .forest(view)
            .preorder_from(root)
            .into_iter()
            .filter_map(|id| self.registry.by_id(id).ok())
            .filter(|element| element.matches_text(&query))
            .collect())
    }

    /// Elements (excluding the target itself) whose cross-reference
    /// fields contain `id`.
    pub fn search_for_uuid_references(&self, id: ElementId) -> Vec<&Element> {
        self.ordered_elements()
            .into_iter()
            .filter(|element| element.id != id && element.references().contains(&id))
            .collect()
    }

    /// Clear every cross-reference to `id` anywhere in the registry.
    /// Returns the number of cleared slots; dirty only when nonzero.
    pub fn remove_uuid_references(&mut self, id: ElementId) -> usize {
        let cleared = self.clear_references(id);
        if cleared > 0 {
            self.mark_dirty();
        }
        cleared
    }

    /// Reference query with subject validation: trashed elements and
    /// forest roots are invalid subjects and fail instead of returning
    /// an empty result.
    pub fn find_element_references(
        &self,
        id: ElementId,
    ) -> Result<Vec<&Element>, ServiceError> {
        if !self.registry.contains(id) {
            return Err(ServiceError::NotFound(id));
        }
        if self.is_root(id) {
            return Err(ServiceError::ForestRoot(id));
        }
        if self.is_in_trash(id) {
            return Err(ServiceError::TrashedSubject(id));
        }
        Ok(self.search_for_uuid_references(id))
    }

    fn clear_references(&mut self, id: ElementId) -> usize {
        let mut cleared = 0;
        for element in self.registry.iter_mut() {
            if element.id != id {
                cleared += element.clear_references_to(id);
            }
        }
        cleared
    }

    /// Every element in deterministic view order: Explorer pre-order,
    /// then Trash, then Narrator-only entries.
    pub(crate) fn ordered_elements(&self) -> Vec<&Element> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(self.registry.len());
        for kind in [ForestKind::Explorer, ForestKind::Trash, ForestKind::Narrator] {
            for id in self.forest(kind).preorder() {
                if seen.insert(id) {
                    if let Ok(element) = self.registry.by_id(id) {
                        ordered.push(element);
                    }
                }
            }
        }
        ordered
    }
}

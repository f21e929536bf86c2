//! The outline container: one registry, three forests, one dirty flag.

use crate::element::{Element, ElementBody, ElementId, ElementType};
use crate::forest::{Forest, ForestKind};
use crate::persist::epoch_now;
use crate::registry::ElementRegistry;

/// Seed content for a new outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineTemplate {
    /// Overview only.
    Blank,
    /// Overview plus a starter problem wired to two characters.
    StoryProblem,
}

impl OutlineTemplate {
    /// Map the UI's template picker index onto a template.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(OutlineTemplate::Blank),
            1 => Some(OutlineTemplate::StoryProblem),
            _ => None,
        }
    }
}

/// One open outline. Owns every element and all three views of them.
///
/// All mutation goes through the service methods so invariants hold and
/// the dirty flag tracks unsaved work.
#[derive(Debug, Clone)]
pub struct Outline {
    pub(crate) registry: ElementRegistry,
    pub(crate) explorer: Forest,
    pub(crate) narrator: Forest,
    pub(crate) trash: Forest,
    dirty: bool,
}

impl Outline {
    /// Create a new outline seeded from a template.
    pub fn create(
        name: impl Into<String>,
        author: impl Into<String>,
        template: OutlineTemplate,
    ) -> Self {
        let mut overview = Element::new(ElementType::Overview, name);
        if let ElementBody::Overview(o) = &mut overview.body {
            o.author = author.into();
            o.created = epoch_now();
        }
        let narrative_root = Element::new(ElementType::Section, "Narrative View");
        let trash_root = Element::new(ElementType::TrashCan, "Trash Can");

        let mut registry = ElementRegistry::new();
        let explorer = Forest::new(overview.id);
        let narrator = Forest::new(narrative_root.id);
        let trash = Forest::new(trash_root.id);
        registry.add(overview).expect("fresh registry");
        registry.add(narrative_root).expect("fresh registry");
        registry.add(trash_root).expect("fresh registry");

        let mut outline = Self {
            registry,
            explorer,
            narrator,
            trash,
            dirty: false,
        };

        if template == OutlineTemplate::StoryProblem {
            outline.seed_story_problem();
        }
        outline
    }

    /// Rebuild a container from deserialized parts.
    pub(crate) fn from_parts(
        registry: ElementRegistry,
        explorer: Forest,
        narrator: Forest,
        trash: Forest,
    ) -> Self {
        Self {
            registry,
            explorer,
            narrator,
            trash,
            dirty: false,
        }
    }

    fn seed_story_problem(&mut self) {
        let root = self.explorer.root();

        let protagonist = Element::new(ElementType::Character, "Protagonist");
        let antagonist = Element::new(ElementType::Character, "Antagonist");
        let mut problem = Element::new(ElementType::Problem, "Story Problem");
        if let ElementBody::Problem(p) = &mut problem.body {
            p.protagonist = Some(protagonist.id);
            p.antagonist = Some(antagonist.id);
        }

        for element in [problem, protagonist, antagonist] {
            let id = element.id;
            self.registry.add(element).expect("template ids are fresh");
            self.explorer
                .add_node(id, root)
                .expect("explorer root exists");
        }
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Mutable registry access for direct field edits (the UI binds
    /// element fields directly). Callers that change anything must
    /// follow up with [`Outline::mark_dirty`].
    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    pub fn forest(&self, kind: ForestKind) -> &Forest {
        match kind {
            ForestKind::Explorer => &self.explorer,
            ForestKind::Narrator => &self.narrator,
            ForestKind::Trash => &self.trash,
        }
    }

    pub(crate) fn forest_mut(&mut self, kind: ForestKind) -> &mut Forest {
        match kind {
            ForestKind::Explorer => &mut self.explorer,
            ForestKind::Narrator => &mut self.narrator,
            ForestKind::Trash => &mut self.trash,
        }
    }

    /// Display name of the outline (the overview element's name).
    pub fn name(&self) -> &str {
        self.registry
            .by_id(self.explorer.root())
            .map(|overview| overview.name.as_str())
            .unwrap_or("")
    }

    /// Author recorded on the overview.
    pub fn author(&self) -> &str {
        match self.registry.by_id(self.explorer.root()).map(|e| &e.body) {
            Ok(ElementBody::Overview(o)) => o.author.as_str(),
            _ => "",
        }
    }

    /// Whether `id` is the root of any of the three forests.
    pub fn is_root(&self, id: ElementId) -> bool {
        id == self.explorer.root() || id == self.narrator.root() || id == self.trash.root()
    }

    /// The forest that owns `id`'s element: Explorer or Trash.
    ///
    /// Narrator is a view, never an owner, so it does not appear here.
    pub fn home_forest(&self, id: ElementId) -> Option<ForestKind> {
        if self.explorer.contains(id) {
            Some(ForestKind::Explorer)
        } else if self.trash.contains(id) {
            Some(ForestKind::Trash)
        } else {
            None
        }
    }

    /// Whether `id` currently sits under the trash root.
    pub fn is_in_trash(&self, id: ElementId) -> bool {
        id != self.trash.root() && self.trash.contains(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the outline has unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Reset after a successful save.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

//! Narrative element types.
//!
//! Contains the typed records an outline is made of: the overview, plot
//! problems, characters, settings, scenes, folders, annotations, and the
//! trash can, plus the cross-reference structures (relationships and
//! structure beats) that link them together.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Unique identifier for narrative elements.
///
/// Stable for the lifetime of the element, including across save/load and
/// across Problem/Scene conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Element Type
// ============================================================================

/// Discriminant for the element variants.
///
/// `Overview` and `TrashCan` are per-outline singletons created with the
/// container; `Unknown` only arises from unrecognized save data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Overview,
    Problem,
    Character,
    Setting,
    Scene,
    Folder,
    Section,
    Web,
    Notes,
    TrashCan,
    Unknown,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Overview => "Overview",
            ElementType::Problem => "Problem",
            ElementType::Character => "Character",
            ElementType::Setting => "Setting",
            ElementType::Scene => "Scene",
            ElementType::Folder => "Folder",
            ElementType::Section => "Section",
            ElementType::Web => "Web",
            ElementType::Notes => "Notes",
            ElementType::TrashCan => "Trash Can",
            ElementType::Unknown => "Unknown",
        }
    }

    /// Whether users may create elements of this type directly.
    pub fn is_user_creatable(&self) -> bool {
        !matches!(
            self,
            ElementType::Overview | ElementType::TrashCan | ElementType::Unknown
        )
    }

    /// Whether this type groups other nodes (legal as a Narrator parent).
    pub fn is_grouping(&self) -> bool {
        matches!(self, ElementType::Folder | ElementType::Section)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Cross-reference structures
// ============================================================================

/// A directed relationship edge between two characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// The character on the far side of the edge.
    pub partner_id: ElementId,
    /// Free-text label such as "Friends" or "Rival".
    pub relation_type: String,
    /// Dominant trait this character shows toward the partner.
    pub attribute: String,
    /// Attitude toward the partner.
    pub attitude: String,
    pub notes: String,
}

impl Relationship {
    pub fn new(partner_id: ElementId, relation_type: impl Into<String>) -> Self {
        Self {
            partner_id,
            relation_type: relation_type.into(),
            attribute: String::new(),
            attitude: String::new(),
            notes: String::new(),
        }
    }
}

/// One entry of a problem's structure-template mapping.
///
/// `bound_id` points at the concrete element (usually a scene) the beat is
/// realized by, and may dangle until the reference scan clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureBeat {
    pub title: String,
    pub description: String,
    pub bound_id: Option<ElementId>,
}

// ============================================================================
// Variant payloads
// ============================================================================

/// Story-level summary; one per outline, the Explorer root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub author: String,
    /// Epoch-seconds creation stamp.
    pub created: String,
    pub story_idea: String,
    pub concept: String,
    pub premise: String,
    pub notes: String,
}

/// A plot problem: the dramatic question driving part of the story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub problem_type: String,
    pub conflict_type: String,
    pub subject: String,
    pub story_question: String,
    pub goal: String,
    pub conflict: String,
    pub outcome: String,
    pub method: String,
    pub theme: String,
    pub premise: String,
    pub notes: String,
    pub protagonist: Option<ElementId>,
    pub antagonist: Option<ElementId>,
    /// Element this problem's structure template is bound to.
    pub bound_structure: Option<ElementId>,
    pub beats: Vec<StructureBeat>,
}

/// A character sketch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub role: String,
    pub archetype: String,
    pub appearance: String,
    pub backstory: String,
    pub flaw: String,
    pub notes: String,
    pub relationships: Vec<Relationship>,
}

/// A setting: where and when scenes take place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub locale: String,
    pub season: String,
    pub period: String,
    pub props: String,
    pub summary: String,
    pub notes: String,
}

/// A scene: one unit of dramatic action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub description: String,
    pub viewpoint: String,
    pub goal: String,
    pub opposition: String,
    pub outcome: String,
    pub notes: String,
    pub protagonist: Option<ElementId>,
    pub antagonist: Option<ElementId>,
    /// Characters present in the scene. Set semantics, insertion order kept.
    pub cast_members: Vec<ElementId>,
}

/// Free-form grouping node for the Explorer tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub notes: String,
}

/// Grouping node for the Narrator tree; payload-identical to a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub notes: String,
}

/// A bookmarked research link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Web {
    pub url: String,
    pub notes: String,
}

/// A free-standing annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    pub body: String,
}

// ============================================================================
// Element
// ============================================================================

/// Typed payload of an element.
///
/// The tag is written into save files so a single polymorphic list
/// deserializes each entry to the correct variant; unrecognized tags land
/// on `Unknown` instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementBody {
    Overview(Overview),
    Problem(Problem),
    Character(Character),
    Setting(Setting),
    Scene(Scene),
    Folder(Folder),
    Section(Section),
    Web(Web),
    Notes(Notes),
    TrashCan,
    #[serde(other)]
    Unknown,
}

impl ElementBody {
    /// An empty payload of the given type.
    pub fn empty(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Overview => ElementBody::Overview(Overview::default()),
            ElementType::Problem => ElementBody::Problem(Problem::default()),
            ElementType::Character => ElementBody::Character(Character::default()),
            ElementType::Setting => ElementBody::Setting(Setting::default()),
            ElementType::Scene => ElementBody::Scene(Scene::default()),
            ElementType::Folder => ElementBody::Folder(Folder::default()),
            ElementType::Section => ElementBody::Section(Section::default()),
            ElementType::Web => ElementBody::Web(Web::default()),
            ElementType::Notes => ElementBody::Notes(Notes::default()),
            ElementType::TrashCan => ElementBody::TrashCan,
            ElementType::Unknown => ElementBody::Unknown,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ElementBody::Overview(_) => ElementType::Overview,
            ElementBody::Problem(_) => ElementType::Problem,
            ElementBody::Character(_) => ElementType::Character,
            ElementBody::Setting(_) => ElementType::Setting,
            ElementBody::Scene(_) => ElementType::Scene,
            ElementBody::Folder(_) => ElementType::Folder,
            ElementBody::Section(_) => ElementType::Section,
            ElementBody::Web(_) => ElementType::Web,
            ElementBody::Notes(_) => ElementType::Notes,
            ElementBody::TrashCan => ElementType::TrashCan,
            ElementBody::Unknown => ElementType::Unknown,
        }
    }
}

/// A uniquely identified narrative record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub body: ElementBody,
}

impl Element {
    /// Create a new element with an empty payload of the given type.
    pub fn new(element_type: ElementType, name: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            name: name.into(),
            body: ElementBody::empty(element_type),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.body.element_type()
    }

    /// Every element id this element refers to, in field order.
    ///
    /// This is the single authority on which fields are cross-references;
    /// the reference scan and the trash cascade both go through it.
    pub fn references(&self) -> Vec<ElementId> {
        let mut refs = Vec::new();
        match &self.body {
            ElementBody::Problem(p) => {
                refs.extend(p.protagonist);
                refs.extend(p.antagonist);
                refs.extend(p.bound_structure);
                refs.extend(p.beats.iter().filter_map(|beat| beat.bound_id));
            }
            ElementBody::Scene(s) => {
                refs.extend(s.protagonist);
                refs.extend(s.antagonist);
                refs.extend(s.cast_members.iter().copied());
            }
            ElementBody::Character(c) => {
                refs.extend(c.relationships.iter().map(|r| r.partner_id));
            }
            _ => {}
        }
        refs
    }

    /// Clear every reference to `target`, returning how many were cleared.
    ///
    /// Option fields reset to `None`; cast membership and relationship
    /// entries are removed outright since the id is their identity.
    pub fn clear_references_to(&mut self, target: ElementId) -> usize {
        let mut cleared = 0;
        match &mut self.body {
            ElementBody::Problem(p) => {
                cleared += clear_slot(&mut p.protagonist, target);
                cleared += clear_slot(&mut p.antagonist, target);
                cleared += clear_slot(&mut p.bound_structure, target);
                for beat in &mut p.beats {
                    cleared += clear_slot(&mut beat.bound_id, target);
                }
            }
            ElementBody::Scene(s) => {
                cleared += clear_slot(&mut s.protagonist, target);
                cleared += clear_slot(&mut s.antagonist, target);
                let before = s.cast_members.len();
                s.cast_members.retain(|id| *id != target);
                cleared += before - s.cast_members.len();
            }
            ElementBody::Character(c) => {
                let before = c.relationships.len();
                c.relationships.retain(|r| r.partner_id != target);
                cleared += before - c.relationships.len();
            }
            _ => {}
        }
        cleared
    }

    /// All textual fields, for substring search. The name is included.
    pub fn searchable_text(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = vec![&self.name];
        match &self.body {
            ElementBody::Overview(o) => {
                fields.extend([
                    o.author.as_str(),
                    o.story_idea.as_str(),
                    o.concept.as_str(),
                    o.premise.as_str(),
                    o.notes.as_str(),
                ]);
            }
            ElementBody::Problem(p) => {
                fields.extend([
                    p.problem_type.as_str(),
                    p.conflict_type.as_str(),
                    p.subject.as_str(),
                    p.story_question.as_str(),
                    p.goal.as_str(),
                    p.conflict.as_str(),
                    p.outcome.as_str(),
                    p.method.as_str(),
                    p.theme.as_str(),
                    p.premise.as_str(),
                    p.notes.as_str(),
                ]);
                for beat in &p.beats {
                    fields.push(&beat.title);
                    fields.push(&beat.description);
                }
            }
            ElementBody::Character(c) => {
                fields.extend([
                    c.role.as_str(),
                    c.archetype.as_str(),
                    c.appearance.as_str(),
                    c.backstory.as_str(),
                    c.flaw.as_str(),
                    c.notes.as_str(),
                ]);
                for rel in &c.relationships {
                    fields.push(&rel.relation_type);
                    fields.push(&rel.attribute);
                    fields.push(&rel.attitude);
                    fields.push(&rel.notes);
                }
            }
            ElementBody::Setting(s) => {
                fields.extend([
                    s.locale.as_str(),
                    s.season.as_str(),
                    s.period.as_str(),
                    s.props.as_str(),
                    s.summary.as_str(),
                    s.notes.as_str(),
                ]);
            }
            ElementBody::Scene(s) => {
                fields.extend([
                    s.description.as_str(),
                    s.viewpoint.as_str(),
                    s.goal.as_str(),
                    s.opposition.as_str(),
                    s.outcome.as_str(),
                    s.notes.as_str(),
                ]);
            }
            ElementBody::Folder(f) => fields.push(&f.notes),
            ElementBody::Section(s) => fields.push(&s.notes),
            ElementBody::Web(w) => {
                fields.push(&w.url);
                fields.push(&w.notes);
            }
            ElementBody::Notes(n) => fields.push(&n.body),
            ElementBody::TrashCan | ElementBody::Unknown => {}
        }
        fields
    }

    /// Case-insensitive substring match over all textual fields.
    pub fn matches_text(&self, lowered_query: &str) -> bool {
        self.searchable_text()
            .iter()
            .any(|field| field.to_lowercase().contains(lowered_query))
    }
}

fn clear_slot(slot: &mut Option<ElementId>, target: ElementId) -> usize {
    if *slot == Some(target) {
        *slot = None;
        1
    } else {
        0
    }
}

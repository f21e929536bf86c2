//! Structural outline engine for long-form fiction planning.
//!
//! This crate provides:
//! - A typed registry of narrative elements (problems, characters,
//!   settings, scenes, folders, annotations)
//! - Two simultaneous hierarchical views of them — a free-form Explorer
//!   planning tree and a linear Narrator reading-order tree — plus a
//!   trash forest for soft deletes
//! - Structural operations (move, trash/restore, type conversion) that
//!   keep identity, cross-references, and topology consistent
//! - Lossless flatten/reconstitute serialization and a guarded handle
//!   for background autosave
//!
//! # Quick Start
//!
//! ```
//! use story_core::{ElementType, ForestKind, Outline, OutlineTemplate};
//!
//! let mut outline = Outline::create("My Novel", "Me", OutlineTemplate::StoryProblem);
//! let root = outline.forest(ForestKind::Explorer).root();
//!
//! let scene = outline
//!     .add_element(ElementType::Scene, "Opening", ForestKind::Explorer, root)
//!     .expect("scene added");
//! outline.add_to_narrative(scene, None).expect("scene in reading order");
//! assert!(outline.is_dirty());
//! ```

pub mod element;
pub mod forest;
pub mod guard;
pub mod outline;
pub mod persist;
pub mod registry;
pub mod service;
pub mod status;
pub mod testing;

// Primary public API
pub use element::{
    Element, ElementBody, ElementId, ElementType, Relationship, StructureBeat,
};
pub use forest::{FlatNode, Forest, ForestKind};
pub use guard::{SharedOutline, BACKGROUND_LOCK_TIMEOUT};
pub use outline::{Outline, OutlineTemplate};
pub use persist::{auto_save_path, PersistError, SaveMetadata, SavedOutline};
pub use registry::{ElementRegistry, RegistryError};
pub use service::ServiceError;
pub use status::{StatusSink, StatusUpdate};

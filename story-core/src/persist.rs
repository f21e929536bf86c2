//! Outline persistence: the whole-container save envelope.
//!
//! The on-disk shape is a version header, a single polymorphic element
//! list (each entry tagged with its type), and the three flattened
//! forests. Encoding and decoding are lossless for topology, child
//! ordering, and per-view identity.

use crate::element::Element;
use crate::forest::{FlatNode, Forest, ForestError, ForestKind};
use crate::outline::Outline;
use crate::registry::{ElementRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("invalid save data: {0}")]
    InvalidSave(String),
}

impl From<ForestError> for PersistError {
    fn from(value: ForestError) -> Self {
        PersistError::InvalidSave(value.to_string())
    }
}

impl From<RegistryError> for PersistError {
    fn from(value: RegistryError) -> Self {
        PersistError::InvalidSave(value.to_string())
    }
}

/// Current save file format version.
const SAVE_VERSION: u32 = 1;

/// A saved outline with everything needed to reopen it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedOutline {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// Crate version that wrote the file.
    pub app_version: String,

    /// When the save was created (epoch seconds).
    pub saved_at: String,

    /// Metadata about the save.
    pub metadata: SaveMetadata,

    /// Every element, tagged with its type.
    pub elements: Vec<Element>,

    /// Flattened Explorer forest, pre-order.
    pub explorer: Vec<FlatNode>,

    /// Flattened Narrator forest, pre-order.
    pub narrator: Vec<FlatNode>,

    /// Flattened Trash forest, pre-order.
    pub trash: Vec<FlatNode>,
}

/// Metadata about the save file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// Outline display name.
    pub outline_name: String,

    /// Author recorded on the overview.
    pub author: String,

    /// Total element count.
    pub element_count: usize,

    /// When the save was created (duplicated from parent for peek access).
    #[serde(default)]
    pub saved_at: String,
}

impl SavedOutline {
    /// Capture the current state of an outline.
    pub fn from_outline(outline: &Outline) -> Self {
        let saved_at = epoch_now();
        let metadata = SaveMetadata {
            outline_name: outline.name().to_string(),
            author: outline.author().to_string(),
            element_count: outline.registry().len(),
            saved_at: saved_at.clone(),
        };

        Self {
            version: SAVE_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at,
            metadata,
            elements: outline.ordered_elements().into_iter().cloned().collect(),
            explorer: outline.forest(ForestKind::Explorer).flatten(),
            narrator: outline.forest(ForestKind::Narrator).flatten(),
            trash: outline.forest(ForestKind::Trash).flatten(),
        }
    }

    /// Rebuild a live outline from the envelope.
    ///
    /// Validates that ids are unique, that every forest entry resolves to
    /// a registered element, and that the flat lists are well-formed.
    pub fn into_outline(self) -> Result<Outline, PersistError> {
        if self.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }

        let mut registry = ElementRegistry::new();
        for element in self.elements {
            registry.add(element)?;
        }

        let explorer = Forest::reconstitute(&self.explorer)?;
        let narrator = Forest::reconstitute(&self.narrator)?;
        let trash = Forest::reconstitute(&self.trash)?;

        for forest in [&explorer, &narrator, &trash] {
            for id in forest.preorder() {
                if !registry.contains(id) {
                    return Err(PersistError::InvalidSave(format!(
                        "forest node {id} has no registered element"
                    )));
                }
            }
        }

        Ok(Outline::from_parts(registry, explorer, narrator, trash))
    }

    /// Encode to a JSON string.
    pub fn to_json_string(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from a JSON string, checking the format version.
    pub fn from_json_string(content: &str) -> Result<Self, PersistError> {
        let saved: Self = serde_json::from_str(content)?;
        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }
        Ok(saved)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = self.to_json_string()?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json_string(&content)
    }

    /// Read a save file's metadata without loading the full state.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        // Parse just enough to get the envelope.
        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;
        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }
        Ok(partial.metadata)
    }
}

/// Create an auto-save file name for an outline.
pub fn auto_save_path(base_dir: impl AsRef<Path>, outline_name: &str) -> std::path::PathBuf {
    let sanitized = outline_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    base_dir.as_ref().join(format!("{sanitized}_autosave.json"))
}

/// Current timestamp as epoch seconds.
pub(crate) fn epoch_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

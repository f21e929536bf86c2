//! Flat keyed store of every element in one outline.
//!
//! The registry is the single source of truth for element data; the
//! forests only hold ids into it. It tracks existence, not tree position.

use crate::element::{Element, ElementId, ElementType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("element {0} is already registered")]
    DuplicateId(ElementId),

    #[error("element {0} not found")]
    NotFound(ElementId),
}

/// Keyed element store with insertion-ordered per-type views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementRegistry {
    elements: HashMap<ElementId, Element>,
    /// Per-type view, maintained on add/remove. Insertion order.
    type_index: HashMap<ElementType, Vec<ElementId>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element. Rejects duplicate ids.
    pub fn add(&mut self, element: Element) -> Result<(), RegistryError> {
        if self.elements.contains_key(&element.id) {
            return Err(RegistryError::DuplicateId(element.id));
        }
        self.type_index
            .entry(element.element_type())
            .or_default()
            .push(element.id);
        self.elements.insert(element.id, element);
        Ok(())
    }

    /// Unregister and return an element. `NotFound` if the id is absent.
    pub fn remove(&mut self, id: ElementId) -> Result<Element, RegistryError> {
        let element = self
            .elements
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;
        if let Some(ids) = self.type_index.get_mut(&element.element_type()) {
            ids.retain(|existing| *existing != id);
        }
        Ok(element)
    }

    /// Replace an element in place, keeping its id.
    ///
    /// This is the conversion path: the new element carries the same id
    /// but may be a different variant, so the type views are rebuilt for
    /// the two types involved.
    pub fn replace(&mut self, element: Element) -> Result<Element, RegistryError> {
        let old = self.remove(element.id)?;
        self.add(element)
            .expect("id was just removed, re-add cannot collide");
        Ok(old)
    }

    pub fn by_id(&self, id: ElementId) -> Result<&Element, RegistryError> {
        self.elements.get(&id).ok_or(RegistryError::NotFound(id))
    }

    pub fn by_id_mut(&mut self, id: ElementId) -> Result<&mut Element, RegistryError> {
        self.elements.get_mut(&id).ok_or(RegistryError::NotFound(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// All elements of one type, in registration order.
    pub fn all_of_type(&self, element_type: ElementType) -> Vec<&Element> {
        self.type_index
            .get(&element_type)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.elements.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count_of_type(&self, element_type: ElementType) -> usize {
        self.type_index
            .get(&element_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.keys().copied()
    }
}

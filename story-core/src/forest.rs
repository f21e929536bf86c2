//! In-memory forests of outline nodes.
//!
//! A forest is an arena keyed by element id: each node carries a parent
//! back-reference, an ordered children list (order is reading order), and
//! per-view display state. The payload lives in the registry; a forest
//! only records membership and topology, so the same scene id keyed into
//! two forests yields two fully independent nodes.

use crate::element::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The three forests every outline owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForestKind {
    /// Free-form planning tree rooted at the overview.
    Explorer,
    /// Linear reading-order tree of scenes and groupings.
    Narrator,
    /// Detached subtrees awaiting restore or purge.
    Trash,
}

/// Errors from forest topology operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForestError {
    #[error("node {0} already exists in this forest")]
    NodeExists(ElementId),

    #[error("node {0} not found in this forest")]
    NodeNotFound(ElementId),

    #[error("the forest root cannot be detached")]
    RootDetach,

    #[error("node {0} cannot be moved under its own subtree")]
    CycleRejected(ElementId),

    #[error("invalid flattened forest: {0}")]
    InvalidFlatList(String),
}

/// Per-forest display and topology state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub is_expanded: bool,
    pub is_selected: bool,
}

impl NodeState {
    fn new(parent: Option<ElementId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            is_expanded: false,
            is_selected: false,
        }
    }
}

/// One entry of a flattened forest, suitable for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: ElementId,
    pub parent: Option<ElementId>,
    #[serde(default)]
    pub is_expanded: bool,
}

/// A detached subtree in transit between forests.
///
/// Preserves internal topology and per-node view state; the subtree root's
/// parent link is cleared until it is implanted again.
#[derive(Debug, Clone)]
pub struct SubtreeSnapshot {
    root: ElementId,
    nodes: Vec<(ElementId, NodeState)>,
}

impl SubtreeSnapshot {
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Ids contained in the subtree, pre-order, root first.
    pub fn ids(&self) -> Vec<ElementId> {
        self.nodes.iter().map(|(id, _)| *id).collect()
    }
}

/// A single-rooted ordered tree of nodes.
#[derive(Debug, Clone)]
pub struct Forest {
    root: ElementId,
    nodes: HashMap<ElementId, NodeState>,
}

impl Forest {
    /// Create a forest containing only its root node.
    pub fn new(root: ElementId) -> Self {
        let mut nodes = HashMap::new();
        let mut state = NodeState::new(None);
        state.is_expanded = true;
        nodes.insert(root, state);
        Self { root, nodes }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ElementId) -> Result<&NodeState, ForestError> {
        self.nodes.get(&id).ok_or(ForestError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: ElementId) -> Result<&mut NodeState, ForestError> {
        self.nodes.get_mut(&id).ok_or(ForestError::NodeNotFound(id))
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Position of `id` in its parent's children list.
    pub fn position(&self, id: ElementId) -> Option<(ElementId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    /// Whether `id` lies in the subtree rooted at `ancestor` (inclusive).
    pub fn is_in_subtree(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Add a new leaf as the last child of `parent`.
    pub fn add_node(&mut self, id: ElementId, parent: ElementId) -> Result<(), ForestError> {
        if self.nodes.contains_key(&id) {
            return Err(ForestError::NodeExists(id));
        }
        self.nodes
            .get_mut(&parent)
            .ok_or(ForestError::NodeNotFound(parent))?
            .children
            .push(id);
        self.nodes.insert(id, NodeState::new(Some(parent)));
        Ok(())
    }

    /// Move a node (with its subtree) under a new parent.
    ///
    /// `index` of `None` appends; out-of-range indexes clamp to the end.
    /// The node keeps its children and view state.
    pub fn relocate(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        index: Option<usize>,
    ) -> Result<(), ForestError> {
        if !self.nodes.contains_key(&id) {
            return Err(ForestError::NodeNotFound(id));
        }
        if !self.nodes.contains_key(&new_parent) {
            return Err(ForestError::NodeNotFound(new_parent));
        }
        if id == self.root {
            return Err(ForestError::RootDetach);
        }
        if self.is_in_subtree(new_parent, id) {
            return Err(ForestError::CycleRejected(id));
        }

        let old_parent = self.parent(id).ok_or(ForestError::RootDetach)?;
        if let Some(node) = self.nodes.get_mut(&old_parent) {
            node.children.retain(|c| *c != id);
        }

        let siblings = &mut self
            .nodes
            .get_mut(&new_parent)
            .expect("parent presence checked above")
            .children;
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id);

        self.nodes
            .get_mut(&id)
            .expect("node presence checked above")
            .parent = Some(new_parent);
        Ok(())
    }

    /// Swap a node with a sibling one position away. Returns false if the
    /// move would leave the sibling list.
    pub fn shift_within_siblings(&mut self, id: ElementId, up: bool) -> Result<bool, ForestError> {
        let (parent, index) = self
            .position(id)
            .ok_or(ForestError::NodeNotFound(id))?;
        let siblings = &mut self
            .nodes
            .get_mut(&parent)
            .expect("position implies parent exists")
            .children;
        if up {
            if index == 0 {
                return Ok(false);
            }
            siblings.swap(index, index - 1);
        } else {
            if index + 1 >= siblings.len() {
                return Ok(false);
            }
            siblings.swap(index, index + 1);
        }
        Ok(true)
    }

    /// Detach a subtree from this forest, removing its nodes.
    pub fn remove_subtree(&mut self, id: ElementId) -> Result<SubtreeSnapshot, ForestError> {
        if id == self.root {
            return Err(ForestError::RootDetach);
        }
        if !self.nodes.contains_key(&id) {
            return Err(ForestError::NodeNotFound(id));
        }

        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|c| *c != id);
            }
        }

        let order = self.preorder_from(id);
        let mut nodes = Vec::with_capacity(order.len());
        for node_id in order {
            let mut state = self
                .nodes
                .remove(&node_id)
                .expect("preorder walk only yields present nodes");
            if node_id == id {
                state.parent = None;
            }
            nodes.push((node_id, state));
        }
        Ok(SubtreeSnapshot { root: id, nodes })
    }

    /// Implant a detached subtree as the last child of `parent`.
    pub fn insert_subtree(
        &mut self,
        snapshot: SubtreeSnapshot,
        parent: ElementId,
    ) -> Result<(), ForestError> {
        if !self.nodes.contains_key(&parent) {
            return Err(ForestError::NodeNotFound(parent));
        }
        for (id, _) in &snapshot.nodes {
            if self.nodes.contains_key(id) {
                return Err(ForestError::NodeExists(*id));
            }
        }

        let root = snapshot.root;
        for (id, mut state) in snapshot.nodes {
            if id == root {
                state.parent = Some(parent);
            }
            self.nodes.insert(id, state);
        }
        self.nodes
            .get_mut(&parent)
            .expect("parent presence checked above")
            .children
            .push(root);
        Ok(())
    }

    /// Pre-order traversal of the whole forest, root first.
    pub fn preorder(&self) -> Vec<ElementId> {
        self.preorder_from(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id` (inclusive).
    pub fn preorder_from(&self, id: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) {
                continue;
            }
            order.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Flatten to one entry per node, pre-order, for storage.
    pub fn flatten(&self) -> Vec<FlatNode> {
        self.preorder()
            .into_iter()
            .map(|id| FlatNode {
                id,
                parent: self.parent(id),
                is_expanded: self
                    .nodes
                    .get(&id)
                    .map(|node| node.is_expanded)
                    .unwrap_or(false),
            })
            .collect()
    }

    /// Rebuild a forest from its flattened form.
    ///
    /// The first entry must be the root; every later entry's parent must
    /// appear earlier in the list. Child order is list order.
    pub fn reconstitute(flat: &[FlatNode]) -> Result<Self, ForestError> {
        let first = flat
            .first()
            .ok_or_else(|| ForestError::InvalidFlatList("empty node list".to_string()))?;
        if first.parent.is_some() {
            return Err(ForestError::InvalidFlatList(format!(
                "first entry {} is not a root",
                first.id
            )));
        }

        let mut forest = Forest::new(first.id);
        forest
            .node_mut(first.id)
            .expect("root was just inserted")
            .is_expanded = first.is_expanded;

        for entry in &flat[1..] {
            let parent = entry.parent.ok_or_else(|| {
                ForestError::InvalidFlatList(format!("second root {} in node list", entry.id))
            })?;
            if !forest.contains(parent) {
                return Err(ForestError::InvalidFlatList(format!(
                    "node {} appears before its parent {parent}",
                    entry.id
                )));
            }
            if forest.contains(entry.id) {
                return Err(ForestError::InvalidFlatList(format!(
                    "node {} appears twice",
                    entry.id
                )));
            }
            forest.add_node(entry.id, parent)?;
            forest
                .node_mut(entry.id)
                .expect("node was just inserted")
                .is_expanded = entry.is_expanded;
        }
        Ok(forest)
    }
}

//! FILENAME: core/drilldown-engine/src/tree.rs
//! Tree Arena - the materialized hierarchy, addressed by stable node ids.
//!
//! Node 0 is an invisible root at depth 0. A node at depth `d >= 1` holds
//! one distinct value of the `d-1`th grouping key. Sibling values are unique:
//! the arena keeps a (parent, value) index and refuses duplicates.
//!
//! Rendering is a separate projection (see `view`); nothing in here knows
//! about widgets.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::definition::{FieldValue, GroupKeySequence, Path};
use crate::error::ExplorerError;

/// Stable handle of a node. Ids are never reused by an arena: after a
/// `clear` only the root keeps its id, and older ids resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lazy-loading state of a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,

    /// Grouping key of this level (None for the root).
    pub key: Option<String>,

    /// Distinct value this node stands for (None for the root).
    pub value: Option<FieldValue>,

    /// Children in display order.
    pub children: Vec<NodeId>,

    /// The next level under this node is already covered, so expanding it
    /// needs no fetch.
    pub is_expandable: bool,

    /// This node's key is the last grouping key: it never has children.
    pub is_leaf_level: bool,

    /// Excluded by the filter of its level.
    pub hidden: bool,

    pub expanded: bool,

    pub load_state: LoadState,
}

impl TreeNode {
    fn root() -> Self {
        TreeNode {
            id: NodeId::ROOT,
            parent: None,
            depth: 0,
            key: None,
            value: None,
            children: Vec::new(),
            is_expandable: false,
            is_leaf_level: false,
            hidden: false,
            expanded: true,
            load_state: LoadState::Unloaded,
        }
    }

    /// Display label ("" for the root).
    pub fn label(&self) -> String {
        self.value.as_ref().map(FieldValue::label).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct TreeArena {
    nodes: Vec<TreeNode>,

    /// parent -> value -> child, enforcing unique sibling values.
    child_index: FxHashMap<NodeId, FxHashMap<FieldValue, NodeId>>,

    /// Bumped on every `clear`; ids from an older generation are stale.
    generation: u64,

    /// Non-root ids of the current generation start above this.
    base: u32,
}

impl Default for TreeArena {
    fn default() -> Self {
        TreeArena::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        TreeArena {
            nodes: vec![TreeNode::root()],
            child_index: FxHashMap::default(),
            generation: 0,
            base: 0,
        }
    }

    /// Drops everything but a fresh root.
    pub fn clear(&mut self) {
        self.base += (self.nodes.len() - 1) as u32;
        self.nodes.clear();
        self.nodes.push(TreeNode::root());
        self.child_index.clear();
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Position of `id` in the current generation, if it belongs to it.
    fn slot(&self, id: NodeId) -> Option<usize> {
        if id == NodeId::ROOT {
            Some(0)
        } else if id.0 > self.base {
            Some((id.0 - self.base) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.slot(id).and_then(|slot| self.nodes.get(slot))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        let slot = self.slot(id)?;
        self.nodes.get_mut(slot)
    }

    pub fn node(&self, id: NodeId) -> Result<&TreeNode, ExplorerError> {
        self.get(id).ok_or(ExplorerError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, ExplorerError> {
        self.get_mut(id).ok_or(ExplorerError::UnknownNode(id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn find_child(&self, parent: NodeId, value: &FieldValue) -> Option<NodeId> {
        self.child_index
            .get(&parent)
            .and_then(|values| values.get(value))
            .copied()
    }

    /// Appends a child unless `parent` already has one with this value.
    /// Returns the (new or existing) child.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        key: &str,
        value: FieldValue,
    ) -> Result<NodeId, ExplorerError> {
        if let Some(existing) = self.find_child(parent, &value) {
            return Ok(existing);
        }

        let depth = self.node(parent)?.depth + 1;
        let id = NodeId(self.base + self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            id,
            parent: Some(parent),
            depth,
            key: Some(key.to_string()),
            value: Some(value.clone()),
            children: Vec::new(),
            is_expandable: false,
            is_leaf_level: false,
            hidden: false,
            expanded: false,
            load_state: LoadState::Unloaded,
        });
        self.node_mut(parent)?.children.push(id);
        self.child_index.entry(parent).or_default().insert(value, id);
        Ok(id)
    }

    /// Replaces the child order of `parent`. `order` must be a permutation
    /// of the current children.
    pub fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) -> Result<(), ExplorerError> {
        let node = self.node_mut(parent)?;
        debug_assert_eq!(node.children.len(), order.len());
        node.children = order;
        Ok(())
    }

    /// Ancestor path of `id`: each ancestor's value keyed by its level's
    /// entry in `keys`, root first. The node's own value is included, so the
    /// result addresses the node's children.
    pub fn path_of(&self, id: NodeId, keys: &GroupKeySequence) -> Result<Path, ExplorerError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            let key = keys
                .key_at(current.depth - 1)
                .ok_or_else(|| ExplorerError::UnknownKey(format!("level {}", current.depth - 1)))?;
            if let Some(value) = &current.value {
                chain.push((key, value.clone()));
            }
            current = self.node(parent)?;
        }

        let mut path = Path::new();
        for (key, value) in chain.into_iter().rev() {
            path.push(key, value);
        }
        Ok(path)
    }

    /// The node addressed by `path`, if it has been materialized. Each step
    /// must match both the value and the key of its level.
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for (key, value) in path.iter() {
            let child = self.find_child(current, value)?;
            if self.get(child)?.key.as_deref() != Some(key) {
                return None;
            }
            current = child;
        }
        Some(current)
    }

    /// Depth-first text projection of the visible tree: one line per node,
    /// two spaces of indent per level. Collapsed nodes hide their subtree.
    pub fn outline(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.outline_into(NodeId::ROOT, &mut lines);
        lines
    }

    fn outline_into(&self, id: NodeId, lines: &mut Vec<String>) {
        for &child in self.children(id) {
            let Some(node) = self.get(child) else { continue };
            if node.hidden {
                continue;
            }
            let marker = if node.is_leaf_level {
                ' '
            } else if node.expanded {
                '-'
            } else {
                '+'
            };
            lines.push(format!("{}{} {}", "  ".repeat(node.depth - 1), marker, node.label()));
            if node.expanded {
                self.outline_into(child, lines);
            }
        }
    }
}

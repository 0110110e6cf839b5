//! FILENAME: core/drilldown-engine/src/walk.rs
//! Level Walks - sort and filter application over the tree arena.
//!
//! "Level L" means the children of the nodes at depth L, i.e. the nodes
//! holding values of `keys[L]`. Walks go breadth-first from the root and
//! stop at depth L, so nothing below the affected level is visited.

use crate::definition::SortOrder;
use crate::error::ExplorerError;
use crate::filter::FilterMap;
use crate::tree::{NodeId, TreeArena, TreeNode};

/// Every node at exactly `depth` (the root alone for depth 0).
pub fn nodes_at_depth(tree: &TreeArena, depth: usize) -> Vec<NodeId> {
    let mut frontier = vec![NodeId::ROOT];
    for _ in 0..depth {
        frontier = frontier
            .iter()
            .flat_map(|&id| tree.children(id).iter().copied())
            .collect();
        if frontier.is_empty() {
            break;
        }
    }
    frontier
}

/// Sorts the children of `parent` by label. Stable: equal labels keep their
/// relative order in both directions. Returns true when the order changed.
pub fn sort_children(
    tree: &mut TreeArena,
    parent: NodeId,
    order: SortOrder,
) -> Result<bool, ExplorerError> {
    let mut keyed: Vec<(String, NodeId)> = tree
        .node(parent)?
        .children
        .iter()
        .map(|&id| (tree.get(id).map(TreeNode::label).unwrap_or_default(), id))
        .collect();

    match order {
        SortOrder::Ascending => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortOrder::Descending => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    let sorted: Vec<NodeId> = keyed.into_iter().map(|(_, id)| id).collect();
    if sorted.as_slice() == tree.children(parent) {
        return Ok(false);
    }
    tree.reorder_children(parent, sorted)?;
    Ok(true)
}

/// Sorts level `level`. Returns the parents whose child order changed.
pub fn apply_sort(
    tree: &mut TreeArena,
    level: usize,
    order: SortOrder,
) -> Result<Vec<NodeId>, ExplorerError> {
    let mut changed = Vec::new();
    for parent in nodes_at_depth(tree, level) {
        if sort_children(tree, parent, order)? {
            changed.push(parent);
        }
    }
    Ok(changed)
}

/// Hides the children of `parent` whose label maps to `false` and shows
/// the rest. A node being hidden is also collapsed.
/// Returns `(node, hidden)` for every node whose visibility changed.
pub fn filter_children(
    tree: &mut TreeArena,
    parent: NodeId,
    filter: &FilterMap,
) -> Result<Vec<(NodeId, bool)>, ExplorerError> {
    let children = tree.node(parent)?.children.clone();
    let mut changes = Vec::new();

    for id in children {
        let node = tree.node_mut(id)?;
        let hidden = filter.get(&node.label()) == Some(&false);
        if node.hidden != hidden {
            node.hidden = hidden;
            if hidden {
                node.expanded = false;
            }
            changes.push((id, hidden));
        }
    }
    Ok(changes)
}

/// Filters level `level`. Returns every visibility change.
pub fn apply_filter(
    tree: &mut TreeArena,
    level: usize,
    filter: &FilterMap,
) -> Result<Vec<(NodeId, bool)>, ExplorerError> {
    let mut changes = Vec::new();
    for parent in nodes_at_depth(tree, level) {
        changes.extend(filter_children(tree, parent, filter)?);
    }
    Ok(changes)
}

//! FILENAME: core/drilldown-engine/src/builder.rs
//! Hierarchy Builder - folds flat records into the tree arena.
//!
//! Algorithm (per record, starting under the node being materialized):
//! 1. Skip the record unless it matches the node's path
//! 2. Find or create the sibling whose value equals record[target_key]
//! 3. If the record also has a value for the next key, descend and repeat
//!
//! Matching by value at every level makes the fold idempotent: replaying
//! the same or a larger record set never duplicates a sibling and never
//! drops a subtree built earlier.

use crate::coverage::QueryCoverageCache;
use crate::definition::{FieldValue, GroupKeySequence, Path, Record};
use crate::error::{ExplorerError, SchemaError};
use crate::logging::log_debug;
use crate::tree::{LoadState, NodeId, TreeArena};

pub struct HierarchyBuilder<'a> {
    keys: &'a GroupKeySequence,
    coverage: &'a QueryCoverageCache,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(keys: &'a GroupKeySequence, coverage: &'a QueryCoverageCache) -> Self {
        HierarchyBuilder { keys, coverage }
    }

    /// Folds `records` into the children of `parent`, whose level key is
    /// `target_key`. Returns the full child list of `parent` afterwards.
    pub fn materialize_level<'r, I>(
        &self,
        tree: &mut TreeArena,
        parent: NodeId,
        target_key: &str,
        records: I,
    ) -> Result<Vec<NodeId>, ExplorerError>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        if self.keys.position(target_key).is_none() {
            return Err(ExplorerError::UnknownKey(target_key.to_string()));
        }

        let parent_path = tree.path_of(parent, self.keys)?;
        let mut skipped: Vec<SchemaError> = Vec::new();

        for record in records {
            if !parent_path.matches(record) {
                continue;
            }
            if !self.insert_record(tree, parent, &parent_path, target_key, record)? {
                skipped.push(SchemaError::MissingField {
                    row_id: record.row_id,
                    key: target_key.to_string(),
                });
            }
        }

        if let Some(first) = skipped.first() {
            log_debug!(
                "TREE",
                "materialize {} under {}: skipped {} partial record(s), first: {}",
                target_key,
                parent_path,
                skipped.len(),
                first
            );
        }

        Ok(tree.children(parent).to_vec())
    }

    /// Inserts one record starting at `parent`, descending as far as the
    /// record carries consecutive keys. Returns false when the record has
    /// no value for `target_key` and was skipped.
    fn insert_record(
        &self,
        tree: &mut TreeArena,
        parent: NodeId,
        parent_path: &Path,
        target_key: &str,
        record: &Record,
    ) -> Result<bool, ExplorerError> {
        let Some(first_value) = record.get(target_key) else {
            return Ok(false);
        };

        let mut parent = parent;
        let mut path = parent_path.clone();
        let mut key = target_key;
        let mut value = first_value;

        loop {
            let child = self.find_or_create(tree, parent, &path, key, value)?;
            let Some(next_key) = self.keys.next_key(key) else {
                break;
            };
            let Some(next_value) = record.get(next_key) else {
                break;
            };
            path.push(key, value.clone());
            parent = child;
            key = next_key;
            value = next_value;
        }

        Ok(true)
    }

    /// The child of `parent` for `value`, created with fresh hints when absent.
    /// Hints of an existing child are refreshed: coverage only grows, so a
    /// hint can only turn on.
    fn find_or_create(
        &self,
        tree: &mut TreeArena,
        parent: NodeId,
        parent_path: &Path,
        key: &str,
        value: &FieldValue,
    ) -> Result<NodeId, ExplorerError> {
        let child = match tree.find_child(parent, value) {
            Some(existing) => existing,
            None => tree.add_child(parent, key, value.clone())?,
        };

        let is_leaf_level = self.keys.is_last(key);
        let covered = match self.keys.next_key(key) {
            Some(next_key) => {
                let child_path = parent_path.extended(key, value);
                self.coverage.is_covered(next_key, &child_path)
            }
            None => false,
        };

        let node = tree.node_mut(child)?;
        node.is_leaf_level = is_leaf_level;
        if covered {
            node.is_expandable = true;
            if node.load_state == LoadState::Unloaded {
                node.load_state = LoadState::Loaded;
            }
        }
        Ok(child)
    }
}

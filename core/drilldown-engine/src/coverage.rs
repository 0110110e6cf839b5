//! FILENAME: core/drilldown-engine/src/coverage.rs
//! Query Coverage - which group queries were already answered in full.
//!
//! The cache is a trie keyed by alternating (key, value) pairs along a path.
//! Every trie node carries the set of target keys fully fetched at that path.
//! Insert and lookup walk the path in the same order (key-sequence order,
//! root first), so a marked query is always found again.
//!
//! Coverage only grows: there is no expiry and no partial coverage.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{FieldValue, GroupQuery, Path};

#[derive(Debug, Default)]
struct CoverageNode {
    /// Target keys fully fetched at the path leading here.
    covered: FxHashSet<String>,

    /// key -> value -> subtrie.
    children: FxHashMap<String, FxHashMap<FieldValue, CoverageNode>>,
}

impl CoverageNode {
    fn descend(&self, key: &str, value: &FieldValue) -> Option<&CoverageNode> {
        self.children.get(key).and_then(|values| values.get(value))
    }

    fn descend_or_create(&mut self, key: &str, value: &FieldValue) -> &mut CoverageNode {
        self.children
            .entry(key.to_string())
            .or_default()
            .entry(value.clone())
            .or_default()
    }
}

#[derive(Debug, Default)]
pub struct QueryCoverageCache {
    root: CoverageNode,
    marks: usize,
}

impl QueryCoverageCache {
    pub fn new() -> Self {
        QueryCoverageCache::default()
    }

    /// Records that every record matching (`target_key`, `path`) is resident.
    /// Returns false when the query was already marked.
    pub fn mark_covered(&mut self, target_key: &str, path: &Path) -> bool {
        let mut node = &mut self.root;
        for (key, value) in path.iter() {
            node = node.descend_or_create(key, value);
        }
        let inserted = node.covered.insert(target_key.to_string());
        if inserted {
            self.marks += 1;
        }
        inserted
    }

    pub fn is_covered(&self, target_key: &str, path: &Path) -> bool {
        let mut node = &self.root;
        for (key, value) in path.iter() {
            match node.descend(key, value) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.covered.contains(target_key)
    }

    pub fn mark_query(&mut self, query: &GroupQuery) -> bool {
        self.mark_covered(&query.target_key, &query.path)
    }

    pub fn is_query_covered(&self, query: &GroupQuery) -> bool {
        self.is_covered(&query.target_key, &query.path)
    }

    /// Number of distinct queries marked so far.
    pub fn len(&self) -> usize {
        self.marks
    }

    pub fn is_empty(&self) -> bool {
        self.marks == 0
    }
}

//! FILENAME: core/drilldown-engine/src/session.rs
//! Data Context - the owned session data: key sequence, rows, coverage.
//!
//! Rows and coverage only grow. The key sequence is replaced wholesale on
//! reorder; rows and coverage stay valid across a reorder.

use crate::builder::HierarchyBuilder;
use crate::coverage::QueryCoverageCache;
use crate::definition::{GroupKeySequence, GroupQuery, Record};
use crate::error::ExplorerError;
use crate::logging::log_debug;
use crate::store::{MergeStats, RowStore};
use crate::tree::{NodeId, TreeArena};

#[derive(Debug, Default)]
pub struct DataContext {
    keys: GroupKeySequence,
    rows: RowStore,
    coverage: QueryCoverageCache,
}

impl DataContext {
    pub fn new(keys: GroupKeySequence) -> Self {
        DataContext {
            keys,
            rows: RowStore::new(),
            coverage: QueryCoverageCache::new(),
        }
    }

    pub fn keys(&self) -> &GroupKeySequence {
        &self.keys
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn coverage(&self) -> &QueryCoverageCache {
        &self.coverage
    }

    pub fn set_keys(&mut self, keys: GroupKeySequence) {
        self.keys = keys;
    }

    /// The query that yields the children of `node`, or None when `node`
    /// sits at the deepest level.
    pub fn query_for(&self, tree: &TreeArena, node: NodeId) -> Result<Option<GroupQuery>, ExplorerError> {
        let depth = tree.node(node)?.depth;
        let Some(target_key) = self.keys.key_at(depth) else {
            return Ok(None);
        };
        let path = tree.path_of(node, &self.keys)?;
        Ok(Some(GroupQuery::new(target_key, path)))
    }

    pub fn is_covered(&self, query: &GroupQuery) -> bool {
        self.coverage.is_query_covered(query)
    }

    /// Merges the complete answer to `query` and marks it covered, then
    /// turns on the expand hint of the node the query addresses (if it is
    /// in `tree`).
    pub fn absorb(&mut self, query: &GroupQuery, records: Vec<Record>, tree: &mut TreeArena) -> MergeStats {
        let received = records.len();
        let stats = self.rows.merge(records);
        self.coverage.mark_query(query);

        if let Some(node) = tree.find_by_path(&query.path).and_then(|id| tree.get_mut(id)) {
            node.is_expandable = true;
        }

        log_debug!(
            "COVERAGE",
            "absorbed {}: {} record(s), {} new, {} updated, {} quer(y/ies) covered",
            query,
            received,
            stats.inserted,
            stats.updated,
            self.coverage.len()
        );
        stats
    }

    /// Folds every resident record under `node` into its children.
    pub fn materialize(&self, tree: &mut TreeArena, node: NodeId) -> Result<Vec<NodeId>, ExplorerError> {
        let Some(query) = self.query_for(tree, node)? else {
            return Ok(Vec::new());
        };
        let builder = HierarchyBuilder::new(&self.keys, &self.coverage);
        builder.materialize_level(tree, node, &query.target_key, self.rows.matching(&query.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Path;
    use crate::tree::LoadState;

    fn context() -> DataContext {
        DataContext::new(
            GroupKeySequence::new(vec!["Country".into(), "State".into(), "City".into()]).unwrap(),
        )
    }

    #[test]
    fn test_query_for_each_depth() {
        let ctx = context();
        let mut tree = TreeArena::new();
        let us = tree.add_child(NodeId::ROOT, "Country", "US".into()).unwrap();
        let ca = tree.add_child(us, "State", "CA".into()).unwrap();
        let la = tree.add_child(ca, "City", "LA".into()).unwrap();

        let root = ctx.query_for(&tree, NodeId::ROOT).unwrap().unwrap();
        assert_eq!(root, GroupQuery::new("Country", Path::new()));

        let q = ctx.query_for(&tree, ca).unwrap().unwrap();
        assert_eq!(q.target_key, "City");
        assert_eq!(q.path.to_string(), "Country=US/State=CA");

        assert_eq!(ctx.query_for(&tree, la).unwrap(), None);
    }

    #[test]
    fn test_absorb_marks_coverage_and_hint() {
        let mut ctx = context();
        let mut tree = TreeArena::new();
        let us = tree.add_child(NodeId::ROOT, "Country", "US".into()).unwrap();

        let query = ctx.query_for(&tree, us).unwrap().unwrap();
        assert!(!ctx.is_covered(&query));

        let stats = ctx.absorb(
            &query,
            vec![Record::new(3).with("Country", "US").with("State", "CA")],
            &mut tree,
        );
        assert_eq!(stats.inserted, 1);
        assert!(ctx.is_covered(&query));
        assert!(tree.node(us).unwrap().is_expandable);
        assert_eq!(tree.node(us).unwrap().load_state, LoadState::Unloaded);
    }

    #[test]
    fn test_materialize_uses_all_resident_rows() {
        let mut ctx = context();
        let mut tree = TreeArena::new();
        let root_query = GroupQuery::new("Country", Path::new());
        ctx.absorb(
            &root_query,
            vec![
                Record::new(1).with("Country", "US").with("State", "CA"),
                Record::new(2).with("Country", "US").with("State", "NY"),
            ],
            &mut tree,
        );
        let roots = ctx.materialize(&mut tree, NodeId::ROOT).unwrap();
        let us = roots[0];

        // A later, narrower answer only carries CA; NY is still built
        let query = ctx.query_for(&tree, us).unwrap().unwrap();
        ctx.absorb(
            &query,
            vec![Record::new(3).with("Country", "US").with("State", "CA").with("City", "LA")],
            &mut tree,
        );
        let states = ctx.materialize(&mut tree, us).unwrap();
        let labels: Vec<String> = states.iter().map(|&id| tree.node(id).unwrap().label()).collect();
        assert_eq!(labels, vec!["CA", "NY"]);
    }
}

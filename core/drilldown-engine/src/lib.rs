//! FILENAME: core/drilldown-engine/src/lib.rs
//! Drill-down engine for browsing a flat record set as a grouped hierarchy.
//!
//! Only the branches the user actually opens are fetched. Everything that
//! was fetched once is remembered, folded into the tree incrementally and
//! kept consistent with the per-level sort order and value filters.
//!
//! Layers:
//! - `definition`: Values, records, key sequence, paths and group queries
//! - `coverage`: Which group queries were already answered in full
//! - `store`: Field-level union of every record fetched this session
//! - `tree` / `builder`: Arena of tree nodes and the incremental folder
//! - `filter` / `sort` / `walk`: Per-level visibility and ordering
//! - `session` / `controller`: The data context and the lazy expansion driver
//! - `source` / `view`: Contracts for the data source and the tree view

pub mod builder;
pub mod controller;
pub mod coverage;
pub mod definition;
pub mod error;
pub mod filter;
pub mod logging;
pub mod options;
pub mod session;
pub mod sort;
pub mod source;
pub mod store;
pub mod tree;
pub mod view;
pub mod walk;

pub use builder::HierarchyBuilder;
pub use controller::{ExpandOutcome, ExplorerController, LoadStatus};
pub use coverage::QueryCoverageCache;
pub use definition::*;
pub use error::{ExplorerError, SchemaError, TransportError};
pub use filter::{FilterMap, FilterState, SourceId};
pub use options::{FilterOption, FilterOptions};
pub use session::DataContext;
pub use sort::SortState;
pub use source::{DataSource, FlatTable};
pub use store::{MergeStats, RowStore};
pub use tree::{LoadState, NodeId, TreeArena, TreeNode};
pub use view::{OutlineView, TreeView, ViewEvent};

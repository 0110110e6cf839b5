//! FILENAME: core/drilldown-engine/src/controller.rs
//! Explorer Controller - drives lazy expansion between a data source and a
//! tree view.
//!
//! Per node: Unloaded -> Loading -> Loaded. Expanding a node whose child
//! query is covered is served from the row store with no fetch. Otherwise
//! one fetch is issued per distinct query; concurrent requests for the same
//! query wait on that fetch through a watch channel instead of issuing
//! another one.
//!
//! Everything runs on one thread. The only suspension points are the data
//! source calls and the waits on an in-flight fetch. No `RefCell` borrow is
//! held across either, and the merge of a fetched batch, its coverage mark,
//! the removal of the in-flight entry and the wake-up of waiters happen
//! without yielding in between.
//!
//! A rebuild (session start, key reorder) clears the arena and bumps its
//! generation. Expansions still running from an older generation merge
//! their data but report `LoadStatus::Stale` and touch no node.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tokio::sync::watch;

use crate::definition::{GroupKeySequence, GroupQuery, SortOrder};
use crate::error::{ExplorerError, TransportError};
use crate::filter::{FilterMap, FilterState, SourceId};
use crate::logging::{log_debug, log_enter, log_exit, log_info, log_warn};
use crate::options::FilterOptions;
use crate::session::DataContext;
use crate::sort::SortState;
use crate::source::DataSource;
use crate::tree::{LoadState, NodeId, TreeArena};
use crate::view::TreeView;
use crate::walk;

// ============================================================================
// OUTCOMES
// ============================================================================

/// How an expansion obtained its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The node is at the deepest level; nothing to load.
    Leaf,
    /// Coverage was already established; built from the row store.
    Cached,
    /// This call fetched the level.
    Fetched,
    /// Waited on a fetch another call had in flight.
    Coalesced,
    /// The fetch failed. The node is back to Unloaded.
    Failed(TransportError),
    /// The tree was rebuilt while this call waited; its data was merged
    /// but the node it was issued for no longer exists.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOutcome {
    pub node: NodeId,
    /// Children in display order (empty on failure).
    pub children: Vec<NodeId>,
    pub status: LoadStatus,
}

impl ExpandOutcome {
    fn new(node: NodeId, children: Vec<NodeId>, status: LoadStatus) -> Self {
        ExpandOutcome { node, children, status }
    }

    fn empty(node: NodeId, status: LoadStatus) -> Self {
        ExpandOutcome::new(node, Vec::new(), status)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, LoadStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&TransportError> {
        match &self.status {
            LoadStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// IN-FLIGHT FETCHES
// ============================================================================

#[derive(Debug, Clone)]
enum FetchState {
    Pending,
    Done(Result<(), TransportError>),
}

type InFlightMap = RefCell<FxHashMap<GroupQuery, watch::Receiver<FetchState>>>;

/// Owns one entry of the in-flight map; the entry goes away with the slot,
/// including when the fetching future is dropped mid-flight. A slot dropped
/// before `settle` also puts its node back to Unloaded.
struct InFlightSlot<'a> {
    map: &'a InFlightMap,
    query: GroupQuery,
    tree: &'a RefCell<TreeArena>,
    node: NodeId,
    generation: u64,
    settled: bool,
}

impl InFlightSlot<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.map.borrow_mut().remove(&self.query);
        if self.settled {
            return;
        }
        let Ok(mut tree) = self.tree.try_borrow_mut() else {
            return;
        };
        if tree.generation() != self.generation {
            return;
        }
        if let Some(entry) = tree.get_mut(self.node) {
            if entry.load_state == LoadState::Loading {
                entry.load_state = LoadState::Unloaded;
                log_debug!("FETCH", "{} abandoned, {} back to unloaded", self.query, self.node);
            }
        }
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct ExplorerController<S, V> {
    source: S,
    view: RefCell<V>,
    filters: Rc<FilterState>,
    source_id: SourceId,
    context: RefCell<DataContext>,
    tree: RefCell<TreeArena>,
    sort: RefCell<SortState>,
    in_flight: InFlightMap,
    fetches: Cell<usize>,
}

impl<S, V> ExplorerController<S, V>
where
    S: DataSource + 'static,
    V: TreeView + 'static,
{
    /// Creates the controller and subscribes it to `filters`. Filter changes
    /// issued by anyone else are applied to the matching level at once.
    pub fn new(source: S, view: V, filters: Rc<FilterState>) -> Rc<Self> {
        let source_id = filters.register_source();

        Rc::new_cyclic(|weak: &Weak<Self>| {
            let controller = weak.clone();
            filters.subscribe(move |key, origin| {
                if origin == source_id {
                    return;
                }
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                if let Err(err) = controller.refresh_filter(key) {
                    log_debug!("FILTER", "ignored change of {} from {}: {}", key, origin, err);
                }
            });

            ExplorerController {
                source,
                view: RefCell::new(view),
                filters,
                source_id,
                context: RefCell::new(DataContext::default()),
                tree: RefCell::new(TreeArena::new()),
                sort: RefCell::new(SortState::new()),
                in_flight: RefCell::new(FxHashMap::default()),
                fetches: Cell::new(0),
            }
        })
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    /// Loads the headers, resets the session and loads the root level.
    /// A failed header fetch is returned as an error: there is nothing to show.
    pub async fn start(&self) -> Result<ExpandOutcome, ExplorerError> {
        log_enter!("TREE", "start");
        let headers = self.source.fetch_headers().await?;
        let keys = GroupKeySequence::new(headers)?;
        log_info!("TREE", "session keys: {}", keys.keys().join(", "));

        *self.sort.borrow_mut() = SortState::for_keys(&keys);
        *self.context.borrow_mut() = DataContext::new(keys);

        let outcome = self.rebuild().await?;
        log_exit!("TREE", "start", "roots={} status={:?}", outcome.children.len(), outcome.status);
        Ok(outcome)
    }

    /// Replaces the key order and rebuilds the tree from the row store.
    /// Only the root level may need a fetch, when its new key was never
    /// loaded at the top.
    pub async fn reorder_keys(&self, new_keys: Vec<String>) -> Result<ExpandOutcome, ExplorerError> {
        let keys = self.context.borrow().keys().reordered(new_keys)?;
        log_info!("TREE", "reorder keys: {}", keys.keys().join(", "));
        self.context.borrow_mut().set_keys(keys);
        self.rebuild().await
    }

    async fn rebuild(&self) -> Result<ExpandOutcome, ExplorerError> {
        self.view.borrow_mut().destroy();
        {
            let context = self.context.borrow();
            let mut tree = self.tree.borrow_mut();
            tree.clear();
            context.materialize(&mut tree, NodeId::ROOT)?;
            log_debug!("TREE", "rebuilt {} node(s) from resident rows", tree.len() - 1);
        }

        let outcome = self.on_lazy_load(NodeId::ROOT).await?;
        self.view.borrow_mut().render(&self.tree.borrow());
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // View callbacks
    // ------------------------------------------------------------------------

    /// Toggles a node. Expanding loads its children when needed; a failed
    /// load collapses the node again so the next click retries.
    pub async fn on_node_click(&self, node: NodeId) -> Result<Option<ExpandOutcome>, ExplorerError> {
        let (expanded, leaf_level) = {
            let tree = self.tree.borrow();
            let entry = tree.node(node)?;
            (entry.expanded, entry.is_leaf_level)
        };
        if node == NodeId::ROOT || leaf_level {
            return Ok(None);
        }
        if expanded {
            self.set_expanded(node, false)?;
            return Ok(None);
        }

        let generation = self.tree.borrow().generation();
        self.set_expanded(node, true)?;
        let outcome = self.on_lazy_load(node).await?;
        if outcome.is_failure() && self.tree.borrow().generation() == generation {
            self.set_expanded(node, false)?;
        }
        Ok(Some(outcome))
    }

    /// Materializes the children of `node`, fetching them only when their
    /// query is neither covered nor already in flight. Transport failures
    /// are reported in the outcome, never as `Err`.
    pub async fn on_lazy_load(&self, node: NodeId) -> Result<ExpandOutcome, ExplorerError> {
        let generation = self.tree.borrow().generation();
        let query = {
            let tree = self.tree.borrow();
            self.context.borrow().query_for(&tree, node)?
        };
        let Some(query) = query else {
            return Ok(ExpandOutcome::empty(node, LoadStatus::Leaf));
        };

        loop {
            if self.tree.borrow().generation() != generation {
                return Ok(ExpandOutcome::empty(node, LoadStatus::Stale));
            }
            if self.context.borrow().is_covered(&query) {
                log_debug!("FETCH", "{} covered, served from row store", query);
                return self.finish_level(node, LoadStatus::Cached);
            }

            let pending = self.in_flight.borrow().get(&query).cloned();
            let Some(mut receiver) = pending else {
                break;
            };

            self.set_load_state(node, LoadState::Loading);
            log_debug!("FETCH", "{} already in flight, waiting", query);
            let state = receiver
                .wait_for(|state| !matches!(state, FetchState::Pending))
                .await
                .map(|state| (*state).clone());

            match state {
                Ok(FetchState::Done(Ok(()))) => {
                    if self.tree.borrow().generation() != generation {
                        return Ok(ExpandOutcome::empty(node, LoadStatus::Stale));
                    }
                    return self.finish_level(node, LoadStatus::Coalesced);
                }
                Ok(FetchState::Done(Err(err))) => return Ok(self.fail(node, generation, err)),
                // The fetching call went away without an answer
                Ok(FetchState::Pending) | Err(_) => continue,
            }
        }

        self.fetch_level(node, query, generation).await
    }

    async fn fetch_level(
        &self,
        node: NodeId,
        query: GroupQuery,
        generation: u64,
    ) -> Result<ExpandOutcome, ExplorerError> {
        let (sender, receiver) = watch::channel(FetchState::Pending);
        self.in_flight.borrow_mut().insert(query.clone(), receiver);
        let slot = InFlightSlot {
            map: &self.in_flight,
            query: query.clone(),
            tree: &self.tree,
            node,
            generation,
            settled: false,
        };

        self.set_load_state(node, LoadState::Loading);
        self.fetches.set(self.fetches.get() + 1);
        log_info!("FETCH", "fetch {}", query);

        match self.source.fetch_rows(&query).await {
            Ok(records) => {
                {
                    let mut tree = self.tree.borrow_mut();
                    self.context.borrow_mut().absorb(&query, records, &mut tree);
                }
                slot.settle();
                sender.send_replace(FetchState::Done(Ok(())));

                if self.tree.borrow().generation() != generation {
                    log_debug!("FETCH", "{} arrived after a rebuild, merged only", query);
                    return Ok(ExpandOutcome::empty(node, LoadStatus::Stale));
                }
                self.finish_level(node, LoadStatus::Fetched)
            }
            Err(err) => {
                log_warn!("FETCH", "fetch {} failed: {}", query, err);
                slot.settle();
                sender.send_replace(FetchState::Done(Err(err.clone())));
                Ok(self.fail(node, generation, err))
            }
        }
    }

    /// Builds the children of `node` from the row store, marks it Loaded and
    /// applies the sort and filter of its child level.
    fn finish_level(&self, node: NodeId, status: LoadStatus) -> Result<ExpandOutcome, ExplorerError> {
        let children = {
            let context = self.context.borrow();
            let mut tree = self.tree.borrow_mut();
            let children = context.materialize(&mut tree, node)?;
            tree.node_mut(node)?.load_state = LoadState::Loaded;
            children
        };
        log_debug!("TREE", "{} loaded {} child(ren), {:?}", node, children.len(), status);

        self.view.borrow_mut().children_loaded(node, &children);
        self.on_level_loaded(node)?;

        let children = self.tree.borrow().children(node).to_vec();
        Ok(ExpandOutcome::new(node, children, status))
    }

    fn fail(&self, node: NodeId, generation: u64, err: TransportError) -> ExpandOutcome {
        if self.tree.borrow().generation() == generation {
            self.set_load_state(node, LoadState::Unloaded);
        }
        ExpandOutcome::empty(node, LoadStatus::Failed(err))
    }

    /// Applies the current sort order and filter of the level below `node`
    /// to the children of `node`.
    pub fn on_level_loaded(&self, node: NodeId) -> Result<(), ExplorerError> {
        let key = {
            let tree = self.tree.borrow();
            let depth = tree.node(node)?.depth;
            match self.context.borrow().keys().key_at(depth) {
                Some(key) => key.to_string(),
                None => return Ok(()),
            }
        };
        let order = self.sort.borrow().order(&key);
        let filter = self.filters.get_filter(&key);

        let mut tree = self.tree.borrow_mut();
        let mut view = self.view.borrow_mut();
        if walk::sort_children(&mut tree, node, order)? {
            view.sort_children_of(node, tree.children(node));
        }
        for (child, hidden) in walk::filter_children(&mut tree, node, &filter)? {
            view.set_hidden(child, hidden);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------------

    /// Flips the order of `key` and re-sorts its level.
    pub fn toggle_sort(&self, key: &str) -> Result<SortOrder, ExplorerError> {
        let order = self.sort.borrow().order(key).toggled();
        self.set_sort(key, order)?;
        Ok(order)
    }

    pub fn set_sort(&self, key: &str, order: SortOrder) -> Result<(), ExplorerError> {
        let level = self.level_of(key)?;
        self.sort.borrow_mut().set(key, order);

        let mut tree = self.tree.borrow_mut();
        let mut view = self.view.borrow_mut();
        let changed = walk::apply_sort(&mut tree, level, order)?;
        for &parent in &changed {
            view.sort_children_of(parent, tree.children(parent));
        }
        log_info!("SORT", "{} {}: {} parent(s) reordered", key, order.as_str(), changed.len());
        Ok(())
    }

    pub fn sort_order(&self, key: &str) -> SortOrder {
        self.sort.borrow().order(key)
    }

    // ------------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------------

    /// Stores `diff` for `key` as this controller's change and applies it.
    /// Returns the number of nodes whose visibility changed.
    pub fn set_filter(&self, key: &str, diff: FilterMap) -> Result<usize, ExplorerError> {
        self.level_of(key)?;
        self.filters.update_filter(key, diff, self.source_id);
        self.refresh_filter(key)
    }

    /// Re-applies the stored filter of `key` to its level.
    pub fn refresh_filter(&self, key: &str) -> Result<usize, ExplorerError> {
        let level = self.level_of(key)?;
        let filter = self.filters.get_filter(key);

        let mut tree = self.tree.borrow_mut();
        let mut view = self.view.borrow_mut();
        let changes = walk::apply_filter(&mut tree, level, &filter)?;
        for &(node, hidden) in &changes {
            view.set_hidden(node, hidden);
        }
        log_debug!("FILTER", "{}: {} visibility change(s)", key, changes.len());
        Ok(changes.len())
    }

    /// The filter popup model for `key`, ordered like its level.
    pub fn filter_options(&self, key: &str) -> Result<FilterOptions, ExplorerError> {
        self.level_of(key)?;
        let context = self.context.borrow();
        Ok(FilterOptions::build(key, context.rows(), &self.filters, self.sort_order(key)))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn filters(&self) -> &Rc<FilterState> {
        &self.filters
    }

    pub fn tree(&self) -> Ref<'_, TreeArena> {
        self.tree.borrow()
    }

    pub fn context(&self) -> Ref<'_, DataContext> {
        self.context.borrow()
    }

    pub fn view(&self) -> Ref<'_, V> {
        self.view.borrow()
    }

    pub fn view_mut(&self) -> RefMut<'_, V> {
        self.view.borrow_mut()
    }

    /// Number of `fetch_rows` calls issued so far.
    pub fn fetches_issued(&self) -> usize {
        self.fetches.get()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.borrow().len()
    }

    pub fn load_state(&self, node: NodeId) -> Result<LoadState, ExplorerError> {
        Ok(self.tree.borrow().node(node)?.load_state)
    }

    /// Follows child labels from the root.
    pub fn find_node(&self, labels: &[&str]) -> Option<NodeId> {
        let tree = self.tree.borrow();
        let mut current = NodeId::ROOT;
        for label in labels {
            current = tree
                .children(current)
                .iter()
                .copied()
                .find(|&id| tree.get(id).map_or(false, |n| n.label() == *label))?;
        }
        Some(current)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn level_of(&self, key: &str) -> Result<usize, ExplorerError> {
        self.context
            .borrow()
            .keys()
            .position(key)
            .ok_or_else(|| ExplorerError::UnknownKey(key.to_string()))
    }

    fn set_expanded(&self, node: NodeId, expanded: bool) -> Result<(), ExplorerError> {
        self.tree.borrow_mut().node_mut(node)?.expanded = expanded;
        self.view.borrow_mut().set_expanded(node, expanded);
        Ok(())
    }

    fn set_load_state(&self, node: NodeId, state: LoadState) {
        if let Some(entry) = self.tree.borrow_mut().get_mut(node) {
            entry.load_state = state;
        }
    }
}

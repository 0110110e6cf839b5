//! FILENAME: core/drilldown-engine/src/filter.rs
//! Filter State - per-key value visibility shared by every filter UI.
//!
//! One instance is constructed per session and handed (as `Rc<FilterState>`)
//! to the controller and to any other component that edits filters. Each
//! editor registers once to obtain a `SourceId` and passes it with every
//! update; subscribers receive the id of the originator so they can skip
//! changes they issued themselves.
//!
//! Subscribers are invoked synchronously, in registration order, after the
//! diff has been stored. A subscriber may read filters or issue further
//! updates, but must not subscribe from inside a notification.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::definition::FieldValue;
use crate::logging::log_debug;

/// Value label -> visible. A label without an entry is visible.
pub type FilterMap = BTreeMap<String, bool>;

/// Identity of a filter-change originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src{}", self.0)
    }
}

type Subscriber = Box<dyn Fn(&str, SourceId)>;

#[derive(Default)]
pub struct FilterState {
    filters: RefCell<FxHashMap<String, FilterMap>>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_source: Cell<u64>,
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    /// Issues a fresh originator identity.
    pub fn register_source(&self) -> SourceId {
        let id = self.next_source.get();
        self.next_source.set(id + 1);
        SourceId(id)
    }

    /// Adds a change listener. Listeners run in the order they were added.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&str, SourceId) + 'static,
    {
        self.subscribers.borrow_mut().push(Box::new(listener));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Snapshot of the stored map for `key` (empty when never filtered).
    pub fn get_filter(&self, key: &str) -> FilterMap {
        self.filters.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn is_visible(&self, key: &str, value: &FieldValue) -> bool {
        self.is_label_visible(key, &value.label())
    }

    pub fn is_label_visible(&self, key: &str, label: &str) -> bool {
        self.filters
            .borrow()
            .get(key)
            .and_then(|map| map.get(label))
            .copied()
            .unwrap_or(true)
    }

    /// Merges `diff` into the map for `key`, then notifies every subscriber
    /// with `(key, source)`.
    pub fn update_filter(&self, key: &str, diff: FilterMap, source: SourceId) {
        {
            let mut filters = self.filters.borrow_mut();
            let entry = filters.entry(key.to_string()).or_default();
            let changed = diff.len();
            entry.extend(diff);
            log_debug!(
                "FILTER",
                "update {} from {}: {} entr(y/ies), {} hidden",
                key,
                source,
                changed,
                entry.values().filter(|visible| !**visible).count()
            );
        }

        let subscribers = self.subscribers.borrow();
        for listener in subscribers.iter() {
            listener(key, source);
        }
    }
}

impl fmt::Debug for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterState")
            .field("filters", &self.filters.borrow())
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

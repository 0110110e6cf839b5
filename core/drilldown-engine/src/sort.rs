//! FILENAME: core/drilldown-engine/src/sort.rs
//! Sort State - one order per grouping key, ascending unless changed.

use rustc_hash::FxHashMap;

use crate::definition::{GroupKeySequence, SortOrder};

#[derive(Debug, Clone, Default)]
pub struct SortState {
    orders: FxHashMap<String, SortOrder>,
}

impl SortState {
    pub fn new() -> Self {
        SortState::default()
    }

    /// Every key of `keys` explicitly ascending.
    pub fn for_keys(keys: &GroupKeySequence) -> Self {
        SortState {
            orders: keys
                .keys()
                .iter()
                .map(|k| (k.clone(), SortOrder::Ascending))
                .collect(),
        }
    }

    pub fn order(&self, key: &str) -> SortOrder {
        self.orders.get(key).copied().unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, order: SortOrder) {
        self.orders.insert(key.to_string(), order);
    }

    /// Flips the order of `key` and returns the new order.
    pub fn toggle(&mut self, key: &str) -> SortOrder {
        let order = self.order(key).toggled();
        self.set(key, order);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ascending_and_toggle() {
        let keys = GroupKeySequence::new(vec!["Country".into(), "State".into()]).unwrap();
        let mut sort = SortState::for_keys(&keys);

        assert_eq!(sort.order("Country"), SortOrder::Ascending);
        assert_eq!(sort.order("Unknown"), SortOrder::Ascending);

        assert_eq!(sort.toggle("State"), SortOrder::Descending);
        assert_eq!(sort.order("State"), SortOrder::Descending);
        assert_eq!(sort.order("Country"), SortOrder::Ascending);
        assert_eq!(sort.toggle("State"), SortOrder::Ascending);
    }
}

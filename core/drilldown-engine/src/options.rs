//! FILENAME: core/drilldown-engine/src/options.rs
//! Filter Options - the checkbox list behind a key's filter popup.
//!
//! Built on demand from the row store, so it always lists every value
//! fetched so far. The popup never edits `FilterState` directly: each
//! action yields a diff that the caller submits with its own `SourceId`.

use serde::Serialize;

use crate::definition::{FieldValue, SortOrder};
use crate::filter::{FilterMap, FilterState};
use crate::store::RowStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: FieldValue,
    pub label: String,
    /// Currently visible.
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub key: String,
    pub options: Vec<FilterOption>,
}

impl FilterOptions {
    /// Every distinct value of `key` in `rows`, ordered by label per `order`.
    pub fn build(key: &str, rows: &RowStore, filters: &FilterState, order: SortOrder) -> Self {
        let mut options: Vec<FilterOption> = rows
            .distinct_values(key)
            .into_iter()
            .map(|value| {
                let label = value.label();
                FilterOption {
                    checked: filters.is_label_visible(key, &label),
                    value,
                    label,
                }
            })
            .collect();

        match order {
            SortOrder::Ascending => options.sort_by(|a, b| a.label.cmp(&b.label)),
            SortOrder::Descending => options.sort_by(|a, b| b.label.cmp(&a.label)),
        }

        FilterOptions {
            key: key.to_string(),
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn checked_count(&self) -> usize {
        self.options.iter().filter(|o| o.checked).count()
    }

    /// Options whose label contains `needle`, ignoring case. An empty
    /// needle matches everything.
    pub fn search(&self, needle: &str) -> Vec<&FilterOption> {
        let needle = needle.to_lowercase();
        self.options
            .iter()
            .filter(|o| o.label.to_lowercase().contains(&needle))
            .collect()
    }

    /// Flips every option.
    pub fn invert_diff(&self) -> FilterMap {
        self.options
            .iter()
            .map(|o| (o.label.clone(), !o.checked))
            .collect()
    }

    /// Makes every option visible.
    pub fn check_all_diff(&self) -> FilterMap {
        self.options
            .iter()
            .map(|o| (o.label.clone(), true))
            .collect()
    }

    /// Flips a single option. Empty when `label` is not listed.
    pub fn toggle_diff(&self, label: &str) -> FilterMap {
        self.options
            .iter()
            .filter(|o| o.label == label)
            .map(|o| (o.label.clone(), !o.checked))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Record;

    fn rows() -> RowStore {
        let mut rows = RowStore::new();
        rows.merge(vec![
            Record::new(1).with("State", "NY"),
            Record::new(2).with("State", "CA"),
            Record::new(3).with("State", "Texas"),
            Record::new(4).with("State", "CA"),
            Record::new(5).with("Country", "US"),
        ]);
        rows
    }

    fn labels(options: &FilterOptions) -> Vec<&str> {
        options.options.iter().map(|o| o.label.as_str()).collect()
    }

    #[test]
    fn test_build_sorted_and_checked() {
        let filters = FilterState::new();
        let me = filters.register_source();
        filters.update_filter("State", [("NY".to_string(), false)].into_iter().collect(), me);

        let asc = FilterOptions::build("State", &rows(), &filters, SortOrder::Ascending);
        assert_eq!(labels(&asc), vec!["CA", "NY", "Texas"]);
        assert_eq!(asc.checked_count(), 2);
        assert!(!asc.options[1].checked);

        let desc = FilterOptions::build("State", &rows(), &filters, SortOrder::Descending);
        assert_eq!(labels(&desc), vec!["Texas", "NY", "CA"]);
    }

    #[test]
    fn test_search_ignores_case() {
        let options = FilterOptions::build("State", &rows(), &FilterState::new(), SortOrder::Ascending);
        let hits: Vec<&str> = options.search("tEx").iter().map(|o| o.label.as_str()).collect();
        assert_eq!(hits, vec!["Texas"]);
        assert_eq!(options.search("").len(), 3);
        assert!(options.search("zz").is_empty());
    }

    #[test]
    fn test_diffs() {
        let filters = FilterState::new();
        let me = filters.register_source();
        filters.update_filter("State", [("CA".to_string(), false)].into_iter().collect(), me);
        let options = FilterOptions::build("State", &rows(), &filters, SortOrder::Ascending);

        let inverted = options.invert_diff();
        assert_eq!(inverted.get("CA"), Some(&true));
        assert_eq!(inverted.get("NY"), Some(&false));

        assert!(options.check_all_diff().values().all(|v| *v));
        assert_eq!(options.toggle_diff("CA").get("CA"), Some(&true));
        assert!(options.toggle_diff("Nowhere").is_empty());
    }
}

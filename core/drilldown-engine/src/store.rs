//! FILENAME: core/drilldown-engine/src/store.rs
//! Row Store - every record fetched during the session.
//!
//! Records are keyed by row identity. Re-fetching a row overlays the fields
//! present in the new payload and keeps everything else, so a row's record
//! only ever grows. Nothing is evicted.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{FieldValue, Path, Record, RowId};

/// Outcome of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Rows seen for the first time.
    pub inserted: usize,
    /// Existing rows that gained or changed at least one field.
    pub updated: usize,
}

#[derive(Debug, Default)]
pub struct RowStore {
    /// Records in first-seen order.
    records: Vec<Record>,

    /// Row identity -> index into `records`.
    index: FxHashMap<RowId, usize>,
}

impl RowStore {
    pub fn new() -> Self {
        RowStore::default()
    }

    /// Field-level union of `new_records` into the store.
    pub fn merge<I>(&mut self, new_records: I) -> MergeStats
    where
        I: IntoIterator<Item = Record>,
    {
        let mut stats = MergeStats::default();

        for incoming in new_records {
            match self.index.get(&incoming.row_id) {
                Some(&slot) => {
                    let existing = &mut self.records[slot];
                    let mut changed = false;
                    for (key, value) in incoming.fields {
                        if existing.fields.get(&key) != Some(&value) {
                            existing.fields.insert(key, value);
                            changed = true;
                        }
                    }
                    if changed {
                        stats.updated += 1;
                    }
                }
                None => {
                    self.index.insert(incoming.row_id, self.records.len());
                    self.records.push(incoming);
                    stats.inserted += 1;
                }
            }
        }

        stats
    }

    pub fn get(&self, row_id: RowId) -> Option<&Record> {
        self.index.get(&row_id).map(|&slot| &self.records[slot])
    }

    pub fn contains(&self, row_id: RowId) -> bool {
        self.index.contains_key(&row_id)
    }

    /// Every record held. Order carries no meaning beyond first-seen.
    pub fn all_records(&self) -> &[Record] {
        &self.records
    }

    /// Records carrying every assignment of `path`.
    pub fn matching<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |record| path.matches(record))
    }

    /// Distinct values of `key` across all records, in first-seen order.
    pub fn distinct_values(&self, key: &str) -> Vec<FieldValue> {
        let mut seen = FxHashSet::default();
        self.records
            .iter()
            .filter_map(|record| record.get(key))
            .filter(|value| seen.insert(*value))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! FILENAME: core/drilldown-engine/src/source.rs
//! Data Source - where headers and grouped rows come from.
//!
//! `DataSource` is the transport-independent contract. `FlatTable` is the
//! in-memory table that answers group queries directly; the HTTP server
//! serves one, and tests and embedders can use it without a network.

use std::future::Future;

use rustc_hash::FxHashSet;

use crate::definition::{FieldValue, GroupQuery, Record, RowId};
use crate::error::TransportError;

pub trait DataSource {
    /// The grouping keys, in hierarchy order.
    fn fetch_headers(&self) -> impl Future<Output = Result<Vec<String>, TransportError>>;

    /// Records matching `query.path`, each carrying at least the target key
    /// and a row id. The empty path asks for the top-level breakdown.
    fn fetch_rows(&self, query: &GroupQuery) -> impl Future<Output = Result<Vec<Record>, TransportError>>;
}

// ============================================================================
// FLAT TABLE
// ============================================================================

/// Rows of scalar cells under named columns.
#[derive(Debug, Clone, Default)]
pub struct FlatTable {
    headers: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl FlatTable {
    pub fn new(headers: Vec<String>) -> Self {
        FlatTable {
            headers,
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing trailing cells stay absent; extra cells are
    /// dropped.
    pub fn push_row(&mut self, mut row: Vec<FieldValue>) {
        row.truncate(self.headers.len());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Answers one group query given as labels.
    ///
    /// A row matches when every path entry naming a column equals that cell's
    /// label (entries naming no column are ignored). For every distinct label
    /// of the target column among matching rows, the first matching row is
    /// returned with `rowID` = its index, its path fields and its target
    /// field. The target column is found ignoring case.
    pub fn query(&self, target_key: &str, path: &[(String, String)]) -> Result<Vec<Record>, TransportError> {
        let target_lower = target_key.to_lowercase();
        let target_col = self
            .headers
            .iter()
            .position(|h| h.to_lowercase() == target_lower)
            .ok_or_else(|| TransportError::UnknownGroupKey(target_key.to_string()))?;

        let conditions: Vec<(usize, &str)> = path
            .iter()
            .filter_map(|(key, value)| self.column(key).map(|col| (col, value.as_str())))
            .collect();

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut records = Vec::new();

        for (index, row) in self.rows.iter().enumerate() {
            let matches = conditions
                .iter()
                .all(|&(col, value)| row.get(col).map_or(false, |cell| cell.label() == value));
            if !matches {
                continue;
            }
            let Some(target) = row.get(target_col) else {
                continue;
            };
            if !seen.insert(target.label()) {
                continue;
            }

            let mut record = Record::new(index as RowId);
            for &(col, _) in &conditions {
                if let Some(cell) = row.get(col) {
                    record.fields.insert(self.headers[col].clone(), cell.clone());
                }
            }
            record
                .fields
                .insert(self.headers[target_col].clone(), target.clone());
            records.push(record);
        }

        Ok(records)
    }

    pub fn query_group(&self, query: &GroupQuery) -> Result<Vec<Record>, TransportError> {
        self.query(&query.target_key, &query.path.to_label_pairs())
    }
}

impl DataSource for FlatTable {
    async fn fetch_headers(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.headers.clone())
    }

    async fn fetch_rows(&self, query: &GroupQuery) -> Result<Vec<Record>, TransportError> {
        self.query_group(query)
    }
}

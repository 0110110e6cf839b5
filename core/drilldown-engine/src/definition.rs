//! FILENAME: core/drilldown-engine/src/definition.rs
//! Drill-down Definitions - the vocabulary shared by every layer.
//!
//! This module contains the types that DESCRIBE what is being browsed:
//! - Scalar field values and flat records as a data source delivers them
//! - The ordered grouping keys that turn flat records into levels
//! - Paths and group queries that address one branch of the hierarchy

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ExplorerError;

/// Unique identity of a record within a session.
pub type RowId = u64;

// ============================================================================
// FIELD VALUES
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as map keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            // All NaN values hash to the same thing
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 compare equal, so they must hash equal
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// A single scalar cell of a record.
/// Serialized untagged, so JSON `"US"`, `3` and `true` map directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(OrderedFloat),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Display text. Sorting and filter maps work on this label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(b) => write!(f, "{}", b),
            // f64 Display prints integral values without a fraction
            FieldValue::Number(n) => write!(f, "{}", n.0),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(OrderedFloat(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(OrderedFloat(value as f64))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One flat record: a row identity plus whichever fields the source sent.
/// Wire shape: `{"rowID": 3, "Country": "US", "State": "CA"}`.
/// Fields that are not scalars (`null`, arrays, objects) are dropped on
/// decode, so the record only lacks that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRecord")]
pub struct Record {
    #[serde(rename = "rowID")]
    pub row_id: RowId,

    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(row_id: RowId) -> Self {
        Record {
            row_id,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

/// A record as it arrives, before unusable fields are dropped.
#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "rowID")]
    row_id: RowId,

    #[serde(flatten)]
    fields: BTreeMap<String, WireField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireField {
    Scalar(FieldValue),
    Unusable(serde::de::IgnoredAny),
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        let fields = wire
            .fields
            .into_iter()
            .filter_map(|(key, field)| match field {
                WireField::Scalar(value) => Some((key, value)),
                WireField::Unusable(_) => None,
            })
            .collect();
        Record {
            row_id: wire.row_id,
            fields,
        }
    }
}

// ============================================================================
// SORT ORDER
// ============================================================================

/// Sort direction of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

// ============================================================================
// GROUP KEY SEQUENCE
// ============================================================================

/// Ordered, distinct grouping keys. Position `i` is the key of level `i`;
/// the length is the depth of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupKeySequence {
    keys: Vec<String>,
}

impl GroupKeySequence {
    pub fn new(keys: Vec<String>) -> Result<Self, ExplorerError> {
        if keys.is_empty() {
            return Err(ExplorerError::EmptyKeySequence);
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(ExplorerError::DuplicateKey(key.clone()));
            }
        }
        Ok(GroupKeySequence { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn key_at(&self, level: usize) -> Option<&str> {
        self.keys.get(level).map(String::as_str)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// The key one level below `key`, or None when `key` is last (or unknown).
    pub fn next_key(&self, key: &str) -> Option<&str> {
        self.position(key).and_then(|i| self.key_at(i + 1))
    }

    pub fn is_last(&self, key: &str) -> bool {
        self.keys.last().map_or(false, |k| k == key)
    }

    /// A new sequence holding the same keys in a new order.
    pub fn reordered(&self, new_keys: Vec<String>) -> Result<Self, ExplorerError> {
        let mut expected = self.keys.clone();
        let mut got = new_keys.clone();
        expected.sort();
        got.sort();
        if expected != got {
            return Err(ExplorerError::InvalidReorder {
                expected: self.keys.clone(),
                got: new_keys,
            });
        }
        GroupKeySequence::new(new_keys)
    }
}

// ============================================================================
// PATHS & QUERIES
// ============================================================================

/// Ancestor assignments from the root down to (not including) a node,
/// always in key-sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    entries: SmallVec<[(String, FieldValue); 4]>,
}

impl Path {
    pub fn new() -> Self {
        Path::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: FieldValue) {
        self.entries.push((key.into(), value));
    }

    /// A copy of this path with one more assignment appended.
    pub fn extended(&self, key: &str, value: &FieldValue) -> Path {
        let mut path = self.clone();
        path.push(key, value.clone());
        path
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when the record carries every assignment of this path.
    pub fn matches(&self, record: &Record) -> bool {
        self.entries
            .iter()
            .all(|(key, value)| record.get(key) == Some(value))
    }

    /// Assignments as (key, label) pairs, the shape used on the wire.
    pub fn to_label_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.label()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Path {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut path = Path::new();
        for (k, v) in iter {
            path.push(k, v.into());
        }
        path
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("<root>");
        }
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

/// "All distinct values of `target_key` among records matching `path`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupQuery {
    pub target_key: String,
    pub path: Path,
}

impl GroupQuery {
    pub fn new(target_key: impl Into<String>, path: Path) -> Self {
        GroupQuery {
            target_key: target_key.into(),
            path,
        }
    }

    /// The top-level breakdown: first key, empty path.
    pub fn root(keys: &GroupKeySequence) -> Option<Self> {
        keys.first().map(|k| GroupQuery::new(k, Path::new()))
    }
}

impl fmt::Display for GroupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.target_key, self.path)
    }
}

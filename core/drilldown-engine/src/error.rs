//! FILENAME: core/drilldown-engine/src/error.rs

use thiserror::Error;

use crate::definition::RowId;
use crate::tree::NodeId;

/// A fetch from the data source failed. Caught at the controller boundary:
/// the affected expansion resolves to no children and may be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("unknown group key: {0}")]
    UnknownGroupKey(String),
}

/// A record lacks a field the hierarchy expected. Never fatal; the record
/// simply contributes nothing to that level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("row {row_id} has no value for '{key}'")]
    MissingField { row_id: RowId, key: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("unknown tree node {0}")]
    UnknownNode(NodeId),

    #[error("unknown group key: {0}")]
    UnknownKey(String),

    #[error("group key sequence is empty")]
    EmptyKeySequence,

    #[error("group key '{0}' appears more than once")]
    DuplicateKey(String),

    #[error("reorder must be a permutation of {expected:?}, got {got:?}")]
    InvalidReorder { expected: Vec<String>, got: Vec<String> },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

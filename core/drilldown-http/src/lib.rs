//! FILENAME: core/drilldown-http/src/lib.rs
//! HTTP transport for the drill-down engine.
//!
//! Wire shape:
//! - `GET /headers` returns a JSON array of grouping key names
//! - `GET /rows?queryGroup=<key>&<k1>=<v1>...` returns a JSON array of
//!   records, each with a `rowID` member plus one member per known field
//!
//! `client` speaks it as a `DataSource`; `server` serves a `FlatTable`
//! loaded from a comma-separated data file.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use cli::Args;
pub use client::HttpDataSource;
pub use config::{ClientConfig, ServerConfig};
pub use error::{ConfigError, ServerError};
pub use server::{load_table, router, run};

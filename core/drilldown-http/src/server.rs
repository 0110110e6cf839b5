//! FILENAME: core/drilldown-http/src/server.rs
//! Serves a `FlatTable` over the drill-down wire shape.
//!
//! The table is loaded once at startup from a comma-separated file and
//! shared read-only between requests.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use drilldown_engine::logging::{self, log_debug, log_info, log_warn};
use drilldown_engine::{FieldValue, FlatTable, Record};
use tokio::net::TcpListener;

use crate::client::QUERY_GROUP_PARAM;
use crate::config::ServerConfig;
use crate::error::ServerError;

// ============================================================================
// DATA FILE
// ============================================================================

/// Reads the data file named by the config. Every cell is kept as text.
/// Column names come from the first line when `has_header_row` is set,
/// otherwise from `headers`.
pub fn load_table(config: &ServerConfig) -> Result<FlatTable, ServerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(config.has_header_row)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&config.data_file)?;

    let headers: Vec<String> = if config.has_header_row {
        reader.headers()?.iter().map(str::to_string).collect()
    } else {
        config.headers.clone()
    };

    let mut table = FlatTable::new(headers);
    for result in reader.records() {
        let row = result?;
        table.push_row(row.iter().map(FieldValue::text).collect());
    }

    log_info!(
        "SERVER",
        "loaded {} rows x {} columns from {}",
        table.row_count(),
        table.headers().len(),
        config.data_file.display()
    );
    Ok(table)
}

// ============================================================================
// ROUTES
// ============================================================================

pub fn router(table: Arc<FlatTable>) -> Router {
    Router::new()
        .route("/headers", get(get_headers))
        .route("/rows", get(get_rows))
        .with_state(table)
}

async fn get_headers(State(table): State<Arc<FlatTable>>) -> Json<Vec<String>> {
    log_debug!("HTTP", "GET /headers");
    Json(table.headers().to_vec())
}

async fn get_rows(
    State(table): State<Arc<FlatTable>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Record>>, (StatusCode, String)> {
    let mut target_key = None;
    let mut path = Vec::with_capacity(params.len());
    for (key, value) in params {
        // The last queryGroup wins
        if key == QUERY_GROUP_PARAM {
            target_key = Some(value);
        } else {
            path.push((key, value));
        }
    }

    let Some(target_key) = target_key else {
        log_warn!("HTTP", "GET /rows without {}", QUERY_GROUP_PARAM);
        return Err((StatusCode::BAD_REQUEST, format!("missing {}", QUERY_GROUP_PARAM)));
    };

    match table.query(&target_key, &path) {
        Ok(records) => {
            log_debug!("HTTP", "GET /rows {} {:?} -> {}", target_key, path, records.len());
            Ok(Json(records))
        }
        Err(e) => {
            log_warn!("HTTP", "GET /rows {}: {}", target_key, e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

// ============================================================================
// ENTRY
// ============================================================================

/// Sets up logging, loads the data file and serves until the listener fails.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    logging::set_min_level(config.level()?);
    match &config.log_file {
        Some(path) => {
            logging::init_log_file(path)?;
        }
        None => logging::set_console_echo(true),
    }
    log_info!("CONFIG", "{:?}", config);

    let table = Arc::new(load_table(&config)?);
    let listener = TcpListener::bind(&config.bind).await?;
    log_info!("SERVER", "listening on {}", listener.local_addr()?);

    axum::serve(listener, router(table)).await?;
    Ok(())
}

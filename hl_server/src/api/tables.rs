//! Read-only lobby endpoints.
//!
//! Everything that changes state goes through the WebSocket command stream;
//! these handlers only query the Tables worker and the game store.
//!
//! # Examples
//!
//! List all tables:
//! ```bash
//! curl http://localhost:8080/api/v1/tables
//! ```
//!
//! Aggregate statistics:
//! ```bash
//! curl http://localhost:8080/api/v1/stats
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use hanabi_live::{
    stats::StatsReport,
    table::{TableDescription, TableId},
};
use log::error;

use super::{AppState, ErrorBody, error_body};

/// List every table in the lobby.
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<Vec<TableDescription>>, (StatusCode, Json<ErrorBody>)> {
    match state.dispatcher.tables.get_tables().await {
        Ok(tables) => Ok(Json(tables)),
        Err(e) => Err(error_body(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}

/// Describe a single table.
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
) -> Result<Json<TableDescription>, (StatusCode, Json<ErrorBody>)> {
    match state.dispatcher.tables.get_table(table_id).await {
        Ok(Some(table)) => Ok(Json(table)),
        Ok(None) => Err(error_body(
            StatusCode::NOT_FOUND,
            format!("table {table_id} not found"),
        )),
        Err(e) => Err(error_body(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}

/// Per-variant and global statistics.
pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<StatsReport>, (StatusCode, Json<ErrorBody>)> {
    match state.dispatcher.stats().await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            error!("Failed to collect statistics: {e}");
            Err(error_body(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

//! HTTP/WebSocket API for the game server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: CORS middleware
//! - **Domain workers**: all state lives behind the [`Dispatcher`] handles
//!
//! # Modules
//!
//! - [`tables`]: read-only lobby and statistics queries
//! - [`websocket`]: the bidirectional command and notification stream
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                           - Health check
//! GET  /api/v1/tables                    - List tables
//! GET  /api/v1/tables/{table_id}         - Describe one table
//! GET  /api/v1/stats                     - Variant and global statistics
//! GET  /ws?user_id=<id>&username=<name>  - WebSocket command stream
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hanabi_live::{CoreConfig, Dispatcher, store::MemoryStore};
//! use hl_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::default();
//! let store = Arc::new(MemoryStore::new(config.variants.clone()));
//! let state = AppState {
//!     dispatcher: Dispatcher::start(config, store),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod tables;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use hanabi_live::Dispatcher;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloning is cheap: the dispatcher only holds queue handles.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// JSON error payload of the REST endpoints
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_body(status: StatusCode, error: String) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody { error }))
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/tables", get(tables::list_tables))
        .route("/tables/{table_id}", get(tables::get_table))
        .route("/stats", get(tables::stats));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Queries every domain worker. A worker that has shut down makes the server
/// unhealthy.
///
/// # Response
///
/// `200 OK` when every worker answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","tables":{"healthy":true,"active_count":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let dispatcher = &state.dispatcher;
    let tables = dispatcher.tables.get_tables().await;
    let users = dispatcher.sessions.get_users().await;
    let chat_healthy = dispatcher
        .chat
        .history(hanabi_live::chat::LOBBY_ROOM)
        .await
        .is_ok();

    let overall_healthy = tables.is_ok() && users.is_ok() && chat_healthy;
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "tables": {
            "healthy": tables.is_ok(),
            "active_count": tables.as_ref().map_or(0, Vec::len),
        },
        "sessions": {
            "healthy": users.is_ok(),
            "connected": users.as_ref().map_or(0, Vec::len),
        },
        "chat": chat_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

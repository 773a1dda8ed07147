//! Integration tests for the HTTP surface.
//!
//! Requests are driven straight through the router; the domain workers run on
//! the test runtime with an in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hanabi_live::{
    CoreConfig, Dispatcher,
    sessions::SessionData,
    store::MemoryStore,
    table::{TableDescription, TableOptions},
};
use hl_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

fn create_test_server() -> (axum::Router, Dispatcher) {
    let config = CoreConfig::default();
    let store = Arc::new(MemoryStore::new(config.variants.clone()));
    let dispatcher = Dispatcher::start(config, store);
    let app = create_router(AppState {
        dispatcher: dispatcher.clone(),
    });
    (app, dispatcher)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_check_reports_workers() {
    let (app, dispatcher) = create_test_server();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tables"]["active_count"], 0);

    dispatcher.shutdown().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "unhealthy");
}

#[tokio::test]
async fn test_list_and_get_tables() {
    let (app, dispatcher) = create_test_server();

    let (status, body) = get(&app, "/api/v1/tables").await;
    assert_eq!(status, StatusCode::OK);
    let tables: Vec<TableDescription> = serde_json::from_slice(&body).unwrap();
    assert!(tables.is_empty());

    let options = TableOptions {
        name: "Friday".to_string(),
        ..TableOptions::default()
    };
    let table_id = dispatcher
        .tables
        .new_table(SessionData::new(1, "alice", "127.0.0.1"), options)
        .await
        .unwrap()
        .unwrap();

    let (status, body) = get(&app, "/api/v1/tables").await;
    assert_eq!(status, StatusCode::OK);
    let tables: Vec<TableDescription> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].players, vec!["alice".to_string()]);

    let (status, body) = get(&app, &format!("/api/v1/tables/{table_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let table: TableDescription = serde_json::from_slice(&body).unwrap();
    assert_eq!(table.name, "Friday");
    assert!(!table.started);

    let (status, body) = get(&app, "/api/v1/tables/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "table 999 not found");

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_stats_are_zero_filled() {
    let (app, dispatcher) = create_test_server();

    let (status, body) = get(&app, "/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["numGames"], 0);

    let variants = json["variants"].as_array().unwrap();
    assert_eq!(variants.len(), dispatcher.config.variants.len());
    assert!(variants.iter().all(|v| v["numGames"] == 0));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_websocket_requires_upgrade() {
    let (app, dispatcher) = create_test_server();

    let (status, _) = get(&app, "/ws?user_id=1&username=alice").await;
    assert!(status.is_client_error());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, dispatcher) = create_test_server();

    let (status, _) = get(&app, "/api/v1/wallet").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    dispatcher.shutdown().await;
}

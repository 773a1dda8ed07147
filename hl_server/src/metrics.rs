//! Prometheus metrics for monitoring server health.
//!
//! Metrics are exposed in Prometheus text format on their own listener when
//! `METRICS_BIND` is set.
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Active connections, frames in and out
//! - **Command Metrics**: Counts and dispatch duration per command
//! - **Game Metrics**: Tables, running games and connected users

use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, time::Duration};

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Track a WebSocket connection opening (`+1`) or closing (`-1`).
pub fn websocket_connection(opened: bool) {
    let gauge = metrics::gauge!("websocket_connections_active");
    if opened {
        gauge.increment(1.0);
        metrics::counter!("websocket_connections_total").increment(1);
    } else {
        gauge.decrement(1.0);
    }
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Command Metrics
// ============================================================================

/// Record one dispatched command and how long it took.
pub fn command_handled(command: &str, elapsed: Duration) {
    metrics::counter!("commands_total", "command" => command.to_string()).increment(1);
    metrics::histogram!("command_duration_ms", "command" => command.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Set the table gauges from a fresh table list.
pub fn tables(total: usize, running: usize) {
    metrics::gauge!("active_tables").set(total as f64);
    metrics::gauge!("running_games").set(running as f64);
}

/// Set current connected users count.
pub fn connected_users(count: usize) {
    metrics::gauge!("connected_users").set(count as f64);
}

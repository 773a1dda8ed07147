//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here picks those records up as well as the server's own `tracing` events.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Commands slower than this are logged at warn level
const SLOW_COMMAND: Duration = Duration::from_millis(250);

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info`.
///
/// # Example
///
/// ```no_run
/// use hl_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    // `init` also installs the `log` bridge for the library's records
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log one handled client command
///
/// # Arguments
///
/// * `user_id` - The sender
/// * `command` - Command name, or `"?"` when it could not be read
/// * `elapsed` - Time spent dispatching it
pub fn log_command(user_id: i64, command: &str, elapsed: Duration) {
    let duration_ms = elapsed.as_millis() as u64;
    if elapsed > SLOW_COMMAND {
        tracing::warn!(
            user_id = user_id,
            command = command,
            duration_ms = duration_ms,
            "Slow command"
        );
    } else {
        tracing::debug!(
            user_id = user_id,
            command = command,
            duration_ms = duration_ms,
            "Command handled"
        );
    }
}

/// Log a WebSocket connection opening or closing
pub fn log_connection(user_id: i64, username: &str, ip: &str, opened: bool) {
    if opened {
        tracing::info!(user_id = user_id, username = username, ip = ip, "WebSocket connected");
    } else {
        tracing::info!(
            user_id = user_id,
            username = username,
            ip = ip,
            "WebSocket disconnected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_command() {
        // Just ensure it doesn't panic
        log_command(1, "chat", Duration::from_millis(3));
        log_command(1, "tableStart", Duration::from_secs(1));
    }

    #[test]
    fn test_log_connection() {
        log_connection(7, "alice", "127.0.0.1", true);
        log_connection(7, "alice", "127.0.0.1", false);
    }
}

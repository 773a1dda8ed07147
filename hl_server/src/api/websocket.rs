//! WebSocket handler for the client command stream.
//!
//! Every client holds one WebSocket. Text frames it sends are raw commands
//! handed to the [`CommandDispatcher`](hanabi_live::commands::CommandDispatcher);
//! every [`Notification`] pushed to its session is written back as a JSON text
//! frame.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?user_id=<id>&username=<name>`
//! 2. The server registers a session, replacing any older one for that user
//! 3. A send task forwards notifications while the receive loop dispatches
//!    commands
//! 4. On disconnect the session is deleted and, unless a newer connection took
//!    over, the user is marked absent at their tables
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws?user_id=1&username=alice');
//!
//! ws.onmessage = (event) => {
//!   const { type, data } = JSON.parse(event.data);
//!   if (type === 'game') updateBoard(data);
//! };
//!
//! ws.send(JSON.stringify({ command: 'tableCreate', options: { name: 'Friday' } }));
//! ```

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use hanabi_live::{
    Dispatcher, UserId,
    sessions::{Connection, Notification, SessionData},
};
use log::{error, warn};
use serde::Deserialize;
use std::{net::SocketAddr, time::Instant};
use tokio::sync::mpsc::UnboundedReceiver;

use super::AppState;
use crate::{logging, metrics};

/// Longest accepted username
const MAX_USERNAME_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: UserId,
    username: String,
}

/// Only the command name, read for logging
#[derive(Deserialize)]
struct CommandName {
    command: Option<String>,
}

/// Upgrade HTTP connection to WebSocket.
///
/// # Query Parameters
///
/// - `user_id`: Identity of the connecting user
/// - `username`: Display name, 1 to 32 characters after trimming
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// On a bad username, returns `400 Bad Request`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    extensions: Extensions,
    State(state): State<AppState>,
) -> Response {
    let username = query.username.trim().to_string();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return (StatusCode::BAD_REQUEST, "Invalid username").into_response();
    }

    let ip = client_ip(&headers, &extensions);
    let data = SessionData::new(query.user_id, username, ip);
    ws.on_upgrade(move |socket| handle_socket(socket, data, state.dispatcher))
}

/// The forwarded address if a proxy set one, else the peer address.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(ip) => ip.to_string(),
        None => extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string()),
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, data: SessionData, dispatcher: Dispatcher) {
    let user_id = data.user_id;
    let (connection, inbox) = Connection::new();
    if let Err(e) = dispatcher
        .sessions
        .new_session(data.clone(), connection.clone())
    {
        warn!("Refusing connection for user {user_id}: {e}");
        return;
    }

    logging::log_connection(user_id, &data.username, &data.ip, true);
    metrics::websocket_connection(true);

    let (sender, mut receiver) = socket.split();
    let mut send_task = tokio::spawn(forward_notifications(inbox, sender));

    let commands = dispatcher.commands();
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    metrics::websocket_messages_received();
                    if !dispatch(&dispatcher, &commands, &data, text.as_str()).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("WebSocket error for user {user_id}: {e}");
                    break;
                }
                Some(Ok(_)) => {}
            },
            // The socket stopped accepting writes
            _ = &mut send_task => break,
        }
    }

    send_task.abort();
    disconnect(&dispatcher, user_id, connection).await;

    logging::log_connection(user_id, &data.username, &data.ip, false);
    metrics::websocket_connection(false);
}

/// Write every notification for this session to the socket as JSON.
async fn forward_notifications(
    mut inbox: UnboundedReceiver<Notification>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(notification) = inbox.recv().await {
        let json = match serde_json::to_string(&notification) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize notification: {e}");
                continue;
            }
        };

        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
        metrics::websocket_messages_sent();
    }
}

/// Run one raw command. Returns `false` once the server is shutting down.
async fn dispatch(
    dispatcher: &Dispatcher,
    commands: &hanabi_live::commands::CommandDispatcher,
    data: &SessionData,
    text: &str,
) -> bool {
    let started = Instant::now();

    // Handlers see the registry's current copy, e.g. the mute flag
    let user = match dispatcher.sessions.get_session(data.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => data.clone(),
        Err(e) => {
            warn!("Dropping command from user {}: {e}", data.user_id);
            return false;
        }
    };

    let result = commands.dispatch(&user, text).await;

    let name = serde_json::from_str::<CommandName>(text)
        .ok()
        .and_then(|peek| peek.command)
        .unwrap_or_else(|| "?".to_string());
    let elapsed = started.elapsed();
    logging::log_command(data.user_id, &name, elapsed);
    metrics::command_handled(&name, elapsed);

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Dropping command from user {}: {e}", data.user_id);
            false
        }
    }
}

/// Remove the session and, if no newer connection replaced it, mark the user
/// absent at every table.
async fn disconnect(dispatcher: &Dispatcher, user_id: UserId, connection: Connection) {
    if dispatcher
        .sessions
        .delete_session(user_id, Some(connection))
        .is_err()
    {
        return;
    }

    match dispatcher.sessions.get_session(user_id).await {
        Ok(None) => {
            if let Err(e) = dispatcher.tables.disconnect_user(user_id) {
                warn!("Could not release the tables of user {user_id}: {e}");
            }
        }
        Ok(Some(_)) => {}
        Err(e) => warn!("Could not check the session of user {user_id}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, &Extensions::new()), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5000))));
        assert_eq!(client_ip(&HeaderMap::new(), &extensions), "192.0.2.4");
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "unknown");
    }
}

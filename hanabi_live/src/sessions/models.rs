//! Session models and the notifications pushed to connected users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use tokio::sync::mpsc;

use crate::{
    chat::ChatMessage,
    game::GameView,
    table::{CardNote, TableDescription, TableId},
};

/// Database ID of a user.
pub type UserId = i64;

/// What a user is currently doing.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    Lobby,
    Pregame,
    Playing,
    Spectating,
    Replay,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Pregame => "pregame",
            Self::Playing => "playing",
            Self::Spectating => "spectating",
            Self::Replay => "replay",
        };
        write!(f, "{repr}")
    }
}

/// A copy of a session handed to command handlers.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: UserId,
    pub username: String,
    pub ip: String,
    pub status: Status,
    pub table_id: Option<TableId>,
    pub muted: bool,
}

impl SessionData {
    pub fn new(user_id: UserId, username: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            ip: ip.into(),
            status: Status::Lobby,
            table_id: None,
            muted: false,
        }
    }
}

/// Lobby-visible description of a user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub user_id: UserId,
    pub username: String,
    pub status: Status,
    pub table_id: Option<TableId>,
}

/// Everything the server pushes to a client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Notification {
    Welcome {
        user_id: UserId,
        username: String,
    },
    Chat(ChatMessage),
    /// History of a room the user just entered
    ChatList {
        room: String,
        messages: Vec<ChatMessage>,
    },
    ChatTyping {
        table_id: TableId,
        username: String,
        typing: bool,
    },
    Error {
        message: String,
    },
    Warning {
        message: String,
    },
    Table(TableDescription),
    /// Reply to a table list query
    TableList {
        tables: Vec<TableDescription>,
    },
    TableGone {
        table_id: TableId,
    },
    User(UserDescription),
    UserLeft {
        user_id: UserId,
    },
    Friends {
        friends: Vec<String>,
    },
    Game {
        table_id: TableId,
        view: Box<GameView>,
    },
    Joined {
        table_id: TableId,
    },
    /// Every player's note on one card
    Note {
        table_id: TableId,
        order: usize,
        notes: Vec<CardNote>,
    },
    Spectators {
        table_id: TableId,
        spectators: Vec<String>,
    },
    SoundLobby {
        file: String,
    },
}

/// Outbound half of a client connection.
#[derive(Clone, Debug)]
pub struct Connection {
    sender: mpsc::UnboundedSender<Notification>,
}

impl Connection {
    /// A connection and the receiver its transport drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Push a notification. Returns false when the transport has gone away;
    /// notifications are live UI state, so nothing is retried.
    pub fn send(&self, notification: Notification) -> bool {
        self.sender.send(notification).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether both handles feed the same transport
    pub fn same_as(&self, other: &Connection) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

/// A live connection owned by the Sessions worker.
#[derive(Debug)]
pub struct Session {
    pub data: SessionData,
    pub connection: Connection,
    pub friends: BTreeSet<String>,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn new(data: SessionData, connection: Connection) -> Self {
        Self {
            data,
            connection,
            friends: BTreeSet::new(),
            connected_at: Utc::now(),
        }
    }

    pub fn description(&self) -> UserDescription {
        UserDescription {
            user_id: self.data.user_id,
            username: self.data.username.clone(),
            status: self.data.status,
            table_id: self.data.table_id,
        }
    }

    pub fn send(&self, notification: Notification) -> bool {
        self.connection.send(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_in_lobby() {
        let data = SessionData::new(3, "carol", "");
        assert_eq!(data.status, Status::Lobby);
        assert_eq!(data.table_id, None);
        assert!(!data.muted);
    }

    #[test]
    fn test_connection_reports_closed_transport() {
        let (connection, receiver) = Connection::new();
        assert!(connection.send(Notification::Joined { table_id: 1 }));
        drop(receiver);
        assert!(connection.is_closed());
        assert!(!connection.send(Notification::Joined { table_id: 1 }));
    }

    #[test]
    fn test_notification_wire_format() {
        let json = serde_json::to_value(Notification::Error {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["message"], "nope");
    }
}

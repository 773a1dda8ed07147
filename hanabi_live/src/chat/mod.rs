//! Chat domain: per-room history, owned by its own worker.
//!
//! Lobby messages are broadcast to every connection through the Sessions
//! registry. Table rooms are only written through the Tables worker, which
//! checks membership and names the audience; private messages never come
//! through here.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::oneshot;

use crate::{
    actor::{Domain, Manager, ManagerResult, Router},
    config::CoreConfig,
    sessions::{SessionsManager, SessionsRequest, UserId},
    table::TableId,
};

pub const LOBBY_ROOM: &str = "lobby";

const TABLE_ROOM_PREFIX: &str = "table";

/// Chat room of a table.
pub fn table_room(table_id: TableId) -> String {
    format!("{TABLE_ROOM_PREFIX}{table_id}")
}

/// The table a room belongs to, if it is a table room.
pub fn parse_table_room(room: &str) -> Option<TableId> {
    room.strip_prefix(TABLE_ROOM_PREFIX)?.parse().ok()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub msg: String,
    /// Username of the author; empty for server messages
    pub who: String,
    pub room: String,
    /// Set on private messages
    pub recipient: Option<String>,
    pub server: bool,
    pub datetime: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ChatRequest {
    Chat {
        user_id: UserId,
        username: String,
        msg: String,
        room: String,
        server: bool,
        /// Receivers of a table-room message; lobby messages go to everyone
        audience: Vec<UserId>,
    },
    /// Push a room's history to one user
    SendHistory {
        room: String,
        user_id: UserId,
    },
    /// Forget a room, e.g. once its table is gone
    DeleteRoom {
        room: String,
    },
    GetHistory {
        room: String,
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
    Print,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChatRequestKind {
    Chat,
    SendHistory,
    DeleteRoom,
    GetHistory,
    Print,
}

pub type ChatManager = Manager<Chat>;

pub struct Chat {
    history: HashMap<String, VecDeque<ChatMessage>>,
    sessions: SessionsManager,
    config: Arc<CoreConfig>,
}

impl Domain for Chat {
    type Request = ChatRequest;
    type Kind = ChatRequestKind;

    fn kind(request: &ChatRequest) -> ChatRequestKind {
        match request {
            ChatRequest::Chat { .. } => ChatRequestKind::Chat,
            ChatRequest::SendHistory { .. } => ChatRequestKind::SendHistory,
            ChatRequest::DeleteRoom { .. } => ChatRequestKind::DeleteRoom,
            ChatRequest::GetHistory { .. } => ChatRequestKind::GetHistory,
            ChatRequest::Print => ChatRequestKind::Print,
        }
    }
}

impl Chat {
    pub fn spawn(sessions: SessionsManager, config: Arc<CoreConfig>) -> ChatManager {
        let state = Self {
            history: HashMap::new(),
            sessions,
            config,
        };
        let router = Router::new()
            .route(ChatRequestKind::Chat, Self::chat)
            .route(ChatRequestKind::SendHistory, Self::send_history)
            .route(ChatRequestKind::DeleteRoom, Self::delete_room)
            .route(ChatRequestKind::GetHistory, Self::get_history)
            .route(ChatRequestKind::Print, Self::print);
        Manager::spawn("chat", state, router)
    }

    fn chat(&mut self, request: ChatRequest) {
        let ChatRequest::Chat {
            user_id,
            username,
            msg,
            room,
            server,
            audience,
        } = request
        else {
            return;
        };

        let msg = msg.trim();
        let rejection = if msg.is_empty() {
            Some("You cannot send an empty message.".to_string())
        } else if msg.chars().count() > self.config.max_chat_length {
            Some(format!(
                "Messages must be {} characters or less.",
                self.config.max_chat_length
            ))
        } else {
            None
        };
        if let Some(message) = rejection {
            let _ = self.sessions.notify_error(user_id, message);
            return;
        }

        let message = ChatMessage {
            msg: msg.to_string(),
            who: if server { String::new() } else { username },
            room: room.clone(),
            recipient: None,
            server,
            datetime: Utc::now(),
        };

        let history = self.history.entry(room.clone()).or_default();
        history.push_back(message.clone());
        while history.len() > self.config.chat_history_length {
            history.pop_front();
        }

        if room == LOBBY_ROOM {
            let _ = self.sessions.submit(SessionsRequest::NotifyAllChat(message));
            return;
        }
        for user_id in audience {
            let _ = self.sessions.submit(SessionsRequest::NotifyChat {
                user_id,
                message: message.clone(),
            });
        }
    }

    fn room_history(&self, room: &str) -> Vec<ChatMessage> {
        self.history
            .get(room)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn send_history(&mut self, request: ChatRequest) {
        if let ChatRequest::SendHistory { room, user_id } = request {
            let messages = self.room_history(&room);
            let _ = self.sessions.submit(SessionsRequest::NotifyChatList {
                user_id,
                room,
                messages,
            });
        }
    }

    fn delete_room(&mut self, request: ChatRequest) {
        if let ChatRequest::DeleteRoom { room } = request
            && self.history.remove(&room).is_some()
        {
            debug!("Deleted chat room \"{room}\"");
        }
    }

    fn get_history(&mut self, request: ChatRequest) {
        if let ChatRequest::GetHistory { room, reply } = request {
            let _ = reply.send(self.room_history(&room));
        }
    }

    fn print(&mut self, _request: ChatRequest) {
        for (room, history) in &self.history {
            info!("Chat room \"{room}\": {} message(s)", history.len());
        }
    }
}

impl Manager<Chat> {
    pub async fn history(&self, room: impl Into<String>) -> ManagerResult<Vec<ChatMessage>> {
        let room = room.into();
        self.request(|reply| ChatRequest::GetHistory { room, reply })
            .await
    }
}

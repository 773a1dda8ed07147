//! Requests understood by the Sessions worker.

use tokio::sync::oneshot;

use super::models::{Connection, SessionData, Status, UserDescription, UserId};
use crate::{
    chat::ChatMessage,
    game::GameView,
    table::{CardNote, TableDescription, TableId},
};

#[derive(Debug)]
pub enum SessionsRequest {
    /// Register a connection, replacing any older one for the same user
    New {
        data: SessionData,
        connection: Connection,
    },
    /// Remove a session. With a connection, only if it is still the
    /// user's current one.
    Delete {
        user_id: UserId,
        connection: Option<Connection>,
    },
    ChatPm {
        user_id: UserId,
        username: String,
        msg: String,
        recipient: String,
        /// Server messages bypass the mute check
        server: bool,
    },
    NotifyAllChat(ChatMessage),
    /// A table-room chat message for one member of the room
    NotifyChat {
        user_id: UserId,
        message: ChatMessage,
    },
    /// A room's history, sent when the user enters the room
    NotifyChatList {
        user_id: UserId,
        room: String,
        messages: Vec<ChatMessage>,
    },
    NotifyAllError {
        message: String,
    },
    NotifyAllTable(TableDescription),
    NotifyAllTableGone {
        table_id: TableId,
    },
    NotifyAllUser {
        user_id: UserId,
    },
    NotifyChatServer {
        user_id: UserId,
        msg: String,
        room: String,
    },
    NotifyChatTyping {
        user_id: UserId,
        table_id: TableId,
        username: String,
        typing: bool,
    },
    NotifyError {
        user_id: UserId,
        message: String,
    },
    NotifyWarning {
        user_id: UserId,
        message: String,
    },
    NotifyFriends {
        user_id: UserId,
    },
    NotifyTables {
        user_id: UserId,
        tables: Vec<TableDescription>,
    },
    NotifyGame {
        user_id: UserId,
        table_id: TableId,
        view: Box<GameView>,
    },
    NotifyJoined {
        user_id: UserId,
        table_id: TableId,
    },
    NotifyNote {
        user_id: UserId,
        table_id: TableId,
        order: usize,
        notes: Vec<CardNote>,
    },
    NotifySpectators {
        user_id: UserId,
        table_id: TableId,
        spectators: Vec<String>,
    },
    NotifySoundLobby {
        user_id: UserId,
        file: String,
    },
    SetStatus {
        user_id: UserId,
        status: Status,
        table_id: Option<TableId>,
    },
    SetFriend {
        user_id: UserId,
        friend: String,
        add: bool,
    },
    SetMuted {
        user_id: UserId,
        muted: bool,
    },
    GetSession {
        user_id: UserId,
        reply: oneshot::Sender<Option<SessionData>>,
    },
    GetUsers {
        reply: oneshot::Sender<Vec<UserDescription>>,
    },
    Print,
}

/// Routing key of a [`SessionsRequest`]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SessionsRequestKind {
    New,
    Delete,
    ChatPm,
    NotifyAllChat,
    NotifyChat,
    NotifyChatList,
    NotifyAllError,
    NotifyAllTable,
    NotifyAllTableGone,
    NotifyAllUser,
    NotifyChatServer,
    NotifyChatTyping,
    NotifyError,
    NotifyWarning,
    NotifyFriends,
    NotifyTables,
    NotifyGame,
    NotifyJoined,
    NotifyNote,
    NotifySpectators,
    NotifySoundLobby,
    SetStatus,
    SetFriend,
    SetMuted,
    GetSession,
    GetUsers,
    Print,
}

impl SessionsRequest {
    pub fn kind(&self) -> SessionsRequestKind {
        use SessionsRequestKind as Kind;
        match self {
            Self::New { .. } => Kind::New,
            Self::Delete { .. } => Kind::Delete,
            Self::ChatPm { .. } => Kind::ChatPm,
            Self::NotifyAllChat(_) => Kind::NotifyAllChat,
            Self::NotifyChat { .. } => Kind::NotifyChat,
            Self::NotifyChatList { .. } => Kind::NotifyChatList,
            Self::NotifyAllError { .. } => Kind::NotifyAllError,
            Self::NotifyAllTable(_) => Kind::NotifyAllTable,
            Self::NotifyAllTableGone { .. } => Kind::NotifyAllTableGone,
            Self::NotifyAllUser { .. } => Kind::NotifyAllUser,
            Self::NotifyChatServer { .. } => Kind::NotifyChatServer,
            Self::NotifyChatTyping { .. } => Kind::NotifyChatTyping,
            Self::NotifyError { .. } => Kind::NotifyError,
            Self::NotifyWarning { .. } => Kind::NotifyWarning,
            Self::NotifyFriends { .. } => Kind::NotifyFriends,
            Self::NotifyTables { .. } => Kind::NotifyTables,
            Self::NotifyGame { .. } => Kind::NotifyGame,
            Self::NotifyJoined { .. } => Kind::NotifyJoined,
            Self::NotifyNote { .. } => Kind::NotifyNote,
            Self::NotifySpectators { .. } => Kind::NotifySpectators,
            Self::NotifySoundLobby { .. } => Kind::NotifySoundLobby,
            Self::SetStatus { .. } => Kind::SetStatus,
            Self::SetFriend { .. } => Kind::SetFriend,
            Self::SetMuted { .. } => Kind::SetMuted,
            Self::GetSession { .. } => Kind::GetSession,
            Self::GetUsers { .. } => Kind::GetUsers,
            Self::Print => Kind::Print,
        }
    }
}

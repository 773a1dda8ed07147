//! The Sessions domain: every live connection, owned by one worker.

use chrono::Utc;
use log::{debug, info};
use std::{collections::HashMap, sync::Arc};

use super::{
    messages::{SessionsRequest, SessionsRequestKind as Kind},
    models::{Connection, Notification, Session, SessionData, Status, UserDescription, UserId},
};
use crate::{
    actor::{Domain, Manager, ManagerResult, Router},
    chat::ChatMessage,
    config::CoreConfig,
    table::TableId,
};

pub type SessionsManager = Manager<Sessions>;

pub struct Sessions {
    sessions: HashMap<UserId, Session>,
    config: Arc<CoreConfig>,
}

impl Domain for Sessions {
    type Request = SessionsRequest;
    type Kind = Kind;

    fn kind(request: &SessionsRequest) -> Kind {
        request.kind()
    }
}

impl Sessions {
    /// Start the Sessions worker.
    pub fn spawn(config: Arc<CoreConfig>) -> SessionsManager {
        let state = Self {
            sessions: HashMap::new(),
            config,
        };
        Manager::spawn("sessions", state, Self::router())
    }

    fn router() -> Router<Self> {
        Router::new()
            .route(Kind::New, Self::new_session)
            .route(Kind::Delete, Self::delete)
            .route(Kind::ChatPm, Self::chat_pm)
            .route(Kind::NotifyAllChat, Self::notify_all_chat)
            .route(Kind::NotifyChat, Self::notify_chat)
            .route(Kind::NotifyChatList, Self::notify_chat_list)
            .route(Kind::NotifyAllError, Self::notify_all_error)
            .route(Kind::NotifyAllTable, Self::notify_all_table)
            .route(Kind::NotifyAllTableGone, Self::notify_all_table_gone)
            .route(Kind::NotifyAllUser, Self::notify_all_user)
            .route(Kind::NotifyChatServer, Self::notify_chat_server)
            .route(Kind::NotifyChatTyping, Self::notify_chat_typing)
            .route(Kind::NotifyError, Self::notify_error)
            .route(Kind::NotifyWarning, Self::notify_warning)
            .route(Kind::NotifyFriends, Self::notify_friends)
            .route(Kind::NotifyTables, Self::notify_tables)
            .route(Kind::NotifyGame, Self::notify_game)
            .route(Kind::NotifyJoined, Self::notify_joined)
            .route(Kind::NotifyNote, Self::notify_note)
            .route(Kind::NotifySpectators, Self::notify_spectators)
            .route(Kind::NotifySoundLobby, Self::notify_sound_lobby)
            .route(Kind::SetStatus, Self::set_status)
            .route(Kind::SetFriend, Self::set_friend)
            .route(Kind::SetMuted, Self::set_muted)
            .route(Kind::GetSession, Self::get_session)
            .route(Kind::GetUsers, Self::get_users)
            .route(Kind::Print, Self::print)
    }

    /// Push to one user if they are connected; dropped otherwise.
    fn notify(&self, user_id: UserId, notification: Notification) {
        match self.sessions.get(&user_id) {
            Some(session) => {
                session.send(notification);
            }
            None => debug!("Dropped a notification for offline user {user_id}"),
        }
    }

    fn broadcast(&self, notification: Notification) {
        for session in self.sessions.values() {
            session.send(notification.clone());
        }
    }

    fn new_session(&mut self, request: SessionsRequest) {
        let SessionsRequest::New { data, connection } = request else {
            return;
        };

        let user_id = data.user_id;
        if let Some(old) = self.sessions.remove(&user_id) {
            old.send(Notification::Warning {
                message: "You have logged on from somewhere else, so you have been disconnected here."
                    .to_string(),
            });
            info!("Replaced the existing session of user {user_id}");
        }

        let session = Session::new(data, connection);
        session.send(Notification::Welcome {
            user_id,
            username: session.data.username.clone(),
        });
        let description = session.description();
        self.sessions.insert(user_id, session);

        info!(
            "User \"{}\" connected; {} user(s) online",
            description.username,
            self.sessions.len()
        );
        self.broadcast(Notification::User(description));
    }

    fn delete(&mut self, request: SessionsRequest) {
        let SessionsRequest::Delete {
            user_id,
            connection,
        } = request
        else {
            return;
        };

        // A replaced connection must not take its successor down with it
        let owned = match (self.sessions.get(&user_id), &connection) {
            (Some(session), Some(connection)) => session.connection.same_as(connection),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !owned {
            return;
        }

        if let Some(session) = self.sessions.remove(&user_id) {
            info!(
                "User \"{}\" disconnected; {} user(s) online",
                session.data.username,
                self.sessions.len()
            );
            self.broadcast(Notification::UserLeft { user_id });
        }
    }

    fn chat_pm(&mut self, request: SessionsRequest) {
        let SessionsRequest::ChatPm {
            user_id,
            username,
            msg,
            recipient,
            server,
        } = request
        else {
            return;
        };

        let error = |message: &str| Notification::Error {
            message: message.to_string(),
        };

        if !server && self.sessions.get(&user_id).is_some_and(|s| s.data.muted) {
            self.notify(user_id, error("You are currently muted."));
            return;
        }

        let msg = msg.trim();
        if msg.is_empty() {
            self.notify(user_id, error("You cannot send an empty private message."));
            return;
        }
        if msg.chars().count() > self.config.max_chat_length {
            self.notify(
                user_id,
                error(&format!(
                    "Private messages must be {} characters or less.",
                    self.config.max_chat_length
                )),
            );
            return;
        }

        let Some(target) = self
            .sessions
            .values()
            .find(|s| s.data.username.eq_ignore_ascii_case(recipient.trim()))
        else {
            self.notify(
                user_id,
                error(&format!("User \"{}\" is not currently online.", recipient.trim())),
            );
            return;
        };
        if target.data.user_id == user_id {
            self.notify(user_id, error("You cannot send a private message to yourself."));
            return;
        }

        let message = ChatMessage {
            msg: msg.to_string(),
            who: username,
            room: String::new(),
            recipient: Some(target.data.username.clone()),
            server,
            datetime: Utc::now(),
        };
        target.send(Notification::Chat(message.clone()));
        self.notify(user_id, Notification::Chat(message));
    }

    fn notify_all_chat(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyAllChat(message) = request {
            self.broadcast(Notification::Chat(message));
        }
    }

    fn notify_chat(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyChat { user_id, message } = request {
            self.notify(user_id, Notification::Chat(message));
        }
    }

    fn notify_chat_list(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyChatList {
            user_id,
            room,
            messages,
        } = request
        {
            self.notify(user_id, Notification::ChatList { room, messages });
        }
    }

    fn notify_all_error(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyAllError { message } = request {
            self.broadcast(Notification::Error { message });
        }
    }

    fn notify_all_table(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyAllTable(description) = request {
            self.broadcast(Notification::Table(description));
        }
    }

    fn notify_tables(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyTables { user_id, tables } = request {
            self.notify(user_id, Notification::TableList { tables });
        }
    }

    fn notify_all_table_gone(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyAllTableGone { table_id } = request {
            self.broadcast(Notification::TableGone { table_id });
        }
    }

    fn notify_all_user(&mut self, request: SessionsRequest) {
        let SessionsRequest::NotifyAllUser { user_id } = request else {
            return;
        };
        if let Some(description) = self.sessions.get(&user_id).map(Session::description) {
            self.broadcast(Notification::User(description));
        }
    }

    fn notify_chat_server(&mut self, request: SessionsRequest) {
        let SessionsRequest::NotifyChatServer { user_id, msg, room } = request else {
            return;
        };
        self.notify(
            user_id,
            Notification::Chat(ChatMessage {
                msg,
                who: String::new(),
                room,
                recipient: None,
                server: true,
                datetime: Utc::now(),
            }),
        );
    }

    fn notify_chat_typing(&mut self, request: SessionsRequest) {
        let SessionsRequest::NotifyChatTyping {
            user_id,
            table_id,
            username,
            typing,
        } = request
        else {
            return;
        };
        self.notify(
            user_id,
            Notification::ChatTyping {
                table_id,
                username,
                typing,
            },
        );
    }

    fn notify_error(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyError { user_id, message } = request {
            self.notify(user_id, Notification::Error { message });
        }
    }

    fn notify_warning(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyWarning { user_id, message } = request {
            self.notify(user_id, Notification::Warning { message });
        }
    }

    fn notify_friends(&mut self, request: SessionsRequest) {
        let SessionsRequest::NotifyFriends { user_id } = request else {
            return;
        };
        if let Some(session) = self.sessions.get(&user_id) {
            session.send(Notification::Friends {
                friends: session.friends.iter().cloned().collect(),
            });
        }
    }

    fn notify_game(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyGame {
            user_id,
            table_id,
            view,
        } = request
        {
            self.notify(user_id, Notification::Game { table_id, view });
        }
    }

    fn notify_joined(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyJoined { user_id, table_id } = request {
            self.notify(user_id, Notification::Joined { table_id });
        }
    }

    fn notify_note(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifyNote {
            user_id,
            table_id,
            order,
            notes,
        } = request
        {
            self.notify(
                user_id,
                Notification::Note {
                    table_id,
                    order,
                    notes,
                },
            );
        }
    }

    fn notify_spectators(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifySpectators {
            user_id,
            table_id,
            spectators,
        } = request
        {
            self.notify(
                user_id,
                Notification::Spectators {
                    table_id,
                    spectators,
                },
            );
        }
    }

    fn notify_sound_lobby(&mut self, request: SessionsRequest) {
        if let SessionsRequest::NotifySoundLobby { user_id, file } = request {
            self.notify(user_id, Notification::SoundLobby { file });
        }
    }

    fn set_status(&mut self, request: SessionsRequest) {
        let SessionsRequest::SetStatus {
            user_id,
            status,
            table_id,
        } = request
        else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&user_id) else {
            return;
        };

        session.data.status = status;
        session.data.table_id = table_id;
        let description = session.description();
        self.broadcast(Notification::User(description));
    }

    fn set_friend(&mut self, request: SessionsRequest) {
        let SessionsRequest::SetFriend {
            user_id,
            friend,
            add,
        } = request
        else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&user_id) else {
            return;
        };

        if add {
            session.friends.insert(friend);
        } else {
            session.friends.remove(&friend);
        }
        session.send(Notification::Friends {
            friends: session.friends.iter().cloned().collect(),
        });
    }

    fn set_muted(&mut self, request: SessionsRequest) {
        let SessionsRequest::SetMuted { user_id, muted } = request else {
            return;
        };
        if let Some(session) = self.sessions.get_mut(&user_id) {
            session.data.muted = muted;
            info!("User {user_id} muted: {muted}");
        }
    }

    fn get_session(&mut self, request: SessionsRequest) {
        if let SessionsRequest::GetSession { user_id, reply } = request {
            let _ = reply.send(self.sessions.get(&user_id).map(|s| s.data.clone()));
        }
    }

    fn get_users(&mut self, request: SessionsRequest) {
        if let SessionsRequest::GetUsers { reply } = request {
            let mut users: Vec<UserDescription> =
                self.sessions.values().map(Session::description).collect();
            users.sort_by_key(|user| user.user_id);
            let _ = reply.send(users);
        }
    }

    fn print(&mut self, _request: SessionsRequest) {
        info!("{} session(s):", self.sessions.len());
        for session in self.sessions.values() {
            info!(
                "  {} ({}) - {} since {}",
                session.data.username,
                session.data.user_id,
                session.data.status,
                session.connected_at
            );
        }
    }
}

impl Manager<Sessions> {
    pub fn new_session(&self, data: SessionData, connection: Connection) -> ManagerResult<()> {
        self.submit(SessionsRequest::New { data, connection })
    }

    pub fn delete_session(
        &self,
        user_id: UserId,
        connection: Option<Connection>,
    ) -> ManagerResult<()> {
        self.submit(SessionsRequest::Delete {
            user_id,
            connection,
        })
    }

    pub fn notify_error(&self, user_id: UserId, message: impl Into<String>) -> ManagerResult<()> {
        self.submit(SessionsRequest::NotifyError {
            user_id,
            message: message.into(),
        })
    }

    pub fn notify_warning(&self, user_id: UserId, message: impl Into<String>) -> ManagerResult<()> {
        self.submit(SessionsRequest::NotifyWarning {
            user_id,
            message: message.into(),
        })
    }

    pub fn set_status(
        &self,
        user_id: UserId,
        status: Status,
        table_id: Option<TableId>,
    ) -> ManagerResult<()> {
        self.submit(SessionsRequest::SetStatus {
            user_id,
            status,
            table_id,
        })
    }

    pub async fn get_session(&self, user_id: UserId) -> ManagerResult<Option<SessionData>> {
        self.request(|reply| SessionsRequest::GetSession { user_id, reply })
            .await
    }

    pub async fn get_users(&self) -> ManagerResult<Vec<UserDescription>> {
        self.request(|reply| SessionsRequest::GetUsers { reply }).await
    }
}

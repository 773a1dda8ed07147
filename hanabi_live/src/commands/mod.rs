//! Inbound command handling.
//!
//! Each connection feeds its text frames into [`CommandDispatcher::dispatch`].
//! A command is parsed and validated here, then turned into exactly one
//! request on the domain that owns the state it touches. Anything the user
//! got wrong comes back to them as an error notification; only a closed
//! domain is reported to the caller.

use log::debug;
use serde_json::Value;
use std::sync::Arc;

pub mod errors;
pub mod messages;
pub mod protocol_version;

pub use errors::CommandError;
pub use messages::Command;
pub use protocol_version::ProtocolVersion;

use crate::{
    actor::ManagerResult,
    chat::{ChatManager, ChatRequest, LOBBY_ROOM, parse_table_room, table_room},
    sessions::{SessionData, SessionsManager, SessionsRequest, UserId},
    store::GameStore,
    table::{HypotheticalOp, TableId, TableResult, TablesManager},
};

/// Parse one raw command.
pub fn parse(text: &str) -> Result<(ProtocolVersion, Command), CommandError> {
    let value: Value = serde_json::from_str(text).map_err(|_| CommandError::Malformed)?;
    let name = value
        .get("command")
        .and_then(Value::as_str)
        .ok_or(CommandError::Malformed)?
        .to_string();
    if !Command::NAMES.contains(&name.as_str()) {
        return Err(CommandError::UnknownCommand(name));
    }

    let version = match value.get("v") {
        None => ProtocolVersion::V1,
        Some(v) => serde_json::from_value::<ProtocolVersion>(v.clone())
            .map_err(|_| CommandError::IncompatibleVersion)?,
    };
    if !ProtocolVersion::current().is_compatible_with(&version) {
        return Err(CommandError::IncompatibleVersion);
    }

    let command =
        serde_json::from_value(value).map_err(|_| CommandError::InvalidData(name.clone()))?;
    Ok((version, command))
}

/// Routes parsed commands to the domain managers.
#[derive(Clone)]
pub struct CommandDispatcher {
    sessions: SessionsManager,
    tables: TablesManager,
    chat: ChatManager,
    store: Arc<dyn GameStore>,
}

impl CommandDispatcher {
    pub fn new(
        sessions: SessionsManager,
        tables: TablesManager,
        chat: ChatManager,
        store: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            sessions,
            tables,
            chat,
            store,
        }
    }

    /// Handle one raw command from `user`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The command was handled, or rejected with a notification
    /// * `Err(ManagerError)` - A domain is shutting down
    pub async fn dispatch(&self, user: &SessionData, text: &str) -> ManagerResult<()> {
        match parse(text) {
            Ok((_, command)) => self.handle(user, command).await,
            Err(e) => {
                debug!("Rejected a command from user {}: {e}", user.user_id);
                self.sessions.notify_error(user.user_id, e.to_string())
            }
        }
    }

    /// Handle an already parsed command.
    pub async fn handle(&self, user: &SessionData, command: Command) -> ManagerResult<()> {
        let user_id = user.user_id;
        match command {
            Command::ChatPm { msg, recipient } => self.sessions.submit(SessionsRequest::ChatPm {
                user_id,
                username: user.username.clone(),
                msg,
                recipient,
                server: false,
            }),
            Command::Chat { msg, room } => {
                // The copy held by the connection may predate a mute
                let muted = self
                    .sessions
                    .get_session(user_id)
                    .await?
                    .is_some_and(|session| session.muted);
                if muted {
                    return self
                        .sessions
                        .notify_error(user_id, "You are currently muted.");
                }
                if room == LOBBY_ROOM {
                    return self.chat.submit(ChatRequest::Chat {
                        user_id,
                        username: user.username.clone(),
                        msg,
                        room,
                        server: false,
                        audience: Vec::new(),
                    });
                }
                match parse_table_room(&room) {
                    Some(table_id) => {
                        let result = self.tables.chat(user.clone(), table_id, msg).await?;
                        self.report(user_id, result)
                    }
                    None => self
                        .sessions
                        .notify_error(user_id, "That chat room does not exist."),
                }
            }
            Command::ChatTyping { table_id, typing } => {
                let result = self
                    .tables
                    .chat_typing(user.clone(), table_id, typing)
                    .await?;
                self.report(user_id, result)
            }
            Command::TableCreate { options } => {
                let result = self.tables.new_table(user.clone(), options).await?;
                self.report(user_id, result)
            }
            Command::TableJoin { table_id, password } => {
                let result = self.tables.join(user.clone(), table_id, password).await?;
                self.report(user_id, result)
            }
            Command::TableLeave { table_id } => {
                let result = self.tables.leave(user.clone(), table_id).await?;
                self.report(user_id, result)
            }
            Command::TableSpectate { table_id } => {
                let result = self.tables.spectate(user.clone(), table_id).await?;
                self.report(user_id, result)
            }
            Command::TableUnspectate { table_id } => {
                let result = self.tables.unspectate(user.clone(), table_id).await?;
                self.report(user_id, result)
            }
            Command::TableStart { table_id } => {
                let result = self.tables.start_game(user.clone(), table_id).await?;
                self.report(user_id, result)
            }
            Command::Action { table_id, action } => {
                let result = self.tables.act(user.clone(), table_id, action).await?;
                self.report(user_id, result)
            }
            Command::ReplayCreate { game_id } => {
                // Loaded here so the Tables worker never waits on storage
                let record = match self.store.load_game(game_id).await {
                    Ok(record) => record,
                    Err(e) => return self.sessions.notify_error(user_id, e.to_string()),
                };
                let result = self.tables.new_replay(user.clone(), record).await?;
                self.report(user_id, result)
            }
            Command::HypoStart { table_id, turn } => {
                self.hypothetical(user, table_id, HypotheticalOp::Start { turn })
                    .await
            }
            Command::HypoAction { table_id, action } => {
                self.hypothetical(user, table_id, HypotheticalOp::Action(action))
                    .await
            }
            Command::HypoBack { table_id } => {
                self.hypothetical(user, table_id, HypotheticalOp::Back).await
            }
            Command::HypoEnd { table_id } => {
                self.hypothetical(user, table_id, HypotheticalOp::End).await
            }
            Command::Tag { table_id, msg } => self.tag(user, table_id, msg, false).await,
            Command::TagDelete { table_id, msg } => self.tag(user, table_id, msg, true).await,
            Command::Note {
                table_id,
                order,
                note,
            } => {
                let result = self.tables.note(user.clone(), table_id, order, note).await?;
                self.report(user_id, result)
            }
            Command::Friend { name } => self.friend(user_id, name, true),
            Command::Unfriend { name } => self.friend(user_id, name, false),
            Command::GetTables => {
                let tables = self.tables.get_tables().await?;
                self.sessions
                    .submit(SessionsRequest::NotifyTables { user_id, tables })
            }
        }
    }

    /// Turn a rejected table request into an error for the user.
    fn report<T>(&self, user_id: UserId, result: TableResult<T>) -> ManagerResult<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => self.sessions.notify_error(user_id, e.to_string()),
        }
    }

    async fn hypothetical(
        &self,
        user: &SessionData,
        table_id: TableId,
        op: HypotheticalOp,
    ) -> ManagerResult<()> {
        let result = self.tables.hypothetical(user.clone(), table_id, op).await?;
        self.report(user.user_id, result)
    }

    async fn tag(
        &self,
        user: &SessionData,
        table_id: TableId,
        tag: String,
        remove: bool,
    ) -> ManagerResult<()> {
        match self.tables.tag(user.clone(), table_id, tag, remove).await? {
            Ok(tag) => {
                let verb = if remove { "removed" } else { "added" };
                self.sessions.submit(SessionsRequest::NotifyChatServer {
                    user_id: user.user_id,
                    msg: format!("Tag \"{tag}\" {verb}."),
                    room: table_room(table_id),
                })
            }
            Err(e) => self.sessions.notify_error(user.user_id, e.to_string()),
        }
    }

    fn friend(&self, user_id: UserId, name: String, add: bool) -> ManagerResult<()> {
        let friend = name.trim().to_lowercase();
        if friend.is_empty() {
            let e = CommandError::Rejected("You must specify a username.".to_string());
            return self.sessions.notify_error(user_id, e.to_string());
        }
        self.sessions.submit(SessionsRequest::SetFriend {
            user_id,
            friend,
            add,
        })
    }
}

//! Requests understood by the Tables worker.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::{
    config::TableOptions,
    errors::TableError,
    models::{TableDescription, TableId, UserTables},
    timer::TimerToken,
};
use crate::{
    game::{Clue, GameAction, GameSnapshot},
    sessions::{SessionData, UserId},
    store::{ArchivedTable, GameRecord},
};

/// Reply slot for requests that can be rejected
pub type TableReply<T> = oneshot::Sender<Result<T, TableError>>;

/// A game action as sent by a client; the acting seat comes from the session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableAction {
    Play { order: usize },
    Discard { order: usize },
    Clue { target: usize, clue: Clue },
    Pause,
    Unpause,
    Terminate,
}

impl TableAction {
    pub fn into_game_action(self, player: usize) -> GameAction {
        match self {
            Self::Play { order } => GameAction::Play { player, order },
            Self::Discard { order } => GameAction::Discard { player, order },
            Self::Clue { target, clue } => GameAction::Clue {
                player,
                target,
                clue,
            },
            Self::Pause => GameAction::Pause { player },
            Self::Unpause => GameAction::Unpause { player },
            Self::Terminate => GameAction::Terminate { player },
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HypotheticalOp {
    Start { turn: u32 },
    Action(TableAction),
    Back,
    End,
}

#[derive(Debug)]
pub enum TablesRequest {
    /// `password_hash` is computed by the caller, off the worker
    NewTable {
        owner: SessionData,
        options: TableOptions,
        password_hash: Option<String>,
        reply: TableReply<TableId>,
    },
    /// First half of a password join: the hash to verify against
    GetPasswordHash {
        table_id: TableId,
        reply: oneshot::Sender<Option<String>>,
    },
    /// Replies with the updated player list. `password_hash` is the table's
    /// hash when the caller's password verified against it.
    Join {
        user: SessionData,
        table_id: TableId,
        password_hash: Option<String>,
        reply: TableReply<Vec<String>>,
    },
    Leave {
        user: SessionData,
        table_id: TableId,
        reply: TableReply<()>,
    },
    Spectate {
        user: SessionData,
        table_id: TableId,
        reply: TableReply<TableDescription>,
    },
    Unspectate {
        user: SessionData,
        table_id: TableId,
        reply: TableReply<()>,
    },
    /// Open a finished game as a read-only replay table
    NewReplay {
        user: SessionData,
        record: GameRecord,
        reply: TableReply<TableId>,
    },
    StartGame {
        user: SessionData,
        table_id: TableId,
        reply: TableReply<()>,
    },
    Action {
        user: SessionData,
        table_id: TableId,
        action: TableAction,
        reply: TableReply<()>,
    },
    Hypothetical {
        user: SessionData,
        table_id: TableId,
        op: HypotheticalOp,
        reply: TableReply<()>,
    },
    Tag {
        user: SessionData,
        table_id: TableId,
        tag: String,
        remove: bool,
        reply: TableReply<String>,
    },
    /// A message for the table's chat room
    Chat {
        user: SessionData,
        table_id: TableId,
        msg: String,
        reply: TableReply<()>,
    },
    ChatTyping {
        user: SessionData,
        table_id: TableId,
        typing: bool,
        reply: TableReply<()>,
    },
    /// Set a player's note on a card; an empty note clears it
    Note {
        user: SessionData,
        table_id: TableId,
        order: usize,
        note: String,
        reply: TableReply<()>,
    },
    /// Bring back a table archived at the last shutdown
    Restore {
        archived: Box<ArchivedTable>,
        reply: TableReply<TableId>,
    },
    /// A turn timer woke up
    CheckTimer(TimerToken),
    /// Remove the user from every table they sit at or watch
    DisconnectUser {
        user_id: UserId,
    },
    IdleSweep,
    GetTable {
        table_id: TableId,
        reply: oneshot::Sender<Option<TableDescription>>,
    },
    GetTables {
        reply: oneshot::Sender<Vec<TableDescription>>,
    },
    GetUserTables {
        user_id: UserId,
        reply: oneshot::Sender<UserTables>,
    },
    GetSnapshot {
        table_id: TableId,
        reply: oneshot::Sender<Option<GameSnapshot>>,
    },
    Print,
}

/// Routing key of a [`TablesRequest`]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TablesRequestKind {
    NewTable,
    GetPasswordHash,
    Join,
    Leave,
    Spectate,
    Unspectate,
    NewReplay,
    StartGame,
    Action,
    Hypothetical,
    Tag,
    Chat,
    ChatTyping,
    Note,
    Restore,
    CheckTimer,
    DisconnectUser,
    IdleSweep,
    GetTable,
    GetTables,
    GetUserTables,
    GetSnapshot,
    Print,
}

impl TablesRequest {
    pub fn kind(&self) -> TablesRequestKind {
        use TablesRequestKind as Kind;
        match self {
            Self::NewTable { .. } => Kind::NewTable,
            Self::GetPasswordHash { .. } => Kind::GetPasswordHash,
            Self::Join { .. } => Kind::Join,
            Self::Leave { .. } => Kind::Leave,
            Self::Spectate { .. } => Kind::Spectate,
            Self::Unspectate { .. } => Kind::Unspectate,
            Self::NewReplay { .. } => Kind::NewReplay,
            Self::StartGame { .. } => Kind::StartGame,
            Self::Action { .. } => Kind::Action,
            Self::Hypothetical { .. } => Kind::Hypothetical,
            Self::Tag { .. } => Kind::Tag,
            Self::Chat { .. } => Kind::Chat,
            Self::ChatTyping { .. } => Kind::ChatTyping,
            Self::Note { .. } => Kind::Note,
            Self::Restore { .. } => Kind::Restore,
            Self::CheckTimer(_) => Kind::CheckTimer,
            Self::DisconnectUser { .. } => Kind::DisconnectUser,
            Self::IdleSweep => Kind::IdleSweep,
            Self::GetTable { .. } => Kind::GetTable,
            Self::GetTables { .. } => Kind::GetTables,
            Self::GetUserTables { .. } => Kind::GetUserTables,
            Self::GetSnapshot { .. } => Kind::GetSnapshot,
            Self::Print => Kind::Print,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_action_wire_format() {
        let action: TableAction =
            serde_json::from_str(r#"{"type":"clue","target":1,"clue":{"type":"rank","value":3}}"#)
                .unwrap();
        assert_eq!(
            action.clone().into_game_action(0),
            GameAction::Clue {
                player: 0,
                target: 1,
                clue: Clue::Rank(3),
            }
        );

        let action: TableAction = serde_json::from_str(r#"{"type":"pause"}"#).unwrap();
        assert_eq!(action.into_game_action(2), GameAction::Pause { player: 2 });
    }
}

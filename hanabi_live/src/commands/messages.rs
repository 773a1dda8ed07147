use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    chat::LOBBY_ROOM,
    table::{TableAction, TableId, TableOptions},
};

fn lobby_room() -> String {
    LOBBY_ROOM.to_string()
}

/// A command from a client, tagged by its `"command"` field.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    #[serde(rename = "chatPM")]
    ChatPm {
        msg: String,
        recipient: String,
    },
    Chat {
        msg: String,
        #[serde(default = "lobby_room")]
        room: String,
    },
    ChatTyping {
        table_id: TableId,
        typing: bool,
    },
    TableCreate {
        #[serde(default)]
        options: TableOptions,
    },
    TableJoin {
        table_id: TableId,
        #[serde(default)]
        password: Option<String>,
    },
    TableLeave {
        table_id: TableId,
    },
    TableSpectate {
        table_id: TableId,
    },
    TableUnspectate {
        table_id: TableId,
    },
    TableStart {
        table_id: TableId,
    },
    Action {
        table_id: TableId,
        action: TableAction,
    },
    ReplayCreate {
        game_id: u64,
    },
    HypoStart {
        table_id: TableId,
        turn: u32,
    },
    HypoAction {
        table_id: TableId,
        action: TableAction,
    },
    HypoBack {
        table_id: TableId,
    },
    HypoEnd {
        table_id: TableId,
    },
    Tag {
        table_id: TableId,
        msg: String,
    },
    TagDelete {
        table_id: TableId,
        msg: String,
    },
    Note {
        table_id: TableId,
        order: usize,
        note: String,
    },
    Friend {
        name: String,
    },
    Unfriend {
        name: String,
    },
    GetTables,
}

impl Command {
    /// Every command name accepted on the wire.
    pub const NAMES: [&'static str; 21] = [
        "chatPM",
        "chat",
        "chatTyping",
        "tableCreate",
        "tableJoin",
        "tableLeave",
        "tableSpectate",
        "tableUnspectate",
        "tableStart",
        "action",
        "replayCreate",
        "hypoStart",
        "hypoAction",
        "hypoBack",
        "hypoEnd",
        "tag",
        "tagDelete",
        "note",
        "friend",
        "unfriend",
        "getTables",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatPm { .. } => "chatPM",
            Self::Chat { .. } => "chat",
            Self::ChatTyping { .. } => "chatTyping",
            Self::TableCreate { .. } => "tableCreate",
            Self::TableJoin { .. } => "tableJoin",
            Self::TableLeave { .. } => "tableLeave",
            Self::TableSpectate { .. } => "tableSpectate",
            Self::TableUnspectate { .. } => "tableUnspectate",
            Self::TableStart { .. } => "tableStart",
            Self::Action { .. } => "action",
            Self::ReplayCreate { .. } => "replayCreate",
            Self::HypoStart { .. } => "hypoStart",
            Self::HypoAction { .. } => "hypoAction",
            Self::HypoBack { .. } => "hypoBack",
            Self::HypoEnd { .. } => "hypoEnd",
            Self::Tag { .. } => "tag",
            Self::TagDelete { .. } => "tagDelete",
            Self::Note { .. } => "note",
            Self::Friend { .. } => "friend",
            Self::Unfriend { .. } => "unfriend",
            Self::GetTables => "getTables",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

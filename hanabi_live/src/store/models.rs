use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    UserId,
    game::{CardIdentity, EndCondition, GameAction, GameOptions, GameSnapshot},
    table::{TableOptions, TablePlayer},
};

/// A finished game as persisted.
///
/// The deck plus the action log is enough to replay the whole game.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Assigned by the store on write; 0 until then
    pub id: u64,
    pub table_name: String,
    pub variant_id: u32,
    pub variant: String,
    pub options: GameOptions,
    pub players: Vec<String>,
    pub seed: String,
    pub deck: Vec<CardIdentity>,
    pub actions: Vec<GameAction>,
    pub score: u32,
    pub num_turns: u32,
    pub strikes: u32,
    pub end_condition: EndCondition,
    pub tags: BTreeMap<String, UserId>,
    pub datetime_started: DateTime<Utc>,
    pub datetime_finished: DateTime<Utc>,
}

impl GameRecord {
    pub fn duration_secs(&self) -> u64 {
        (self.datetime_finished - self.datetime_started)
            .num_seconds()
            .max(0) as u64
    }
}

/// A table whose game was still running at shutdown.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedTable {
    pub name: String,
    pub owner: UserId,
    pub options: TableOptions,
    pub password_hash: Option<String>,
    /// Seated players with their game seats and notes
    pub players: Vec<TablePlayer>,
    pub game: GameSnapshot,
}

/// Totals across every persisted game.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub num_games: u64,
    pub time_played_secs: u64,
}

/// Raw per-variant aggregates as kept by the store.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStatsRow {
    pub num_games: u64,
    pub total_score: u64,
    pub num_max_scores: u64,
    pub num_strikeouts: u64,
}

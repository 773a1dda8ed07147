//! Table models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tokio::time::Instant;

use super::{config::TableOptions, timer::TurnClock};
use crate::{
    game::{Game, Variant},
    sessions::{SessionData, UserId},
    store::ArchivedTable,
};

pub type TableId = u64;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePlayer {
    pub user_id: UserId,
    pub username: String,
    /// False while the player's connection is gone; the seat is kept
    pub present: bool,
    /// Seat in the game, fixed when the game is dealt
    pub seat: Option<usize>,
    /// The player's notes keyed by card order
    #[serde(default)]
    pub notes: BTreeMap<usize, String>,
}

impl TablePlayer {
    pub fn new(user: &SessionData) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            present: true,
            seat: None,
            notes: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Spectator {
    pub user_id: UserId,
    pub username: String,
}

/// A lobby/game container with at most one game.
#[derive(Debug)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub owner: UserId,
    pub options: TableOptions,
    pub variant: Arc<Variant>,
    pub password_hash: Option<String>,
    pub players: Vec<TablePlayer>,
    pub spectators: Vec<Spectator>,
    pub game: Option<Game>,
    /// Rebuilt from a finished game record
    pub replay: bool,
    pub clock: Option<TurnClock>,
    pub created_at: DateTime<Utc>,
    pub last_activity: Instant,
}

impl Table {
    /// A fresh table with its creator seated.
    pub fn new(
        id: TableId,
        owner: &SessionData,
        mut options: TableOptions,
        variant: Arc<Variant>,
        password_hash: Option<String>,
    ) -> Self {
        options.password = None;
        Self {
            id,
            name: options.name.clone(),
            owner: owner.user_id,
            options,
            variant,
            password_hash,
            players: vec![TablePlayer::new(owner)],
            spectators: Vec::new(),
            game: None,
            replay: false,
            clock: None,
            created_at: Utc::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn player_index(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn spectator_index(&self, user_id: UserId) -> Option<usize> {
        self.spectators.iter().position(|s| s.user_id == user_id)
    }

    /// Seated or watching.
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.player_index(user_id).is_some() || self.spectator_index(user_id).is_some()
    }

    /// Seat in the game of the player with `user_id`.
    pub fn game_seat(&self, user_id: UserId) -> Option<usize> {
        self.game.as_ref()?;
        self.players.iter().find(|p| p.user_id == user_id)?.seat
    }

    /// The player dealt into `seat`.
    pub fn seated_at(&self, seat: usize) -> Option<&TablePlayer> {
        self.players.iter().find(|p| p.seat == Some(seat))
    }

    /// Whether a seated player already goes by `username`, ignoring case.
    pub fn has_player_named(&self, username: &str) -> bool {
        self.players
            .iter()
            .any(|p| p.username.eq_ignore_ascii_case(username))
    }

    /// Fix every player's game seat in table order, matching the deal.
    pub fn assign_seats(&mut self) {
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.seat = Some(seat);
        }
    }

    pub fn is_started(&self) -> bool {
        self.game.is_some()
    }

    /// A game exists and has not ended.
    pub fn is_running(&self) -> bool {
        self.game.as_ref().is_some_and(|g| !g.is_ended())
    }

    /// No spectators and no present players.
    pub fn is_abandoned(&self) -> bool {
        self.spectators.is_empty() && self.players.iter().all(|p| !p.present)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.username.clone()).collect()
    }

    pub fn spectator_names(&self) -> Vec<String> {
        self.spectators.iter().map(|s| s.username.clone()).collect()
    }

    /// Everyone watching the table with their game seat, if any.
    pub fn audience(&self) -> Vec<(UserId, Option<usize>)> {
        let players = self.players.iter().map(|p| (p.user_id, p.seat));
        let spectators = self.spectators.iter().map(|s| (s.user_id, None));
        players.chain(spectators).collect()
    }

    /// Every player's note on the card `order`, in seat order.
    pub fn notes_on(&self, order: usize) -> Vec<CardNote> {
        let mut players: Vec<&TablePlayer> = self.players.iter().collect();
        players.sort_by_key(|p| p.seat);
        players
            .into_iter()
            .filter_map(|p| {
                p.notes.get(&order).map(|text| CardNote {
                    name: p.username.clone(),
                    text: text.clone(),
                })
            })
            .collect()
    }

    /// What survives a restart: a running game and the people seated at it.
    pub fn archive(&self) -> Option<ArchivedTable> {
        if self.replay || !self.is_running() {
            return None;
        }
        Some(ArchivedTable {
            name: self.name.clone(),
            owner: self.owner,
            options: self.options.clone(),
            password_hash: self.password_hash.clone(),
            players: self.players.clone(),
            game: self.game.as_ref()?.snapshot(),
        })
    }

    pub fn description(&self) -> TableDescription {
        TableDescription {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner,
            variant: self.variant.name.clone(),
            players: self.player_names(),
            disconnected: self
                .players
                .iter()
                .filter(|p| !p.present)
                .map(|p| p.username.clone())
                .collect(),
            spectators: self.spectator_names(),
            max_players: self.options.max_players,
            password_protected: self.password_hash.is_some(),
            started: self.is_started(),
            running: self.is_running(),
            replay: self.replay,
            options: self.options.clone(),
        }
    }
}

/// Lobby-visible description of a table
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub id: TableId,
    pub name: String,
    pub owner: UserId,
    pub variant: String,
    pub players: Vec<String>,
    /// Seated players whose connection is gone
    pub disconnected: Vec<String>,
    pub spectators: Vec<String>,
    pub max_players: usize,
    pub password_protected: bool,
    pub started: bool,
    pub running: bool,
    pub replay: bool,
    pub options: TableOptions,
}

/// One player's note on a card, as shown to spectators
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardNote {
    pub name: String,
    pub text: String,
}

/// Tables a user sits at or watches.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTables {
    pub playing: Vec<TableId>,
    pub spectating: Vec<TableId>,
}

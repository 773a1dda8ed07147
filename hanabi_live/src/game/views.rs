//! Serializable exports of a [`Game`]: full snapshots for restarts, game
//! records for persistence and per-seat views for clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::{
    actions::GameAction,
    card::{Card, CardIdentity},
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    errors::RuleViolation,
    stacks::StackDirection,
    state_machine::{EndCondition, Game, GameOptions, GamePlayer, GameStatus},
    variant::Variant,
};
use crate::{UserId, store::GameRecord};

/// Everything needed to rebuild a game after a restart.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub variant: String,
    pub options: GameOptions,
    pub seed: String,
    pub players: Vec<GamePlayer>,
    pub deck: Vec<Card>,
    pub deck_index: usize,
    pub stacks: Vec<u8>,
    pub directions: Vec<StackDirection>,
    pub turn: u32,
    pub active_player: usize,
    pub clue_tokens: u32,
    pub score: u32,
    pub max_score: u32,
    pub strikes: u32,
    pub end_condition: EndCondition,
    pub end_player: Option<usize>,
    pub end_turn: Option<u32>,
    pub started: bool,
    pub paused: bool,
    pub pause_player: Option<usize>,
    pub pause_count: u32,
    pub generation: u64,
    pub actions: Vec<GameAction>,
    pub tags: BTreeMap<String, UserId>,
    /// Hypotheticals are not carried over a restore
    pub hypothetical: bool,
    pub datetime_started: Option<DateTime<Utc>>,
    pub datetime_finished: Option<DateTime<Utc>>,
}

/// A card as one viewer sees it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub order: usize,
    pub suit_index: Option<usize>,
    pub rank: Option<u8>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub index: usize,
    pub name: String,
    pub hand: Vec<CardView>,
}

/// The game as pushed to one player or spectator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub variant: String,
    pub status: GameStatus,
    pub turn: u32,
    pub active_player: usize,
    pub clue_tokens: u32,
    pub score: u32,
    pub max_score: u32,
    pub strikes: u32,
    pub stacks: Vec<u8>,
    pub directions: Vec<StackDirection>,
    pub cards_left: usize,
    pub discards: Vec<CardIdentity>,
    pub players: Vec<PlayerView>,
    pub hypothetical: bool,
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            variant: self.variant.name.clone(),
            options: self.options.clone(),
            seed: self.seed.clone(),
            players: self.players.clone(),
            deck: self.deck.clone(),
            deck_index: self.deck_index,
            stacks: self.stacks.clone(),
            directions: self.directions.clone(),
            turn: self.turn,
            active_player: self.active_player,
            clue_tokens: self.clue_tokens,
            score: self.score,
            max_score: self.max_score,
            strikes: self.strikes,
            end_condition: self.end_condition,
            end_player: self.end_player,
            end_turn: self.end_turn,
            started: self.started,
            paused: self.paused,
            pause_player: self.pause_player,
            pause_count: self.pause_count,
            generation: self.generation,
            actions: self.actions.clone(),
            tags: self.tags.clone(),
            hypothetical: self.is_hypothetical(),
            datetime_started: self.datetime_started,
            datetime_finished: self.datetime_finished,
        }
    }

    /// Rebuild a game from a snapshot taken by [`Game::snapshot`].
    pub fn restore(snapshot: GameSnapshot, variant: Arc<Variant>) -> Result<Self, RuleViolation> {
        let suits = variant.suits.len();
        let num_players = snapshot.players.len();
        let consistent = snapshot.variant == variant.name
            && snapshot.stacks.len() == suits
            && snapshot.directions.len() == suits
            && (MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players)
            && snapshot.active_player < num_players
            && snapshot.deck_index <= snapshot.deck.len()
            && snapshot
                .players
                .iter()
                .flat_map(|p| &p.hand)
                .all(|order| *order < snapshot.deck.len());
        if !consistent {
            return Err(RuleViolation::InvalidSnapshot);
        }

        let identities = snapshot.deck.iter().map(Card::identity).collect();
        let names = snapshot.players.iter().map(|p| p.name.clone()).collect();
        let mut game = Self::with_deck(
            variant,
            snapshot.options,
            names,
            snapshot.seed,
            identities,
        )?;

        game.players = snapshot.players;
        game.deck = snapshot.deck;
        game.deck_index = snapshot.deck_index;
        game.stacks = snapshot.stacks;
        game.directions = snapshot.directions;
        game.turn = snapshot.turn;
        game.active_player = snapshot.active_player;
        game.clue_tokens = snapshot.clue_tokens;
        game.score = snapshot.score;
        game.max_score = snapshot.max_score;
        game.strikes = snapshot.strikes;
        game.end_condition = snapshot.end_condition;
        game.end_player = snapshot.end_player;
        game.end_turn = snapshot.end_turn;
        game.started = snapshot.started;
        game.paused = snapshot.paused;
        game.pause_player = snapshot.pause_player;
        game.pause_count = snapshot.pause_count;
        game.generation = snapshot.generation;
        game.actions = snapshot.actions;
        game.tags = snapshot.tags;
        game.datetime_started = snapshot.datetime_started;
        game.datetime_finished = snapshot.datetime_finished;
        Ok(game)
    }

    /// The persisted form of this game.
    pub fn record(&self, table_name: &str) -> GameRecord {
        let now = Utc::now();
        GameRecord {
            id: 0,
            table_name: table_name.to_string(),
            variant_id: self.variant.id,
            variant: self.variant.name.clone(),
            options: self.options.clone(),
            players: self.player_names(),
            seed: self.seed.clone(),
            deck: self.identities(),
            actions: self.actions.clone(),
            score: self.score,
            num_turns: self.turn,
            strikes: self.strikes,
            end_condition: self.end_condition,
            tags: self.tags.clone(),
            datetime_started: self.datetime_started.unwrap_or(now),
            datetime_finished: self.datetime_finished.unwrap_or(now),
        }
    }

    /// Replay a persisted game from its deck and action log.
    pub fn from_record(record: &GameRecord, variant: Arc<Variant>) -> Result<Self, RuleViolation> {
        let mut game = Self::with_deck(
            variant,
            record.options.clone(),
            record.players.clone(),
            record.seed.clone(),
            record.deck.clone(),
        )?;
        game.start()?;

        for action in &record.actions {
            if game.is_ended() {
                break;
            }
            // Pauses only matter to the clock
            if matches!(
                action,
                GameAction::Pause { .. } | GameAction::Unpause { .. }
            ) {
                continue;
            }
            game.apply(action.clone())?;
        }

        game.tags = record.tags.clone();
        game.datetime_started = Some(record.datetime_started);
        game.datetime_finished = Some(record.datetime_finished);
        Ok(game)
    }

    /// What `seat` is allowed to see. Spectators pass `None`.
    ///
    /// Players never see their own hand while the game is running. During a
    /// hypothetical everybody sees the scratch game with every card revealed.
    pub fn view_for(&self, seat: Option<usize>) -> GameView {
        if let Some(scratch) = self.hypothetical() {
            let mut view = scratch.view_for(None);
            view.hypothetical = true;
            return view;
        }

        let hide_own = !self.is_ended();
        let players = self
            .players
            .iter()
            .map(|player| {
                let hidden = hide_own && seat == Some(player.index);
                let hand = player
                    .hand
                    .iter()
                    .map(|order| {
                        let card = &self.deck[*order];
                        CardView {
                            order: *order,
                            suit_index: (!hidden).then_some(card.suit_index),
                            rank: (!hidden).then_some(card.rank),
                        }
                    })
                    .collect();
                PlayerView {
                    index: player.index,
                    name: player.name.clone(),
                    hand,
                }
            })
            .collect();

        GameView {
            variant: self.variant.name.clone(),
            status: self.status(),
            turn: self.turn,
            active_player: self.active_player,
            clue_tokens: self.clue_tokens,
            score: self.score,
            max_score: self.max_score,
            strikes: self.strikes,
            stacks: self.stacks.clone(),
            directions: self.directions.clone(),
            cards_left: self.cards_left(),
            discards: self
                .deck
                .iter()
                .filter(|card| card.discarded)
                .map(Card::identity)
                .collect(),
            players,
            hypothetical: false,
        }
    }
}

//! The rules engine for one table's game.
//!
//! A [`Game`] is only ever mutated by the Tables worker that owns it. Every
//! action is validated completely before anything changes, applied as one
//! mutation, then followed by [`Game::check_end`].

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::{
    actions::{Clue, GameAction},
    card::{Card, CardIdentity, shuffled_identities},
    constants::{MAX_PLAYERS, MAX_RANK, MAX_STRIKE_NUM, MIN_PLAYERS},
    errors::RuleViolation,
    stacks::{
        StackDirection, direction_after_play, is_dead, is_playable, next_ranks, suit_max_score,
    },
    variant::Variant,
};
use crate::UserId;

/// Per-game rule toggles chosen when the table is created.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameOptions {
    /// End as soon as a perfect score becomes impossible
    pub speedrun: bool,
    /// Only a perfect score counts; no final go-around once the deck runs out
    pub all_or_nothing: bool,
    pub one_extra_card: bool,
    pub one_less_card: bool,
    /// Turns are timed; also enables pausing
    pub timed: bool,
}

/// Why a game ended. Leaves `InProgress` exactly once.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndCondition {
    #[default]
    InProgress,
    Normal,
    Strikeout,
    Timeout,
    Terminated,
    IdleTimeout,
    SpeedrunFail,
    AllOrNothingFail,
    AllOrNothingSoftlock,
    CharacterSoftlock,
}

impl EndCondition {
    pub fn is_terminal(self) -> bool {
        self != Self::InProgress
    }

    /// End conditions that zero the score.
    pub fn forfeits_score(self) -> bool {
        matches!(self, Self::Timeout | Self::Terminated | Self::IdleTimeout)
    }
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::InProgress => "in progress",
            Self::Normal => "normal",
            Self::Strikeout => "strikeout",
            Self::Timeout => "timeout",
            Self::Terminated => "terminated",
            Self::IdleTimeout => "idle timeout",
            Self::SpeedrunFail => "speedrun fail",
            Self::AllOrNothingFail => "all or nothing fail",
            Self::AllOrNothingSoftlock => "all or nothing softlock",
            Self::CharacterSoftlock => "character softlock",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    NotStarted,
    Running,
    Paused,
    Ended(EndCondition),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GamePlayer {
    pub index: usize,
    pub name: String,
    /// Card orders, oldest first
    pub hand: Vec<usize>,
}

/// Cards dealt to each player.
pub fn hand_size(num_players: usize, options: &GameOptions) -> usize {
    let mut size = match num_players {
        2 | 3 => 5,
        4 | 5 => 4,
        _ => 3,
    };
    if options.one_extra_card {
        size += 1;
    }
    if options.one_less_card {
        size -= 1;
    }
    size
}

#[derive(Clone, Debug)]
struct Hypothetical {
    base_turn: u32,
    game: Game,
    actions: Vec<GameAction>,
}

#[derive(Clone, Debug)]
pub struct Game {
    pub(super) variant: Arc<Variant>,
    pub(super) options: GameOptions,
    pub(super) seed: String,
    pub(super) players: Vec<GamePlayer>,
    pub(super) deck: Vec<Card>,
    pub(super) deck_index: usize,
    /// Top rank per suit, 0 when empty
    pub(super) stacks: Vec<u8>,
    pub(super) directions: Vec<StackDirection>,
    pub(super) turn: u32,
    pub(super) active_player: usize,
    pub(super) clue_tokens: u32,
    pub(super) score: u32,
    pub(super) max_score: u32,
    pub(super) strikes: u32,
    pub(super) end_condition: EndCondition,
    pub(super) end_player: Option<usize>,
    /// Fixed when the final card is drawn
    pub(super) end_turn: Option<u32>,
    pub(super) started: bool,
    pub(super) paused: bool,
    pub(super) pause_player: Option<usize>,
    pub(super) pause_count: u32,
    /// Bumped by every state-changing mutation
    pub(super) generation: u64,
    pub(super) actions: Vec<GameAction>,
    hypothetical: Option<Box<Hypothetical>>,
    pub(super) tags: BTreeMap<String, UserId>,
    pub(super) datetime_started: Option<DateTime<Utc>>,
    pub(super) datetime_finished: Option<DateTime<Utc>>,
}

impl Game {
    /// A game dealt from `seed`.
    pub fn new(
        variant: Arc<Variant>,
        options: GameOptions,
        player_names: Vec<String>,
        seed: impl Into<String>,
    ) -> Result<Self, RuleViolation> {
        let seed = seed.into();
        let identities = shuffled_identities(&variant, &seed);
        Self::with_deck(variant, options, player_names, seed, identities)
    }

    /// A game dealt from an explicit card order.
    pub fn with_deck(
        variant: Arc<Variant>,
        options: GameOptions,
        player_names: Vec<String>,
        seed: impl Into<String>,
        identities: Vec<CardIdentity>,
    ) -> Result<Self, RuleViolation> {
        let num_players = player_names.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
            return Err(RuleViolation::PlayerCount {
                got: num_players,
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }

        let malformed = identities.iter().any(|card| {
            card.suit_index >= variant.suits.len() || card.rank == 0 || card.rank > MAX_RANK
        });
        if malformed || identities.len() < num_players * hand_size(num_players, &options) {
            return Err(RuleViolation::InvalidDeck(identities.len()));
        }

        let deck = identities
            .into_iter()
            .enumerate()
            .map(|(order, identity)| Card::new(order, identity))
            .collect();
        let players = player_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| GamePlayer {
                index,
                name,
                hand: Vec::new(),
            })
            .collect();

        let mut game = Self {
            stacks: vec![0; variant.suits.len()],
            directions: variant.initial_directions(),
            clue_tokens: variant.max_clue_tokens(),
            max_score: variant.max_score(),
            variant,
            options,
            seed: seed.into(),
            players,
            deck,
            deck_index: 0,
            turn: 0,
            active_player: 0,
            score: 0,
            strikes: 0,
            end_condition: EndCondition::InProgress,
            end_player: None,
            end_turn: None,
            started: false,
            paused: false,
            pause_player: None,
            pause_count: 0,
            generation: 0,
            actions: Vec::new(),
            hypothetical: None,
            tags: BTreeMap::new(),
            datetime_started: None,
            datetime_finished: None,
        };
        game.refresh_reachability();
        Ok(game)
    }

    /// Deal every hand and hand the first turn to seat 0.
    pub fn start(&mut self) -> Result<(), RuleViolation> {
        if self.started {
            return Err(RuleViolation::AlreadyStarted);
        }

        let size = hand_size(self.players.len(), &self.options);
        for seat in 0..self.players.len() {
            for _ in 0..size {
                self.draw(seat);
            }
        }

        self.started = true;
        self.datetime_started = Some(Utc::now());
        self.generation += 1;
        Ok(())
    }

    /// Apply one action and re-evaluate the end conditions.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The game is over after this action
    /// * `Ok(false)` - The game continues
    /// * `Err(RuleViolation)` - The action was rejected and nothing changed
    pub fn apply(&mut self, action: GameAction) -> Result<bool, RuleViolation> {
        if !self.started {
            return Err(RuleViolation::NotStarted);
        }
        if self.is_ended() {
            return Err(RuleViolation::GameEnded);
        }
        if let Some(player) = action.player()
            && player >= self.players.len()
        {
            return Err(RuleViolation::InvalidPlayer(player));
        }

        match &action {
            GameAction::Play { player, order } => {
                self.check_turn(*player)?;
                let position = self.hand_position(*player, *order)?;
                self.play(*player, position);
                self.finish_turn();
            }
            GameAction::Discard { player, order } => {
                self.check_turn(*player)?;
                if self.clue_tokens >= self.variant.max_clue_tokens() {
                    return Err(RuleViolation::MaxClueTokens);
                }
                let position = self.hand_position(*player, *order)?;
                self.discard(*player, position);
                self.finish_turn();
            }
            GameAction::Clue {
                player,
                target,
                clue,
            } => {
                self.check_turn(*player)?;
                self.validate_clue(*player, *target, *clue)?;
                self.clue_tokens -= self.variant.adjusted_clue_tokens(1);
                self.finish_turn();
            }
            GameAction::Pause { player } => {
                if !self.options.timed {
                    return Err(RuleViolation::PauseUnavailable);
                }
                if self.paused {
                    return Err(RuleViolation::AlreadyPaused);
                }
                self.paused = true;
                self.pause_player = Some(*player);
                self.pause_count += 1;
            }
            GameAction::Unpause { .. } => {
                if !self.options.timed {
                    return Err(RuleViolation::PauseUnavailable);
                }
                if !self.paused {
                    return Err(RuleViolation::NotPaused);
                }
                self.paused = false;
                self.pause_player = None;
                self.pause_count += 1;
            }
            GameAction::Terminate { player } => {
                self.conclude(EndCondition::Terminated, Some(*player), "terminated by a player");
            }
            GameAction::Timeout { player } => {
                self.conclude(EndCondition::Timeout, Some(*player), "time ran out");
            }
            GameAction::Idle => {
                self.conclude(EndCondition::IdleTimeout, None, "idle for too long");
            }
        }

        self.actions.push(action);
        self.generation += 1;
        Ok(self.check_end())
    }

    /// Decide whether the game is over, recording the reason the first time.
    ///
    /// Idempotent: once a terminal condition is set it is returned unchanged.
    pub fn check_end(&mut self) -> bool {
        if self.end_condition.is_terminal() {
            return true;
        }
        if !self.started {
            return false;
        }

        let full_score = self.variant.max_score();

        if self.strikes >= MAX_STRIKE_NUM {
            return self.conclude(EndCondition::Strikeout, None, "strike maximum reached");
        }

        if self.options.speedrun && self.max_score < full_score {
            return self.conclude(
                EndCondition::SpeedrunFail,
                None,
                "a perfect score is impossible in a speedrun",
            );
        }

        if self.options.all_or_nothing && self.max_score < full_score {
            return self.conclude(
                EndCondition::AllOrNothingFail,
                None,
                "a perfect score is impossible in an all or nothing game",
            );
        }

        if self.options.all_or_nothing
            && self.players[self.active_player].hand.is_empty()
            && self.clue_tokens < self.variant.adjusted_clue_tokens(1)
        {
            return self.conclude(
                EndCondition::AllOrNothingSoftlock,
                Some(self.active_player),
                "the active player has no cards and no clue tokens",
            );
        }

        if self.end_turn == Some(self.turn) {
            return self.conclude(EndCondition::Normal, None, "final turn reached");
        }

        if self.score == self.max_score {
            return self.conclude(EndCondition::Normal, None, "maximum score reached");
        }

        if self.any_suit_reachable() {
            return false;
        }

        self.conclude(EndCondition::Normal, None, "no remaining cards can be played")
    }

    fn conclude(&mut self, condition: EndCondition, player: Option<usize>, reason: &str) -> bool {
        if self.end_condition.is_terminal() {
            return true;
        }

        info!("Game ended ({condition}) on turn {}: {reason}", self.turn);
        self.end_condition = condition;
        self.end_player = player;
        self.paused = false;
        self.pause_player = None;
        if condition.forfeits_score() {
            self.score = 0;
        }
        self.datetime_finished = Some(Utc::now());
        true
    }

    fn check_turn(&self, player: usize) -> Result<(), RuleViolation> {
        if self.paused {
            return Err(RuleViolation::Paused);
        }
        if player != self.active_player {
            return Err(RuleViolation::OutOfTurn);
        }
        Ok(())
    }

    fn hand_position(&self, player: usize, order: usize) -> Result<usize, RuleViolation> {
        self.players[player]
            .hand
            .iter()
            .position(|card| *card == order)
            .ok_or(RuleViolation::CardNotInHand(order))
    }

    fn validate_clue(&self, player: usize, target: usize, clue: Clue) -> Result<(), RuleViolation> {
        if target == player {
            return Err(RuleViolation::ClueSelf);
        }
        if target >= self.players.len() {
            return Err(RuleViolation::InvalidPlayer(target));
        }
        if self.clue_tokens < self.variant.adjusted_clue_tokens(1) {
            return Err(RuleViolation::NoClueTokens);
        }

        let valid = match clue {
            Clue::Color(suit) => suit < self.variant.suits.len(),
            Clue::Rank(rank) => (1..=MAX_RANK).contains(&rank),
        };
        if !valid {
            return Err(RuleViolation::InvalidClue);
        }

        let touches = self.players[target].hand.iter().any(|order| {
            let card = &self.deck[*order];
            match clue {
                Clue::Color(suit) => card.suit_index == suit,
                Clue::Rank(rank) => card.rank == rank,
            }
        });
        if !touches {
            return Err(RuleViolation::ClueTouchesNothing);
        }
        Ok(())
    }

    fn play(&mut self, player: usize, position: usize) {
        let order = self.players[player].hand.remove(position);
        let suit = self.deck[order].suit_index;
        let rank = self.deck[order].rank;

        if is_playable(self.directions[suit], self.stacks[suit], rank) {
            self.deck[order].played = true;
            self.stacks[suit] = rank;
            self.score += 1;
            self.directions[suit] = direction_after_play(self.directions[suit], rank);
            if self.directions[suit] == StackDirection::Finished {
                self.gain_clue_unit();
            }
        } else {
            self.deck[order].discarded = true;
            self.strikes += 1;
        }

        self.draw(player);
    }

    fn discard(&mut self, player: usize, position: usize) {
        let order = self.players[player].hand.remove(position);
        self.deck[order].discarded = true;
        self.gain_clue_unit();
        self.draw(player);
    }

    fn gain_clue_unit(&mut self) {
        self.clue_tokens = (self.clue_tokens + 1).min(self.variant.max_clue_tokens());
    }

    fn draw(&mut self, player: usize) {
        if self.deck_index >= self.deck.len() {
            return;
        }

        self.players[player].hand.push(self.deck_index);
        self.deck_index += 1;

        // All or nothing games keep going until a perfect score or a softlock
        if self.deck_index == self.deck.len()
            && !self.options.all_or_nothing
            && self.end_turn.is_none()
        {
            self.end_turn = Some(self.turn + self.players.len() as u32 + 1);
        }
    }

    fn finish_turn(&mut self) {
        self.refresh_reachability();
        self.turn += 1;
        self.active_player = (self.active_player + 1) % self.players.len();
    }

    /// Flag provably dead cards and recompute the achievable max score.
    fn refresh_reachability(&mut self) {
        for order in 0..self.deck.len() {
            let card = &self.deck[order];
            if card.is_gone() || card.cannot_be_played {
                continue;
            }
            let suit = card.suit_index;
            if is_dead(
                &self.deck,
                suit,
                self.directions[suit],
                self.stacks[suit],
                card.rank,
            ) {
                self.deck[order].cannot_be_played = true;
            }
        }

        self.max_score = (0..self.stacks.len())
            .map(|suit| suit_max_score(&self.deck, suit, self.directions[suit]))
            .sum();
    }

    fn any_suit_reachable(&self) -> bool {
        self.directions
            .iter()
            .zip(&self.stacks)
            .enumerate()
            .any(|(suit, (direction, top))| {
                next_ranks(*direction, *top).into_iter().any(|rank| {
                    self.deck.iter().any(|card| {
                        card.suit_index == suit
                            && card.rank == rank
                            && !card.is_gone()
                            && !card.cannot_be_played
                    })
                })
            })
    }

    // -------------
    // Hypotheticals
    // -------------

    /// Enter a hypothetical branching off the authoritative game at `turn`.
    pub fn start_hypothetical(&mut self, turn: u32) -> Result<(), RuleViolation> {
        if !self.is_ended() {
            return Err(RuleViolation::HypotheticalUnavailable);
        }
        if self.hypothetical.is_some() {
            return Err(RuleViolation::AlreadyInHypothetical);
        }
        if turn > self.turn {
            return Err(RuleViolation::InvalidTurn(turn));
        }

        let game = self.replay_to(turn)?;
        self.hypothetical = Some(Box::new(Hypothetical {
            base_turn: turn,
            game,
            actions: Vec::new(),
        }));
        Ok(())
    }

    /// Apply a turn action to the hypothetical branch only.
    pub fn hypothetical_action(&mut self, action: GameAction) -> Result<(), RuleViolation> {
        let hypothetical = self
            .hypothetical
            .as_mut()
            .ok_or(RuleViolation::NotInHypothetical)?;
        if !action.is_turn_action() {
            return Err(RuleViolation::InvalidAction);
        }

        hypothetical.game.apply(action.clone())?;
        hypothetical.actions.push(action);
        Ok(())
    }

    /// Undo the last hypothetical action.
    pub fn hypothetical_back(&mut self) -> Result<(), RuleViolation> {
        let hypothetical = self
            .hypothetical
            .as_ref()
            .ok_or(RuleViolation::NotInHypothetical)?;
        if hypothetical.actions.is_empty() {
            return Err(RuleViolation::NothingToUndo);
        }

        let base_turn = hypothetical.base_turn;
        let mut actions = hypothetical.actions.clone();
        actions.pop();

        let mut game = self.replay_to(base_turn)?;
        for action in &actions {
            game.apply(action.clone())?;
        }
        self.hypothetical = Some(Box::new(Hypothetical {
            base_turn,
            game,
            actions,
        }));
        Ok(())
    }

    pub fn end_hypothetical(&mut self) -> Result<(), RuleViolation> {
        self.hypothetical
            .take()
            .map(|_| ())
            .ok_or(RuleViolation::NotInHypothetical)
    }

    pub fn is_hypothetical(&self) -> bool {
        self.hypothetical.is_some()
    }

    /// The scratch game of the current hypothetical.
    pub fn hypothetical(&self) -> Option<&Game> {
        self.hypothetical.as_ref().map(|h| &h.game)
    }

    pub fn hypothetical_actions(&self) -> &[GameAction] {
        self.hypothetical
            .as_ref()
            .map_or(&[], |h| h.actions.as_slice())
    }

    /// A fresh copy of this game with the authoritative turn actions replayed
    /// up to `turn`.
    fn replay_to(&self, turn: u32) -> Result<Game, RuleViolation> {
        let options = GameOptions {
            timed: false,
            ..self.options.clone()
        };
        let mut scratch = Game::with_deck(
            self.variant.clone(),
            options,
            self.player_names(),
            self.seed.clone(),
            self.identities(),
        )?;
        scratch.start()?;

        for action in self.actions.iter().filter(|a| a.is_turn_action()) {
            if scratch.turn >= turn || scratch.is_ended() {
                break;
            }
            scratch.apply(action.clone())?;
        }
        Ok(scratch)
    }

    // ----
    // Tags
    // ----

    /// Add a tag; returns its normalised form.
    pub fn add_tag(&mut self, user_id: UserId, tag: &str) -> Result<String, RuleViolation> {
        let tag = normalize_tag(tag)?;
        if self.tags.contains_key(&tag) {
            return Err(RuleViolation::TagExists(tag));
        }
        self.tags.insert(tag.clone(), user_id);
        Ok(tag)
    }

    /// Remove a tag. Only its author may do so.
    pub fn remove_tag(&mut self, user_id: UserId, tag: &str) -> Result<String, RuleViolation> {
        let tag = normalize_tag(tag)?;
        match self.tags.get(&tag) {
            None => Err(RuleViolation::TagNotFound(tag)),
            Some(author) if *author != user_id => Err(RuleViolation::NotTagAuthor),
            Some(_) => {
                self.tags.remove(&tag);
                Ok(tag)
            }
        }
    }

    // -------
    // Getters
    // -------

    pub fn status(&self) -> GameStatus {
        if self.end_condition.is_terminal() {
            GameStatus::Ended(self.end_condition)
        } else if !self.started {
            GameStatus::NotStarted
        } else if self.paused {
            GameStatus::Paused
        } else {
            GameStatus::Running
        }
    }

    pub fn variant(&self) -> &Arc<Variant> {
        &self.variant
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn players(&self) -> &[GamePlayer] {
        &self.players
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn hand(&self, seat: usize) -> &[usize] {
        self.players.get(seat).map_or(&[], |p| p.hand.as_slice())
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn card(&self, order: usize) -> Option<&Card> {
        self.deck.get(order)
    }

    pub fn identities(&self) -> Vec<CardIdentity> {
        self.deck.iter().map(Card::identity).collect()
    }

    pub fn deck_index(&self) -> usize {
        self.deck_index
    }

    pub fn cards_left(&self) -> usize {
        self.deck.len() - self.deck_index
    }

    pub fn stacks(&self) -> &[u8] {
        &self.stacks
    }

    pub fn directions(&self) -> &[StackDirection] {
        &self.directions
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn active_player(&self) -> usize {
        self.active_player
    }

    pub fn clue_tokens(&self) -> u32 {
        self.clue_tokens
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    pub fn end_condition(&self) -> EndCondition {
        self.end_condition
    }

    pub fn end_player(&self) -> Option<usize> {
        self.end_player
    }

    pub fn end_turn(&self) -> Option<u32> {
        self.end_turn
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.end_condition.is_terminal()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause_player(&self) -> Option<usize> {
        self.pause_player
    }

    pub fn pause_count(&self) -> u32 {
        self.pause_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    pub fn tags(&self) -> &BTreeMap<String, UserId> {
        &self.tags
    }

    pub fn datetime_started(&self) -> Option<DateTime<Utc>> {
        self.datetime_started
    }

    pub fn datetime_finished(&self) -> Option<DateTime<Utc>> {
        self.datetime_finished
    }
}

fn normalize_tag(tag: &str) -> Result<String, RuleViolation> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return Err(RuleViolation::EmptyTag);
    }
    Ok(tag)
}

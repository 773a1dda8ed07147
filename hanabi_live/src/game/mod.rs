//! Hanabi rules engine.
//!
//! This module provides:
//! - Card and deck model with seeded shuffles
//! - Variant definitions and the read-only variant registry
//! - Direction-aware stack reachability (reversed and "Up or Down" suits)
//! - The game state machine: turns, clue tokens, strikes, pausing,
//!   end-condition evaluation, hypotheticals and tags
//! - Snapshots, persisted records and per-seat views

pub mod actions;
pub mod card;
pub mod constants;
pub mod errors;
pub mod stacks;
pub mod state_machine;
pub mod variant;
pub mod views;

pub use actions::{Clue, GameAction};
pub use card::{Card, CardIdentity};
pub use errors::RuleViolation;
pub use stacks::StackDirection;
pub use state_machine::{EndCondition, Game, GameOptions, GamePlayer, GameStatus, hand_size};
pub use variant::{Suit, Variant, VariantError, VariantRegistry};
pub use views::{CardView, GameSnapshot, GameView, PlayerView};

//! Table options chosen at creation time.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use super::errors::TableError;
use crate::game::{
    GameOptions, Variant, VariantRegistry,
    constants::{MAX_PLAYERS, MIN_PLAYERS},
};

/// Longest starting time bank a timed table may ask for (one day)
pub const MAX_TIME_BASE_SECS: u64 = 24 * 60 * 60;

/// Longest per-turn increment a timed table may ask for (one hour)
pub const MAX_TIME_PER_TURN_SECS: u64 = 60 * 60;

/// Longest note a player may keep on a card
pub const MAX_NOTE_LENGTH: usize = 1000;

/// Table configuration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableOptions {
    pub name: String,

    /// Variant name, resolved through the variant registry
    pub variant: String,

    /// Seats (2-6)
    pub max_players: usize,

    /// Plain-text password as sent by the creator; hashed and cleared on
    /// creation, never serialized back out
    #[serde(skip_serializing)]
    pub password: Option<String>,

    pub speedrun: bool,
    pub all_or_nothing: bool,
    pub one_extra_card: bool,
    pub one_less_card: bool,

    /// Whether turns are timed
    pub timed: bool,

    /// Starting time bank per seat, in seconds
    pub time_base_secs: u64,

    /// Added to a seat's bank after each of its turns, in seconds
    pub time_per_turn_secs: u64,

    /// Deal from a chosen seed instead of a random one
    pub seed: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            name: "New Table".to_string(),
            variant: "No Variant".to_string(),
            max_players: 5,
            password: None,
            speedrun: false,
            all_or_nothing: false,
            one_extra_card: false,
            one_less_card: false,
            timed: false,
            time_base_secs: 120,
            time_per_turn_secs: 20,
            seed: None,
        }
    }
}

impl TableOptions {
    /// Validate the options and resolve the variant.
    pub fn validate(&self, variants: &VariantRegistry) -> Result<Arc<Variant>, TableError> {
        if self.name.trim().is_empty() {
            return Err(TableError::InvalidOptions("table name is empty".to_string()));
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(TableError::InvalidOptions(format!(
                "max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            )));
        }

        if self.one_extra_card && self.one_less_card {
            return Err(TableError::InvalidOptions(
                "one extra card and one less card are exclusive".to_string(),
            ));
        }

        if self.timed && self.time_base_secs == 0 {
            return Err(TableError::InvalidOptions(
                "timed games need a time base".to_string(),
            ));
        }

        if self.time_base_secs > MAX_TIME_BASE_SECS {
            return Err(TableError::InvalidOptions(format!(
                "time base must be at most {MAX_TIME_BASE_SECS} seconds"
            )));
        }

        if self.time_per_turn_secs > MAX_TIME_PER_TURN_SECS {
            return Err(TableError::InvalidOptions(format!(
                "time per turn must be at most {MAX_TIME_PER_TURN_SECS} seconds"
            )));
        }

        Ok(variants.get(&self.variant)?)
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            speedrun: self.speedrun,
            all_or_nothing: self.all_or_nothing,
            one_extra_card: self.one_extra_card,
            one_less_card: self.one_less_card,
            timed: self.timed,
        }
    }

    pub fn time_base(&self) -> Duration {
        Duration::from_secs(self.time_base_secs)
    }

    pub fn time_per_turn(&self) -> Duration {
        Duration::from_secs(self.time_per_turn_secs)
    }
}

/// Argon2id hash of a table password
pub fn hash_password(password: &str) -> Result<String, TableError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| TableError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| TableError::PasswordHash(e.to_string()))?
        .to_string())
}

/// Check a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        log::error!("Invalid table password hash format");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

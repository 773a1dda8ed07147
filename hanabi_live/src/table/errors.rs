use thiserror::Error;

use super::models::TableId;
use crate::game::{RuleViolation, VariantError};

/// Reasons a table request is rejected.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableError {
    #[error("table {0} does not exist")]
    NotFound(TableId),
    #[error("table is full")]
    Full,
    #[error("game already started")]
    AlreadyStarted,
    #[error("wrong password")]
    WrongPassword,
    #[error("only the table owner can do that")]
    NotOwner,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("already at this table")]
    AlreadyJoined,
    #[error("someone named \"{0}\" already sits at this table")]
    NameTaken(String),
    #[error("already spectating this table")]
    AlreadySpectating,
    #[error("not at this table")]
    NotAtTable,
    #[error("not spectating this table")]
    NotSpectating,
    #[error("can't leave a game in progress; terminate it instead")]
    GameInProgress,
    #[error("no game at this table")]
    NoGame,
    #[error("replays are read-only")]
    Replay,
    #[error("card {0} does not exist")]
    NoSuchCard(usize),
    #[error("notes must be {0} characters or less")]
    NoteTooLong(usize),
    #[error("invalid table options: {0}")]
    InvalidOptions(String),
    #[error("failed to hash the table password: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Variant(#[from] VariantError),
    #[error(transparent)]
    Rule(#[from] RuleViolation),
}

pub type TableResult<T> = Result<T, TableError>;

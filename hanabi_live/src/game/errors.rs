use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An action that is illegal under the current game state.
///
/// Always raised before any mutation, so a rejected action leaves the game
/// exactly as it was.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum RuleViolation {
    #[error("game has not started")]
    NotStarted,
    #[error("game already started")]
    AlreadyStarted,
    #[error("game is over")]
    GameEnded,
    #[error("game is paused")]
    Paused,
    #[error("game is not paused")]
    NotPaused,
    #[error("game is already paused")]
    AlreadyPaused,
    #[error("pausing is only available in timed games")]
    PauseUnavailable,
    #[error("not your turn")]
    OutOfTurn,
    #[error("no player in seat {0}")]
    InvalidPlayer(usize),
    #[error("need {min}-{max} players, got {got}")]
    PlayerCount { got: usize, min: usize, max: usize },
    #[error("card {0} is not in your hand")]
    CardNotInHand(usize),
    #[error("no clue tokens available")]
    NoClueTokens,
    #[error("can't discard at the clue token maximum")]
    MaxClueTokens,
    #[error("can't clue yourself")]
    ClueSelf,
    #[error("invalid clue")]
    InvalidClue,
    #[error("clue must touch at least one card")]
    ClueTouchesNothing,
    #[error("deck of {0} cards can't deal this game")]
    InvalidDeck(usize),
    #[error("snapshot does not match the variant")]
    InvalidSnapshot,
    #[error("action not allowed here")]
    InvalidAction,
    #[error("hypotheticals are only available after the game")]
    HypotheticalUnavailable,
    #[error("already in a hypothetical")]
    AlreadyInHypothetical,
    #[error("not in a hypothetical")]
    NotInHypothetical,
    #[error("no hypothetical action to undo")]
    NothingToUndo,
    #[error("turn {0} does not exist")]
    InvalidTurn(u32),
    #[error("tag is empty")]
    EmptyTag,
    #[error("tag \"{0}\" already exists")]
    TagExists(String),
    #[error("tag \"{0}\" does not exist")]
    TagNotFound(String),
    #[error("only the author can delete a tag")]
    NotTagAuthor,
}

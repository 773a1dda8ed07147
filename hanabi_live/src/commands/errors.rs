use thiserror::Error;

/// Why an inbound command was rejected before reaching any domain.
///
/// The display text is what the user sees.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum CommandError {
    #[error("Your command was not valid JSON.")]
    Malformed,
    #[error("The command \"{0}\" does not exist.")]
    UnknownCommand(String),
    #[error("Your client is out of date; please refresh the page.")]
    IncompatibleVersion,
    #[error("Your \"{0}\" command contained invalid data.")]
    InvalidData(String),
    #[error("{0}")]
    Rejected(String),
}

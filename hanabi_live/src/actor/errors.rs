//! Manager error types.

use thiserror::Error;

/// Errors returned to callers of a [`Manager`](super::Manager)
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ManagerError {
    /// The manager began shutting down before the request was submitted
    #[error("{0} manager is closed to new requests")]
    Closed(&'static str),

    /// The handler finished without writing the reply slot
    #[error("{0} manager dropped the reply to a request")]
    NoReply(&'static str),
}

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

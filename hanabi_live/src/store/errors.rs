use thiserror::Error;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    #[error("game {0} not found")]
    NotFound(u64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

//! Terminal subsystem errors
//!
//! Expected negative outcomes (no such record, wrong state) are typed
//! variants; only `Storage` represents a real failure.

use crate::db::repository::RepoError;
use shared::AppError;
use thiserror::Error;

/// What a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Terminal,
    Payment,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Terminal => write!(f, "Terminal"),
            Entity::Payment => write!(f, "Payment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TerminalError {
    /// Absent, or present in another store (the two are never distinguished)
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("No free pairing code available")]
    CodeSpaceExhausted,

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type TerminalResult<T> = Result<T, TerminalError>;

impl From<TerminalError> for AppError {
    fn from(err: TerminalError) -> Self {
        match err {
            TerminalError::NotFound(Entity::Terminal) => AppError::terminal_not_found(),
            TerminalError::NotFound(Entity::Payment) => AppError::payment_not_found(),
            TerminalError::InvalidState(msg) => AppError::payment_not_pending(msg),
            TerminalError::Validation(msg) => AppError::validation(msg),
            TerminalError::CodeSpaceExhausted => AppError::internal("No free pairing code available"),
            TerminalError::Storage(e) => AppError::database(e.to_string()),
        }
    }
}

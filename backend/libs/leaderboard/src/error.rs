//! Leaderboard error types

use thiserror::Error;

/// Failure reported by an ordered score store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Score overflow for member {0}")]
    Overflow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Member not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Inconsistent score for {member}: expected {expected}, store reported {actual}")]
    Inconsistent {
        member: String,
        expected: i64,
        actual: i64,
    },
}

impl LeaderboardError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LeaderboardError::StoreUnavailable(_) => "store_unavailable",
            LeaderboardError::NotFound(_) => "not_found",
            LeaderboardError::InvalidArgument(_) => "invalid_argument",
            LeaderboardError::Inconsistent { .. } => "inconsistent",
        }
    }
}

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

//! Error types for the recalculation service

use thiserror::Error;

use crate::phase::RecalcPhase;

/// Result type alias for recalculation operations
pub type Result<T> = std::result::Result<T, RecalcError>;

#[derive(Error, Debug)]
pub enum RecalcError {
    #[error("Store error: {0}")]
    Store(#[from] league_store::StoreError),

    #[error("League error: {0}")]
    League(#[from] league_engine::LeagueError),

    #[error("Recalculation cancelled before {0}")]
    Cancelled(RecalcPhase),

    #[error("Recalculation exceeded its {0}s time limit")]
    TimedOut(u64),

    #[error("A recalculation is already running")]
    AlreadyRunning,

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: RecalcPhase, to: RecalcPhase },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl RecalcError {
    /// Create a new configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether re-running the recalculation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecalcError::Store(_) | RecalcError::TimedOut(_) | RecalcError::Cancelled(_) | RecalcError::AlreadyRunning
        )
    }
}

//! Error and warning types for the league engine

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for league engine operations
pub type Result<T> = std::result::Result<T, LeagueError>;

/// Errors that stop a computation outright
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeagueError {
    #[error("Invalid award period {id}: start week {start_week} is after end week {end_week}")]
    InvalidAwardPeriod { id: String, start_week: u32, end_week: u32 },

    #[error("Duplicate award period id: {0}")]
    DuplicateAwardPeriod(String),

    #[error("Invalid prize configuration: {0}")]
    InvalidPrizeConfig(String),

    #[error("Prize fund exhausted: deductions of {deductions} exceed the total pool of {total_pool}")]
    PrizeFundExhausted { total_pool: String, deductions: String },

    #[error("Invalid match record: {0}")]
    InvalidMatch(String),
}

impl LeagueError {
    /// Create a new invalid prize configuration error
    pub fn invalid_prize_config(msg: impl Into<String>) -> Self {
        Self::InvalidPrizeConfig(msg.into())
    }

    /// Create a new invalid match error
    pub fn invalid_match(msg: impl Into<String>) -> Self {
        Self::InvalidMatch(msg.into())
    }
}

/// Conditions that are recovered locally: the offending record is skipped
/// and the rest of the league keeps being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LeagueWarning {
    /// A match or prediction names a team or user that does not exist
    MissingReference { record: String, reference: String },

    /// A prediction without exactly 20 ranked teams
    IncompletePrediction { user_id: String, entries: usize },

    /// Static configuration that only resolves on a best-effort basis
    ConfigurationInconsistency { detail: String },

    /// A stored document that could not be decoded into its typed record
    MalformedDocument { collection: String, id: String, reason: String },
}

impl LeagueWarning {
    pub fn missing_reference(record: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::MissingReference { record: record.into(), reference: reference.into() }
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::ConfigurationInconsistency { detail: detail.into() }
    }

    pub fn malformed(
        collection: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedDocument {
            collection: collection.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LeagueWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeagueWarning::MissingReference { record, reference } => {
                write!(f, "{record} references unknown id {reference}; skipped")
            }
            LeagueWarning::IncompletePrediction { user_id, entries } => {
                write!(
                    f,
                    "prediction for user {user_id} has {entries} teams instead of 20; user excluded from scoring"
                )
            }
            LeagueWarning::ConfigurationInconsistency { detail } => {
                write!(f, "configuration inconsistency: {detail}")
            }
            LeagueWarning::MalformedDocument { collection, id, reason } => {
                write!(f, "malformed document {collection}/{id} quarantined: {reason}")
            }
        }
    }
}

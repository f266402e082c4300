//! # Recalculation Service
//!
//! Rebuilds every derived league collection from raw match results and
//! predictions. The orchestrator is shared by two adapters: the
//! `league-recalc` binary and [`AdminTrigger`] for client-initiated runs.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod phase;
pub mod progress;
pub mod trigger;
pub mod writer;

#[cfg(test)]
mod tests;

pub use codec::{collections, decode_documents, StoredUser};
pub use config::{load_config, save_config, validate_config, LoggingConfig, RecalcSettings, ServiceConfig};
pub use error::{RecalcError, Result};
pub use logging::{initialize_logging, initialize_logging_with_config};
pub use orchestrator::{RecalcReport, RecalculationOrchestrator};
pub use phase::{PhaseTracker, RecalcPhase};
pub use progress::{ProgressReporter, TracingProgress};
pub use trigger::AdminTrigger;
pub use writer::{BatchWriter, FlushStats};

/// Current version of the recalculation service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

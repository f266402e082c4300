//! # League Engine
//!
//! Deterministic derivation of everything the prediction league shows from
//! two raw inputs: match results and users' predicted final tables.
//!
//! The engine replays the season week by week. Each processed week rebuilds
//! the team table, ranks it, scores every complete prediction against those
//! ranks and ranks the users. From the replay it resolves the most-improved
//! awards per calendar period and allocates the prize fund.
//!
//! Nothing here performs I/O. Persisting the results is the job of the
//! recalculation service.

pub mod awards;
pub mod baseline;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod ranking;
pub mod scoring;
pub mod standings;
pub mod summary;
pub mod winnings;


pub use awards::resolve_awards;
pub use baseline::{resolve_baseline, BaselineRanks};
pub use config::{BaselineEntry, PrizeConfig, SeasonConfig};
pub use error::{LeagueError, LeagueWarning, Result};
pub use history::{rank_tracks, HistoryBuilder, HistoryInputs, SeasonHistory, UserStanding, UserTrack};
pub use models::*;
pub use ranking::{competition_rank, rank_map, RankedEntry};
pub use scoring::{score_prediction, team_points, PredictionScore, TeamContribution};
pub use standings::{calculate_standings, partition_known_matches, recent_form, StandingsTable, TeamStats};
pub use summary::summarize_history;
pub use winnings::{allocate_winnings, place_prizes, UserWinnings, WinningsReport};

/// Current version of the league engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

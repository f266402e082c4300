//! Full league recalculation
//!
//! A run reads the raw collections, deletes every derived collection,
//! replays the season in memory and writes the derived documents back in
//! batches. The run is not transactional: a failure part-way leaves the
//! batches already committed in place, and the remedy is to run again.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use league_engine::{
    allocate_winnings, resolve_awards, HistoryBuilder, HistoryInputs, LeagueError, LeagueWarning, Match,
    MonthlyAward, Prediction, PrizeConfig, SeasonConfig, SeasonHistory, Team, User, Week,
};
use league_store::DocumentStore;

use crate::codec::{collections, decode_documents, encode};
use crate::config::{RecalcSettings, ServiceConfig};
use crate::error::{RecalcError, Result};
use crate::phase::{PhaseTracker, RecalcPhase};
use crate::progress::{ProgressReporter, TracingProgress};
use crate::writer::BatchWriter;

/// Derived user fields, cleared on users who are no longer ranked
const SUMMARY_FIELDS: [&str; 10] = [
    "score",
    "rank",
    "previousScore",
    "previousRank",
    "scoreChange",
    "rankChange",
    "highestScore",
    "lowestScore",
    "highestRank",
    "lowestRank",
];

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcReport {
    pub weeks_processed: Vec<Week>,
    pub latest_week: Week,
    pub users_ranked: usize,
    pub awards: Vec<MonthlyAward>,
    /// Award documents present before the run
    pub previous_awards: usize,
    pub documents_written: usize,
    pub documents_deleted: usize,
    pub warnings: Vec<LeagueWarning>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RecalcReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Raw league data read in the fetching phase
struct RawLeague {
    teams: Vec<Team>,
    matches: Vec<Match>,
    users: Vec<User>,
    predictions: Vec<Prediction>,
    previous_awards: usize,
}

pub struct RecalculationOrchestrator {
    store: Arc<dyn DocumentStore>,
    season: SeasonConfig,
    prizes: PrizeConfig,
    settings: RecalcSettings,
    run_timeout: Duration,
    progress: Arc<dyn ProgressReporter>,
    phase: PhaseTracker,
}

impl RecalculationOrchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, config: &ServiceConfig) -> Self {
        Self {
            store,
            season: config.season.clone(),
            prizes: config.prizes.clone(),
            settings: config.recalculation.clone(),
            run_timeout: config.recalculation.run_timeout(),
            progress: Arc::new(TracingProgress),
            phase: PhaseTracker::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn phase(&self) -> RecalcPhase {
        self.phase.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecalcPhase> {
        self.phase.subscribe()
    }

    /// Run one full recalculation.
    ///
    /// `cancel` is honoured between phases only. The whole run is bounded by
    /// the configured time limit.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RecalcReport> {
        self.phase.start()?;

        info!("Starting league recalculation");
        let outcome = match tokio::time::timeout(self.run_timeout, self.execute(&cancel)).await {
            Ok(result) => result,
            Err(_) => Err(RecalcError::TimedOut(self.run_timeout.as_secs())),
        };

        match outcome {
            Ok(report) => {
                info!(
                    "Recalculation complete: {} weeks, {} users, {} awards, {} written, {} deleted in {}ms",
                    report.weeks_processed.len(),
                    report.users_ranked,
                    report.awards.len(),
                    report.documents_written,
                    report.documents_deleted,
                    report.elapsed().num_milliseconds()
                );
                Ok(report)
            }
            // Another run owns the phase; leave it alone.
            Err(e @ (RecalcError::AlreadyRunning | RecalcError::InvalidTransition { .. })) => {
                warn!("Recalculation aborted: {}", e);
                Err(e)
            }
            Err(e) => {
                let failed_in = self.phase.current();
                self.phase.fail();
                error!("Recalculation failed during {}: {}", failed_in, e);
                self.progress.report(&format!("Recalculation failed during {failed_in}: {e}"));
                Err(e)
            }
        }
    }

    fn enter(&self, phase: RecalcPhase, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            warn!("Recalculation cancelled before {}", phase);
            return Err(RecalcError::Cancelled(phase));
        }
        self.phase.transition(phase)?;
        self.progress.report(&format!("Recalculation: {phase}"));
        Ok(())
    }

    fn record_warnings(&self, warnings: &mut Vec<LeagueWarning>, new: Vec<LeagueWarning>) {
        for warning in &new {
            self.progress.report(&warning.to_string());
        }
        warnings.extend(new);
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<RecalcReport> {
        let started_at = Utc::now();
        let mut warnings = Vec::new();

        // `run` has already moved the phase to Fetching.
        if cancel.is_cancelled() {
            warn!("Recalculation cancelled before {}", RecalcPhase::Fetching);
            return Err(RecalcError::Cancelled(RecalcPhase::Fetching));
        }
        self.progress.report(&format!("Recalculation: {}", RecalcPhase::Fetching));
        let (raw, decode_warnings) = self.fetch().await?;
        self.record_warnings(&mut warnings, decode_warnings);
        info!(
            "Fetched {} teams, {} matches, {} users, {} predictions",
            raw.teams.len(),
            raw.matches.len(),
            raw.users.len(),
            raw.predictions.len()
        );

        self.enter(RecalcPhase::Clearing, cancel)?;
        let documents_deleted = self.clear_derived().await?;

        self.enter(RecalcPhase::BuildingHistory, cancel)?;
        let mut history = HistoryBuilder::new().build(HistoryInputs {
            teams: &raw.teams,
            matches: &raw.matches,
            users: &raw.users,
            predictions: &raw.predictions,
            season: &self.season,
        });
        let history_warnings = std::mem::take(&mut history.warnings);
        self.record_warnings(&mut warnings, history_warnings);

        let mut writer = self.writer();

        self.enter(RecalcPhase::WritingUsers, cancel)?;
        self.queue_league_documents(&mut writer, &history, &raw.users)?;

        self.enter(RecalcPhase::ResolvingAwards, cancel)?;
        let awards = resolve_awards(&self.season.award_periods, &history.tracks, history.latest_week());
        for award in &awards {
            writer.upsert(collections::MONTHLY_AWARDS, award.id(), encode(award)?);
        }
        match allocate_winnings(&history.final_standings, &awards, &self.season.award_periods, &self.prizes) {
            Ok(winnings) => {
                for user in &winnings.users {
                    writer.upsert(collections::WINNINGS, user.user_id.clone(), encode(&user.rounded())?);
                }
            }
            // Only the winnings are dropped; every other collection is still written.
            Err(e @ LeagueError::PrizeFundExhausted { .. }) => {
                let warning = LeagueWarning::configuration(format!("winnings skipped: {e}"));
                warn!("{}", warning);
                self.record_warnings(&mut warnings, vec![warning]);
            }
            Err(e) => return Err(e.into()),
        }

        self.enter(RecalcPhase::Committing, cancel)?;
        let stats = writer.flush(self.progress.as_ref()).await?;

        self.phase.transition(RecalcPhase::Done)?;
        self.progress.report("Recalculation: done");

        Ok(RecalcReport {
            latest_week: history.latest_week(),
            weeks_processed: history.weeks,
            users_ranked: history.tracks.len(),
            awards,
            previous_awards: raw.previous_awards,
            documents_written: stats.upserts,
            documents_deleted,
            warnings,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn writer(&self) -> BatchWriter {
        BatchWriter::new(
            self.store.clone(),
            self.settings.batch_size,
            self.settings.progress_every_batches,
        )
    }

    async fn fetch(&self) -> Result<(RawLeague, Vec<LeagueWarning>)> {
        let store = self.store.as_ref();
        let (teams, matches, users, predictions, awards) = tokio::try_join!(
            store.fetch_all(collections::TEAMS),
            store.fetch_all(collections::MATCHES),
            store.fetch_all(collections::USERS),
            store.fetch_all(collections::PREDICTIONS),
            store.fetch_all(collections::MONTHLY_AWARDS),
        )?;

        let mut warnings = Vec::new();
        let (teams, w) = decode_documents(collections::TEAMS, teams, Some("id"));
        warnings.extend(w);
        let (matches, w) = decode_documents(collections::MATCHES, matches, None);
        warnings.extend(w);
        let (users, w) = decode_documents(collections::USERS, users, Some("id"));
        warnings.extend(w);
        let (predictions, w) = decode_documents(collections::PREDICTIONS, predictions, Some("userId"));
        warnings.extend(w);

        let raw = RawLeague { teams, matches, users, predictions, previous_awards: awards.len() };
        Ok((raw, warnings))
    }

    async fn clear_derived(&self) -> Result<usize> {
        let mut writer = self.writer();
        for collection in collections::DERIVED {
            let documents = self.store.fetch_all(collection).await?;
            for document in documents {
                writer.delete(collection, document.id);
            }
        }

        let queued = writer.pending();
        let stats = writer.flush(self.progress.as_ref()).await?;
        info!("Cleared {} derived documents in {} batches", queued, stats.batches);
        Ok(stats.deletes)
    }

    fn queue_league_documents(
        &self,
        writer: &mut BatchWriter,
        history: &SeasonHistory,
        users: &[User],
    ) -> Result<()> {
        let summaries = history.summaries();
        for (user_id, summary) in &summaries {
            writer.merge(collections::USERS, user_id.clone(), encode(summary)?);
        }

        let ranked: HashSet<&str> = summaries.iter().map(|(id, _)| id.as_str()).collect();
        for user in users.iter().filter(|u| !ranked.contains(u.id.as_str())) {
            let cleared: Map<String, Value> =
                SUMMARY_FIELDS.iter().map(|field| (field.to_string(), Value::Null)).collect();
            writer.merge(collections::USERS, user.id.clone(), Value::Object(cleared));
        }

        for user_history in history.user_histories() {
            writer.upsert(collections::USER_HISTORIES, user_history.user_id.clone(), encode(&user_history)?);
        }
        for standing in &history.current_standings {
            writer.upsert(collections::STANDINGS, standing.team_id.clone(), encode(standing)?);
        }
        for weekly in &history.weekly_team_standings {
            writer.upsert(collections::WEEKLY_TEAM_STANDINGS, weekly.id(), encode(weekly)?);
        }
        for recent in &history.recent_results {
            writer.upsert(collections::TEAM_RECENT_RESULTS, recent.team_id.clone(), encode(recent)?);
        }
        for score in &history.player_team_scores {
            writer.upsert(collections::PLAYER_TEAM_SCORES, score.id(), encode(score)?);
        }

        Ok(())
    }
}

//! End-to-end tests for the recalculation service

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use league_engine::{BaselineEntry, LeagueWarning, Match, SeasonConfig};
use league_store::{CollectionData, Document, DocumentStore, InMemoryStore, StoreConfig, StoreError, WriteBatch};

use crate::codec::{collections, encode};
use crate::config::{RecalcSettings, ServiceConfig};
use crate::error::RecalcError;
use crate::orchestrator::RecalculationOrchestrator;
use crate::phase::RecalcPhase;
use crate::trigger::AdminTrigger;

fn team_ids() -> Vec<String> {
    (1..=20).map(|i| format!("t{i:02}")).collect()
}

fn test_config() -> ServiceConfig {
    let season = SeasonConfig {
        baseline: (1..=20).map(|i| BaselineEntry::new(&format!("Team {i:02}"), i)).collect(),
        promoted_teams: 0,
        ..Default::default()
    };
    ServiceConfig {
        store: StoreConfig { max_batch_ops: 50, ..Default::default() },
        recalculation: RecalcSettings { batch_size: 40, progress_every_batches: 1, ..Default::default() },
        season,
        ..Default::default()
    }
}

/// Twenty teams, two played weeks, one scheduled fixture and four users:
/// u1 predicts the baseline order, u2 (pro) its reverse, u3 sent an
/// incomplete prediction and u4 never predicted but carries stale scores.
async fn seeded_store(store: InMemoryStore) -> Arc<InMemoryStore> {
    let mut store = store;
    store.initialize().await.unwrap();

    for (i, id) in team_ids().iter().enumerate() {
        store.insert(collections::TEAMS, id.clone(), json!({"name": format!("Team {:02}", i + 1)})).await;
    }

    let matches = vec![
        Match::played(1, "t20", "t01", 3, 0),
        Match::played(1, "t05", "t06", 2, 2),
        Match::played(2, "t02", "t03", 1, 0),
        Match::scheduled(3, "t01", "t02"),
    ];
    for m in &matches {
        store.insert(collections::MATCHES, m.id(), encode(m).unwrap()).await;
    }

    store.insert(collections::USERS, "u1", json!({"name": "Ann", "firsts": 2})).await;
    store.insert(collections::USERS, "u2", json!({"name": "Pro Pete", "isPro": true})).await;
    store.insert(collections::USERS, "u3", json!({"name": "Cal"})).await;
    store.insert(collections::USERS, "u4", json!({"name": "Dee", "score": 77, "rank": 1})).await;

    let ordered = team_ids();
    let mut reversed = team_ids();
    reversed.reverse();
    store.insert(collections::PREDICTIONS, "u1", json!({"rankings": ordered})).await;
    store.insert(collections::PREDICTIONS, "u2", json!({"rankings": reversed})).await;
    store.insert(collections::PREDICTIONS, "u3", json!({"rankings": ["t01", "t02"]})).await;

    Arc::new(store)
}

async fn derived_snapshot(store: &InMemoryStore) -> Vec<(&'static str, CollectionData)> {
    let mut snapshot = Vec::new();
    for collection in collections::DERIVED.into_iter().chain([collections::USERS]) {
        snapshot.push((collection, store.snapshot(collection).await));
    }
    snapshot
}

/// Delays every read so a run stays in flight long enough to observe
struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

#[async_trait::async_trait]
impl DocumentStore for SlowStore {
    async fn initialize(&mut self) -> league_store::Result<()> {
        self.inner.initialize().await
    }

    async fn fetch_all(&self, collection: &str) -> league_store::Result<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_all(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> league_store::Result<()> {
        self.inner.commit(batch).await
    }

    fn max_batch_ops(&self) -> usize {
        self.inner.max_batch_ops()
    }
}

/// Fails every read of one collection
struct FailingReads {
    inner: Arc<InMemoryStore>,
    collection: &'static str,
}

#[async_trait::async_trait]
impl DocumentStore for FailingReads {
    async fn initialize(&mut self) -> league_store::Result<()> {
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> league_store::Result<Vec<Document>> {
        if collection == self.collection {
            return Err(StoreError::backend(format!("read of {collection} refused")));
        }
        self.inner.fetch_all(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> league_store::Result<()> {
        self.inner.commit(batch).await
    }

    fn max_batch_ops(&self) -> usize {
        self.inner.max_batch_ops()
    }
}

async fn slow_store(delay: Duration) -> Arc<SlowStore> {
    let mut store = SlowStore { inner: InMemoryStore::with_default_config(), delay };
    store.initialize().await.unwrap();
    Arc::new(store)
}

#[cfg(test)]
mod run_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_run_writes_every_collection() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());

        let report = tokio_test::assert_ok!(orchestrator.run(CancellationToken::new()).await);

        assert_eq!(report.weeks_processed, vec![0, 1, 2]);
        assert_eq!(report.latest_week, 2);
        assert_eq!(report.users_ranked, 2);
        assert_eq!(orchestrator.phase(), RecalcPhase::Done);

        assert_eq!(store.snapshot(collections::STANDINGS).await.len(), 20);
        assert_eq!(store.snapshot(collections::WEEKLY_TEAM_STANDINGS).await.len(), 60);
        assert_eq!(store.snapshot(collections::TEAM_RECENT_RESULTS).await.len(), 20);
        assert_eq!(store.snapshot(collections::PLAYER_TEAM_SCORES).await.len(), 40);
        assert_eq!(store.snapshot(collections::USER_HISTORIES).await.len(), 2);
        assert_eq!(store.snapshot(collections::WINNINGS).await.len(), 2);
        assert_eq!(store.snapshot(collections::MONTHLY_AWARDS).await.len(), report.awards.len());

        let leader = store.get(collections::STANDINGS, "t20").await.unwrap();
        assert_eq!(leader["points"], 3);
        assert_eq!(leader["rank"], 1);

        let form = store.get(collections::TEAM_RECENT_RESULTS, "t01").await.unwrap();
        assert_eq!(form["form"], json!(["-", "-", "-", "-", "-", "L"]));

        let history = store.get(collections::USER_HISTORIES, "u1").await.unwrap();
        assert_eq!(history["weeklyScores"].as_array().map(Vec::len), Some(3));
        assert_eq!(history["weeklyScores"][0]["score"], 100);

        assert!(report
            .warnings
            .contains(&LeagueWarning::IncompletePrediction { user_id: "u3".into(), entries: 2 }));
    }

    #[tokio::test]
    async fn test_user_summaries_are_merged() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());
        orchestrator.run(CancellationToken::new()).await.unwrap();

        let ann = store.get(collections::USERS, "u1").await.unwrap();
        assert_eq!(ann["name"], "Ann");
        assert_eq!(ann["firsts"], 2);
        assert!(ann["score"].is_i64());
        assert!(ann["rank"].is_u64());
        assert!(ann["previousScore"].as_i64().is_some());

        // No prediction: stale fields are cleared, the document survives.
        let dee = store.get(collections::USERS, "u4").await.unwrap();
        assert_eq!(dee["name"], "Dee");
        assert_eq!(dee["score"], Value::Null);
        assert_eq!(dee["rank"], Value::Null);
        assert_eq!(dee["highestRank"], Value::Null);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());

        orchestrator.run(CancellationToken::new()).await.unwrap();
        let first = derived_snapshot(&store).await;

        let report = orchestrator.run(CancellationToken::new()).await.unwrap();
        let second = derived_snapshot(&store).await;

        assert_eq!(first, second);
        assert_eq!(report.previous_awards, report.awards.len());
        assert!(report.documents_deleted > 0);
    }

    #[tokio::test]
    async fn test_stale_derived_documents_are_removed() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        store.insert(collections::STANDINGS, "relegated", json!({"points": 99})).await;
        store.insert(collections::PLAYER_TEAM_SCORES, "gone_t01", json!({"points": 5})).await;

        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());
        let report = orchestrator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(report.documents_deleted, 2);
        assert!(store.get(collections::STANDINGS, "relegated").await.is_none());
        assert!(store.get(collections::PLAYER_TEAM_SCORES, "gone_t01").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_documents_are_quarantined() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        store
            .insert(
                collections::MATCHES,
                "9_t01_t02",
                json!({"week": 9, "homeTeamId": "t01", "awayTeamId": "t02", "homeScore": -7, "awayScore": 0}),
            )
            .await;
        store.insert(collections::TEAMS, "t99", json!({"name": 42})).await;

        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());
        let report = orchestrator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(report.latest_week, 2);
        let quarantined: Vec<&str> = report
            .warnings
            .iter()
            .filter_map(|w| match w {
                LeagueWarning::MalformedDocument { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(quarantined, vec!["t99", "9_t01_t02"]);
        assert_eq!(store.snapshot(collections::STANDINGS).await.len(), 20);
    }

    #[tokio::test]
    async fn test_progress_messages_reach_observer() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config()).with_progress(Arc::new(tx));

        orchestrator.run(CancellationToken::new()).await.unwrap();

        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        assert_eq!(messages.first().map(String::as_str), Some("Recalculation: fetching"));
        assert_eq!(messages.last().map(String::as_str), Some("Recalculation: done"));
        assert!(messages.iter().any(|m| m.starts_with("Committed ")));
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_failure_marks_run_failed() {
        let store = seeded_store(InMemoryStore::new(test_config().store).fail_after(1)).await;
        store.insert(collections::STANDINGS, "relegated", json!({})).await;

        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());
        let err = tokio_test::assert_err!(orchestrator.run(CancellationToken::new()).await);

        assert!(matches!(err, RecalcError::Store(_)));
        assert!(err.is_retryable());
        assert_eq!(orchestrator.phase(), RecalcPhase::Failed);

        // The clearing batch went through before the failure.
        assert_eq!(store.commit_count(), 1);
        assert!(store.get(collections::STANDINGS, "relegated").await.is_none());
    }

    #[tokio::test]
    async fn test_run_after_failure_recovers() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(orchestrator.run(cancel).await.is_err());
        assert_eq!(orchestrator.phase(), RecalcPhase::Failed);

        orchestrator.run(CancellationToken::new()).await.unwrap();
        assert_eq!(orchestrator.phase(), RecalcPhase::Done);
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch_writes_nothing() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &test_config());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator.run(cancel).await.unwrap_err();

        assert!(matches!(err, RecalcError::Cancelled(RecalcPhase::Fetching)));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let store = slow_store(Duration::from_millis(200)).await;
        let orchestrator = RecalculationOrchestrator::new(store, &ServiceConfig::default())
            .with_run_timeout(Duration::from_millis(50));

        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, RecalcError::TimedOut(_)));
        assert_eq!(orchestrator.phase(), RecalcPhase::Failed);
    }

    #[tokio::test]
    async fn test_exhausted_prize_fund_keeps_league_data() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        RecalculationOrchestrator::new(store.clone(), &test_config())
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.snapshot(collections::WINNINGS).await.len(), 2);

        let mut config = test_config();
        config.prizes.total_pool = rust_decimal::Decimal::from(400);
        let orchestrator = RecalculationOrchestrator::new(store.clone(), &config);
        let report = orchestrator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(orchestrator.phase(), RecalcPhase::Done);
        assert_eq!(store.snapshot(collections::STANDINGS).await.len(), 20);
        assert_eq!(store.snapshot(collections::USER_HISTORIES).await.len(), 2);
        assert!(store.snapshot(collections::WINNINGS).await.is_empty());
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, LeagueWarning::ConfigurationInconsistency { detail } if detail.starts_with("winnings skipped"))));
    }

    #[tokio::test]
    async fn test_read_failure_fails_before_any_write() {
        let inner = seeded_store(InMemoryStore::new(test_config().store)).await;
        let store = Arc::new(FailingReads { inner: inner.clone(), collection: collections::PREDICTIONS });
        let orchestrator = RecalculationOrchestrator::new(store, &test_config());

        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, RecalcError::Store(StoreError::Backend(_))));
        assert_eq!(orchestrator.phase(), RecalcPhase::Failed);
        assert_eq!(inner.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_run_does_not_disturb_live_run() {
        let store = slow_store(Duration::from_millis(50)).await;
        let orchestrator = RecalculationOrchestrator::new(store, &ServiceConfig::default());

        let (first, second) = tokio::join!(
            orchestrator.run(CancellationToken::new()),
            orchestrator.run(CancellationToken::new())
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(RecalcError::AlreadyRunning)));
        assert_eq!(orchestrator.phase(), RecalcPhase::Done);
    }
}

#[cfg(test)]
mod trigger_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_trigger_is_rejected_while_running() {
        let store = slow_store(Duration::from_millis(100)).await;
        let orchestrator = Arc::new(RecalculationOrchestrator::new(store, &ServiceConfig::default()));
        let trigger = Arc::new(AdminTrigger::new(orchestrator));

        let first = {
            let trigger = trigger.clone();
            tokio::spawn(async move { trigger.trigger().await })
        };
        while !trigger.is_running() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(trigger.trigger().await, Err(RecalcError::AlreadyRunning)));
        assert!(trigger.cancel());

        let outcome = first.await.unwrap();
        assert!(matches!(outcome, Err(RecalcError::Cancelled(RecalcPhase::Clearing))));
        assert!(!trigger.is_running());
        assert!(!trigger.cancel());
    }

    #[tokio::test]
    async fn test_trigger_runs_to_completion() {
        let store = seeded_store(InMemoryStore::new(test_config().store)).await;
        let orchestrator = Arc::new(RecalculationOrchestrator::new(store.clone(), &test_config()));
        let trigger = AdminTrigger::new(orchestrator);
        let mut phases = trigger.subscribe();

        let report = trigger.trigger().await.unwrap();

        assert_eq!(report.users_ranked, 2);
        assert_eq!(*phases.borrow_and_update(), RecalcPhase::Done);
        assert!(!trigger.is_running());

        // Triggering again after completion is allowed.
        assert!(trigger.trigger().await.is_ok());
    }
}

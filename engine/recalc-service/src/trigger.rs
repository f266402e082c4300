//! Client-invoked recalculation entry point
//!
//! Admin tooling calls [`AdminTrigger::trigger`]; a second request while a
//! run is in flight is rejected instead of queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{RecalcError, Result};
use crate::orchestrator::{RecalcReport, RecalculationOrchestrator};
use crate::phase::RecalcPhase;

pub struct AdminTrigger {
    orchestrator: Arc<RecalculationOrchestrator>,
    running: AtomicBool,
    current: Mutex<Option<CancellationToken>>,
}

/// Clears the in-flight state even when the triggering future is dropped
struct InFlight<'a> {
    trigger: &'a AdminTrigger,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut current) = self.trigger.current.lock() {
            current.take();
        }
        self.trigger.running.store(false, Ordering::SeqCst);
    }
}

impl AdminTrigger {
    pub fn new(orchestrator: Arc<RecalculationOrchestrator>) -> Self {
        Self { orchestrator, running: AtomicBool::new(false), current: Mutex::new(None) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<RecalcPhase> {
        self.orchestrator.subscribe()
    }

    /// Run a recalculation unless one is already in flight
    pub async fn trigger(&self) -> Result<RecalcReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RecalcError::AlreadyRunning);
        }
        let _in_flight = InFlight { trigger: self };

        let token = CancellationToken::new();
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token.clone());
        }

        info!("Recalculation triggered by admin");
        self.orchestrator.run(token).await
    }

    /// Ask the in-flight run to stop at the next phase boundary.
    /// Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match self.current.lock() {
            Ok(current) => match current.as_ref() {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

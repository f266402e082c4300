//! Recalculation lifecycle

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

use crate::error::{RecalcError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecalcPhase {
    Idle,
    Fetching,
    Clearing,
    BuildingHistory,
    WritingUsers,
    ResolvingAwards,
    Committing,
    Done,
    Failed,
}

impl RecalcPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecalcPhase::Done | RecalcPhase::Failed)
    }

    /// Phase that follows this one on the success path
    pub fn next(self) -> Option<RecalcPhase> {
        use RecalcPhase::*;
        match self {
            Idle => Some(Fetching),
            Fetching => Some(Clearing),
            Clearing => Some(BuildingHistory),
            BuildingHistory => Some(WritingUsers),
            WritingUsers => Some(ResolvingAwards),
            ResolvingAwards => Some(Committing),
            Committing => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn can_transition_to(self, to: RecalcPhase) -> bool {
        match to {
            RecalcPhase::Failed => !self.is_terminal(),
            RecalcPhase::Idle => self.is_terminal() || self == RecalcPhase::Idle,
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for RecalcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecalcPhase::Idle => "idle",
            RecalcPhase::Fetching => "fetching",
            RecalcPhase::Clearing => "clearing",
            RecalcPhase::BuildingHistory => "building history",
            RecalcPhase::WritingUsers => "writing users",
            RecalcPhase::ResolvingAwards => "resolving awards",
            RecalcPhase::Committing => "committing",
            RecalcPhase::Done => "done",
            RecalcPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Publishes the current phase to any number of observers
#[derive(Debug)]
pub struct PhaseTracker {
    tx: watch::Sender<RecalcPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RecalcPhase::Idle);
        Self { tx }
    }

    pub fn current(&self) -> RecalcPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecalcPhase> {
        self.tx.subscribe()
    }

    /// Claim the tracker for a new run, moving straight to `Fetching`.
    ///
    /// Succeeds from `Idle` or a terminal phase; a run in progress yields
    /// `AlreadyRunning` and is left untouched.
    pub fn start(&self) -> Result<()> {
        let mut from = RecalcPhase::Idle;
        let started = self.tx.send_if_modified(|phase| {
            from = *phase;
            if *phase == RecalcPhase::Idle || phase.is_terminal() {
                *phase = RecalcPhase::Fetching;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(RecalcError::AlreadyRunning);
        }
        tracing::debug!("Recalculation phase {} -> {}", from, RecalcPhase::Fetching);
        Ok(())
    }

    /// Check and apply a transition in one step
    pub fn transition(&self, to: RecalcPhase) -> Result<()> {
        let mut from = to;
        let applied = self.tx.send_if_modified(|phase| {
            from = *phase;
            if phase.can_transition_to(to) {
                *phase = to;
                true
            } else {
                false
            }
        });
        if !applied {
            return Err(RecalcError::InvalidTransition { from, to });
        }
        tracing::debug!("Recalculation phase {} -> {}", from, to);
        Ok(())
    }

    /// Move to `Failed` unless the run already finished
    pub fn fail(&self) {
        let _ = self.transition(RecalcPhase::Failed);
    }
}

//! Advisory progress notifications
//!
//! Reporters never fail the run: a closed channel or a slow observer only
//! loses messages.

use tokio::sync::mpsc;
use tracing::info;

pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ProgressReporter for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Forwards messages to a UI adapter
impl ProgressReporter for mpsc::UnboundedSender<String> {
    fn report(&self, message: &str) {
        let _ = self.send(message.to_string());
    }
}

/// Logs each message at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, message: &str) {
        info!(target: "recalc::progress", "{}", message);
    }
}

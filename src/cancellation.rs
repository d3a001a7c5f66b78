use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

/// Cooperative cancellation signal shared across a training run.
///
/// The orchestrator observes the token at stage boundaries only: an
/// in-flight tooling call is never interrupted, the remaining stages are
/// skipped.
pub struct CancellationToken {
    uid: String,
    cancelled: AtomicBool,
    cancelled_at: Mutex<Option<DateTime<Utc>>>,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            cancelled: AtomicBool::new(false),
            cancelled_at: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        *self.cancelled_at.lock().unwrap()
    }

    /// Requests cancellation and wakes every pending waiter. Idempotent:
    /// only the first call records the timestamp, later calls change
    /// nothing.
    pub fn cancel(&self) {
        let mut cancelled_at = self.cancelled_at.lock().unwrap();
        if cancelled_at.is_none() {
            *cancelled_at = Some(Utc::now());
            self.cancelled.store(true, Ordering::SeqCst);
            self.notify.notify_waiters();
        }
    }

    /// Resolves once the token is cancelled, immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

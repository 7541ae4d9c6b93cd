//! Cancellable expiration timers.
//!
//! One scheduled task per armed credential or shadow expiry. Replacing a
//! credential cancels the previous timer before arming the new one, so
//! at most one task is ever pending per credential and no task can fire
//! against stale claims.

use murmur_claims::now_secs;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to one scheduled expiration task.
///
/// Cancellation is synchronous and idempotent: aborting an
/// already-finished or already-aborted task is a no-op.
pub struct ExpiryTimer {
    handle: JoinHandle<()>,
}

impl ExpiryTimer {
    /// Spawn a task that runs `on_fire` once the wall clock reaches
    /// `expires_at` (unix seconds). A deadline already in the past fires
    /// on the next scheduler tick.
    pub fn arm<F>(expires_at: u64, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let delay = expires_at.saturating_sub(now_secs());
            tokio::time::sleep(Duration::from_secs(delay)).await;
            on_fire.await;
        });
        Self { handle }
    }

    /// Cancel the pending task.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for ExpiryTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiryTimer")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

//! Deferred operation starts.

use std::time::Duration;
use tokio::task::JoinHandle;

/// Owns at most one pending deferred start.
///
/// Scheduling a callback cancels whatever was pending, so of several
/// rapid schedules only the last ever runs — the debounce behavior the
/// orchestrator builds on. A cancelled callback never runs and no
/// callback runs twice.
#[derive(Debug, Default)]
pub struct DelaySlot {
    pending: Option<JoinHandle<()>>,
}

impl DelaySlot {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Schedule `callback` after `delay`, replacing any pending one.
    ///
    /// A zero delay invokes the callback on the spot, before `schedule`
    /// returns — no task, no suspension. Otherwise the callback moves to
    /// a timer task whose handle parks in the slot, so a later
    /// `schedule` or [`cancel`](Self::cancel) aborts the timer before it
    /// fires.
    ///
    /// # Panics
    ///
    /// Panics if called with a non-zero delay outside a Tokio runtime.
    pub fn schedule(&mut self, delay: Duration, callback: impl FnOnce() + Send + 'static) {
        self.cancel();
        if delay.is_zero() {
            callback();
        } else {
            self.pending = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callback();
            }));
        }
    }

    /// Cancel the pending callback, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

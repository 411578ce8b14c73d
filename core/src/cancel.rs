//! Cooperative cancellation for in-flight transport calls.
//!
//! A [`CancelToken`] represents the liveness of exactly one transport
//! call. It is created armed; the orchestrator marks it in-use while a
//! call holds it and aborts it when the operation is superseded. Aborting
//! is idempotent — the signal fires at most once — and an aborted token is
//! never reused for a new call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Cancellation handle attached to one transport call.
///
/// Clones share state: any clone can observe the abort, and transports
/// typically hold a clone while the orchestrator keeps the original.
///
/// State machine: *armed* → *aborted* (via [`abort`](Self::abort)) or
/// *settled* (the call completed; [`mark_in_use`](Self::mark_in_use) with
/// `false`). Both terminal transitions leave the token unusable for new
/// calls — the managing slot arms a fresh token instead.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<TokenShared>,
}

#[derive(Debug)]
struct TokenShared {
    aborted: watch::Sender<bool>,
    in_use: AtomicBool,
}

impl CancelToken {
    /// Create a fresh armed token, not yet backing any call.
    #[must_use]
    pub fn new() -> Self {
        let (aborted, _) = watch::channel(false);
        Self {
            inner: Arc::new(TokenShared {
                aborted,
                in_use: AtomicBool::new(false),
            }),
        }
    }

    /// Whether the token has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.inner.aborted.borrow()
    }

    /// Whether the token currently backs a live transport call.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Mark whether the token backs a live call.
    ///
    /// A no-op once the token is aborted: an abort already ended the
    /// call's liveness, and un-marking afterwards must not resurrect it.
    pub fn mark_in_use(&self, active: bool) {
        if !self.is_aborted() {
            self.inner.in_use.store(active, Ordering::Release);
        }
    }

    /// Abort the token, waking every [`cancelled`](Self::cancelled) waiter.
    ///
    /// Idempotent: the signal fires at most once. Returns whether this
    /// call performed the transition.
    pub fn abort(&self) -> bool {
        self.inner.aborted.send_if_modified(|aborted| {
            if *aborted {
                false
            } else {
                *aborted = true;
                true
            }
        })
    }

    /// Resolve once the token is aborted.
    ///
    /// Never resolves for a token that settles without being aborted, so
    /// callers race it against the call itself (`tokio::select!`).
    pub async fn cancelled(&self) {
        let mut rx = self.inner.aborted.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender gone: the token can no longer be aborted.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

//! # Lastcall Runtime
//!
//! The request orchestrator: issue one logical network operation at a
//! time, debounce rapid issues, cancel superseded work, and guarantee
//! that only the most recently issued operation can ever affect
//! observable state.
//!
//! ## Core Components
//!
//! - **[`Fetcher`]**: the orchestrator a caller issues requests through
//! - **[`delay::DelaySlot`]**: at most one pending deferred start
//! - **[`signal::SignalSlot`]**: at most one armed cancellation token
//! - **[`sequence::SequenceTracker`]**: monotonic ids, the staleness gate
//! - **[`OperationHandle`]**: awaitable settlement of one issued operation
//!
//! ## Example
//!
//! ```ignore
//! use lastcall_core::{OwnerHandle, Params, RequestOverrides, RequestSpec};
//! use lastcall_runtime::Fetcher;
//!
//! let owner = OwnerHandle::new();
//! let fetcher = Fetcher::new(transport, owner.clone(), RequestSpec::new()
//!     .with_basename("/api")
//!     .with_target("/users"));
//!
//! // Only the second operation can ever publish.
//! fetcher.request(RequestOverrides::none().with_params(Params::new().set("id", 1)));
//! fetcher.request(RequestOverrides::none().with_params(Params::new().set("id", 2)));
//!
//! // On teardown, in-flight work is aborted and late results discarded.
//! owner.dispose();
//! ```

use lastcall_core::{
    FailurePayload, Method, OwnerHandle, RequestOverrides, RequestSpec, ResponseState,
    SuccessPayload, Transport, TransportError, TransportReply, TransportRequest, url,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// Deferred operation starts (debounce)
pub mod delay;

/// Cancellation-token ownership
pub mod signal;

/// Monotonic operation identity (staleness)
pub mod sequence;

use delay::DelaySlot;
use sequence::SequenceTracker;
use signal::SignalSlot;

/// Status published when a failure never carried a real HTTP status.
const FALLBACK_STATUS: u16 = 500;

/// Observable state of a fetcher.
#[derive(Debug, Clone)]
pub struct FetchState<T = Value, U = Value> {
    /// Whether an operation is currently executing.
    pub loading: bool,
    /// The last published outcome.
    pub response: ResponseState<T, U>,
}

impl<T, U> Default for FetchState<T, U> {
    fn default() -> Self {
        Self {
            loading: false,
            response: ResponseState::Pending,
        }
    }
}

/// Handle for awaiting one issued operation's settlement.
///
/// Returned by [`Fetcher::request`]. Resolves when the operation
/// publishes, is discarded as stale, or is superseded before it ever
/// started — it makes no promise that anything was published, only that
/// nothing more will happen on the operation's behalf.
///
/// # Example
///
/// ```ignore
/// let mut handle = fetcher.request(RequestOverrides::none());
/// handle.wait().await;
/// assert!(!fetcher.is_loading());
/// ```
#[derive(Clone)]
pub struct OperationHandle {
    pending: Arc<AtomicUsize>,
    settled: watch::Receiver<()>,
}

impl OperationHandle {
    fn new() -> (Self, SettleGuard) {
        let pending = Arc::new(AtomicUsize::new(1));
        let (notify, settled) = watch::channel(());

        let handle = Self {
            pending: Arc::clone(&pending),
            settled,
        };
        (handle, SettleGuard { pending, notify })
    }

    /// Create a handle that is already settled.
    ///
    /// Useful as an initial value when tracking the latest handle in a
    /// loop.
    #[must_use]
    pub fn settled() -> Self {
        let (notify, settled) = watch::channel(());
        let _ = notify.send(());
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            settled,
        }
    }

    /// Wait for the operation to settle.
    pub async fn wait(&mut self) {
        while self.pending.load(Ordering::SeqCst) > 0 {
            let _ = self.settled.changed().await;
        }
    }

    /// Wait for settlement with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("pending", &self.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// RAII guard: settles the handle when dropped, whether the operation
/// finished, was discarded, or its timer task was aborted outright.
struct SettleGuard {
    pending: Arc<AtomicUsize>,
    notify: watch::Sender<()>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notify.send(());
        }
    }
}

/// Shared internals: everything an in-flight operation needs after the
/// caller's `request()` has already returned.
struct Shared<T, U> {
    state: RwLock<FetchState<T, U>>,
    updates: watch::Sender<()>,
    sequence: SequenceTracker,
    signal: Mutex<SignalSlot>,
    delay: Mutex<DelaySlot>,
}

impl<T, U> Shared<T, U> {
    /// Abort the in-flight operation and cancel any pending deferred
    /// start.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn clear_side_effects(&self) {
        self.signal.lock().unwrap().abort_current();
        self.delay.lock().unwrap().cancel();
    }
}

/// The request orchestrator.
///
/// A `Fetcher` issues one logical operation at a time on behalf of its
/// owner. Issuing a new operation synchronously aborts whatever is in
/// flight; completions are gated on owner liveness and on the operation
/// still being the most recent one, so out-of-order completions can
/// never corrupt published state.
///
/// `T` is the decoded success body, `U` the decoded error body.
///
/// # Concurrency
///
/// - `request()` is synchronous; the transport call runs on a spawned
///   task.
/// - With a zero debounce delay, the operation begins (sequence id
///   assigned, loading observable, token armed, task spawned) before
///   `request()` returns.
/// - Sequence-id assignment and the staleness-gated publish both run
///   under the state write lock, so "check current, then write" can
///   never interleave with a competing operation.
pub struct Fetcher<T = Value, U = Value> {
    transport: Arc<dyn Transport>,
    owner: OwnerHandle,
    defaults: RequestSpec<T, U>,
    shared: Arc<Shared<T, U>>,
}

impl<T, U> Fetcher<T, U>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    U: DeserializeOwned + Default + Clone + Send + Sync + 'static,
{
    /// Create a fetcher.
    ///
    /// Registers teardown with `owner`: disposing the owner aborts any
    /// in-flight operation and cancels any pending deferred start.
    ///
    /// # Arguments
    ///
    /// - `transport`: the wire-level call implementation
    /// - `owner`: liveness flag gating every publication
    /// - `defaults`: request spec merged under every per-call override
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        owner: OwnerHandle,
        defaults: RequestSpec<T, U>,
    ) -> Self {
        let (updates, _) = watch::channel(());
        let shared = Arc::new(Shared {
            state: RwLock::new(FetchState::default()),
            updates,
            sequence: SequenceTracker::new(),
            signal: Mutex::new(SignalSlot::new()),
            delay: Mutex::new(DelaySlot::new()),
        });

        let teardown = Arc::downgrade(&shared);
        owner.on_dispose(move || {
            if let Some(shared) = teardown.upgrade() {
                shared.clear_side_effects();
            }
        });

        Self {
            transport,
            owner,
            defaults,
            shared,
        }
    }

    /// Issue an operation. Fire-and-forget: outcomes arrive through the
    /// published state and the spec's callbacks, never as a return value.
    ///
    /// Synchronously aborts whatever operation is currently in flight —
    /// even one whose deferred start has not run yet — then schedules the
    /// new operation through the delay slot. Of several rapid issues only
    /// the last can ever publish: predecessors are either aborted before
    /// their transport call starts or discarded as stale afterwards.
    ///
    /// # Returns
    ///
    /// An [`OperationHandle`] that settles when nothing more will happen
    /// on this operation's behalf.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if an internal lock
    /// is poisoned.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    #[tracing::instrument(skip(self, overrides), name = "fetcher_request")]
    pub fn request(&self, overrides: RequestOverrides<T, U>) -> OperationHandle {
        let spec = self.defaults.merge(overrides);

        metrics::counter!("fetcher.requests.issued").increment(1);
        tracing::debug!(
            path = %spec.target,
            delay_ms = %spec.delay.as_millis(),
            "Issuing operation"
        );

        // Abort before anything new is scheduled, so at most one logical
        // operation is ever live from the caller's perspective.
        self.shared.signal.lock().unwrap().abort_current();

        let (handle, guard) = OperationHandle::new();
        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        let owner = self.owner.clone();
        let delay = spec.delay;

        self.shared.delay.lock().unwrap().schedule(delay, move || {
            Self::launch(&shared, transport, owner, spec, guard);
        });

        handle
    }

    /// Abort the in-flight operation and cancel any pending deferred
    /// start.
    ///
    /// Also runs on owner disposal and when the fetcher is dropped. Safe
    /// to call at any time, including when nothing is in flight.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn clear_side_effects(&self) {
        metrics::counter!("fetcher.requests.cleared").increment(1);
        self.shared.clear_side_effects();
    }

    /// Whether an operation is currently executing.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.state.read().unwrap().loading
    }

    /// The last published outcome.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    #[must_use]
    pub fn response(&self) -> ResponseState<T, U> {
        self.shared.state.read().unwrap().response.clone()
    }

    /// Read state through a closure; the lock is released when it
    /// returns.
    ///
    /// ```ignore
    /// let status = fetcher.state(|s| s.response.status());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    pub fn state<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&FetchState<T, U>) -> V,
    {
        f(&self.shared.state.read().unwrap())
    }

    /// Subscribe to state-change notifications.
    ///
    /// The receiver is marked changed whenever loading flips or an
    /// outcome is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.shared.updates.subscribe()
    }

    /// Begin executing one operation: this is the deferred callback the
    /// delay slot invokes, synchronously for zero-delay issues.
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn launch(
        shared: &Arc<Shared<T, U>>,
        transport: Arc<dyn Transport>,
        owner: OwnerHandle,
        spec: RequestSpec<T, U>,
        guard: SettleGuard,
    ) {
        let token = shared.signal.lock().unwrap().acquire();

        // Identity assignment and the loading flip share one write
        // guard: no completion handler can observe one without the
        // other, and none can slip between this id and a later one.
        let id = {
            let mut state = shared.state.write().unwrap();
            let id = shared.sequence.advance();
            state.loading = true;
            id
        };
        let _ = shared.updates.send(());
        shared.signal.lock().unwrap().mark_in_use(true);

        let target = url::compose_target(&spec.basename, &spec.target, &spec.params, &spec.query);
        let body = if spec.method == Method::GET {
            None
        } else {
            spec.body.clone()
        };
        let request = TransportRequest {
            target,
            method: spec.method.clone(),
            headers: spec.headers.clone(),
            body,
        };

        metrics::counter!("fetcher.requests.started").increment(1);
        tracing::debug!(operation = id, path = %request.target, "Starting transport call");

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let _settle = guard;
            let outcome = transport.send(request, token).await;
            Self::finish(&shared, &owner, &spec, id, outcome);
        });
    }

    /// Handle one settled transport call.
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn finish(
        shared: &Arc<Shared<T, U>>,
        owner: &OwnerHandle,
        spec: &RequestSpec<T, U>,
        id: u64,
        outcome: Result<TransportReply, TransportError>,
    ) {
        // A cancelled call never publishes: the superseding operation
        // owns the observable state from here on.
        let Some(verdict) = Self::normalize(id, outcome) else {
            metrics::counter!("fetcher.requests.cancelled").increment(1);
            tracing::debug!(operation = id, "Transport call cancelled");
            return;
        };

        // Gate and publish under one write guard; callbacks run after it
        // drops so user code never executes while the lock is held.
        let published = {
            let mut state = shared.state.write().unwrap();
            if !owner.is_alive() || !shared.sequence.is_current(id) {
                false
            } else {
                state.response = match &verdict {
                    Ok(payload) => ResponseState::Success(payload.clone()),
                    Err(payload) => ResponseState::Failed(payload.clone()),
                };
                state.loading = false;
                true
            }
        };

        if !published {
            metrics::counter!("fetcher.requests.discarded").increment(1);
            tracing::debug!(operation = id, "Discarding stale or ownerless result");
            return;
        }

        shared.signal.lock().unwrap().mark_in_use(false);
        let _ = shared.updates.send(());

        match verdict {
            Ok(payload) => {
                metrics::counter!("fetcher.requests.succeeded").increment(1);
                tracing::debug!(operation = id, status = payload.status, "Published success");
                if let Some(callback) = &spec.on_success {
                    callback(&payload);
                }
            }
            Err(payload) => {
                metrics::counter!("fetcher.requests.failed").increment(1);
                tracing::debug!(operation = id, status = payload.status, "Published failure");
                if let Some(callback) = &spec.on_failed {
                    callback(&payload);
                }
            }
        }
    }

    /// Fold a transport outcome into a publishable payload.
    ///
    /// `None` means cancellation — nothing to publish. Failures that
    /// never carried a real HTTP status (network, undecodable bodies)
    /// normalize to [`FALLBACK_STATUS`] with a default error payload.
    fn normalize(
        id: u64,
        outcome: Result<TransportReply, TransportError>,
    ) -> Option<Result<SuccessPayload<T>, FailurePayload<U>>> {
        match outcome {
            Err(TransportError::Cancelled) => None,
            Ok(reply) => match serde_json::from_value::<T>(reply.body) {
                Ok(result) => Some(Ok(SuccessPayload {
                    status: reply.status,
                    result,
                })),
                Err(error) => {
                    tracing::warn!(operation = id, %error, "Success body did not decode");
                    Some(Err(FailurePayload {
                        status: FALLBACK_STATUS,
                        error: U::default(),
                    }))
                }
            },
            Err(TransportError::Http { status, body }) => {
                let error = serde_json::from_value::<U>(body).unwrap_or_default();
                Some(Err(FailurePayload { status, error }))
            }
            Err(error @ (TransportError::Network(_) | TransportError::Decode(_))) => {
                tracing::warn!(operation = id, %error, "Transport failure");
                Some(Err(FailurePayload {
                    status: FALLBACK_STATUS,
                    error: U::default(),
                }))
            }
        }
    }
}

impl<T, U> Drop for Fetcher<T, U> {
    fn drop(&mut self) {
        self.shared.clear_side_effects();
    }
}

impl<T, U> std::fmt::Debug for Fetcher<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("owner", &self.owner)
            .field("defaults", &self.defaults.target)
            .finish_non_exhaustive()
    }
}

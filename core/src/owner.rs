//! Owner liveness and teardown.
//!
//! A fetcher publishes results on behalf of some longer-lived owner — a
//! UI component, a session, a task. The owner's liveness gates every
//! publication: once the owner is gone, late results are discarded
//! instead of written into state nobody reads. [`OwnerHandle`] makes that
//! lifecycle explicit: the composing layer holds a handle, the fetcher
//! consults `is_alive` and registers its cleanup with `on_dispose`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type DisposeCallback = Box<dyn FnOnce() + Send>;

/// Shared liveness flag with teardown registration.
///
/// Alive from creation until [`dispose`](Self::dispose) is called, false
/// forever after. Clones share the same flag.
///
/// # Example
///
/// ```
/// use lastcall_core::OwnerHandle;
///
/// let owner = OwnerHandle::new();
/// assert!(owner.is_alive());
/// owner.on_dispose(|| println!("tearing down"));
/// owner.dispose();
/// assert!(!owner.is_alive());
/// ```
#[derive(Clone)]
pub struct OwnerHandle {
    inner: Arc<OwnerShared>,
}

struct OwnerShared {
    alive: AtomicBool,
    on_dispose: Mutex<Vec<DisposeCallback>>,
}

impl OwnerHandle {
    /// Create a live handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(OwnerShared {
                alive: AtomicBool::new(true),
                on_dispose: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether the owner is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Register a teardown callback.
    ///
    /// Runs once when the handle is disposed. If the handle is already
    /// disposed the callback runs immediately.
    ///
    /// # Panics
    ///
    /// Panics if the callback registry mutex is poisoned.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    pub fn on_dispose(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut callbacks = self.inner.on_dispose.lock().unwrap();
            if self.is_alive() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Mark the owner dead and run every registered teardown callback.
    ///
    /// Idempotent: only the first call flips the flag and drains the
    /// callbacks.
    ///
    /// # Panics
    ///
    /// Panics if the callback registry mutex is poisoned.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    pub fn dispose(&self) {
        if self.inner.alive.swap(false, Ordering::AcqRel) {
            let callbacks: Vec<DisposeCallback> = {
                let mut guard = self.inner.on_dispose.lock().unwrap();
                guard.drain(..).collect()
            };
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl Default for OwnerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

//! # Lastcall Testing
//!
//! Testing utilities for the lastcall request orchestrator.
//!
//! This crate provides:
//! - [`MockTransport`]: a scripted [`Transport`] that records every
//!   request, answers from a queue of [`ScriptedReply`]s, and honors (or
//!   deliberately ignores) cancellation
//! - [`init_test_logging`]: tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use lastcall_testing::{MockTransport, ScriptedReply};
//! use std::time::Duration;
//!
//! let transport = MockTransport::new();
//! transport.enqueue(
//!     ScriptedReply::success(200, serde_json::json!({"id": 1}))
//!         .after(Duration::from_millis(50)),
//! );
//! ```

use tracing_subscriber::EnvFilter;

pub use mocks::{MockTransport, ScriptedReply};

/// Mock implementations of the transport interface.
pub mod mocks {
    use async_trait::async_trait;
    use lastcall_core::{
        CancelToken, Transport, TransportError, TransportReply, TransportRequest,
    };
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// One scripted transport outcome, with optional latency.
    #[derive(Debug, Clone)]
    pub struct ScriptedReply {
        latency: Duration,
        outcome: Result<TransportReply, TransportError>,
    }

    impl ScriptedReply {
        /// A successful reply with the given status and JSON body.
        #[must_use]
        pub const fn success(status: u16, body: Value) -> Self {
            Self {
                latency: Duration::ZERO,
                outcome: Ok(TransportReply { status, body }),
            }
        }

        /// A non-2xx reply with the given status and JSON error body.
        #[must_use]
        pub const fn http_error(status: u16, body: Value) -> Self {
            Self {
                latency: Duration::ZERO,
                outcome: Err(TransportError::Http { status, body }),
            }
        }

        /// A transport-level failure.
        #[must_use]
        pub const fn error(error: TransportError) -> Self {
            Self {
                latency: Duration::ZERO,
                outcome: Err(error),
            }
        }

        /// Delay the outcome; the call can be cancelled while waiting.
        #[must_use]
        pub const fn after(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }
    }

    /// Scripted [`Transport`]: pops one reply per call and records every
    /// request it receives.
    ///
    /// With an empty script every call answers 200 with a null body.
    /// While a scripted latency elapses the call races its cancellation
    /// token and resolves to [`TransportError::Cancelled`] if the token
    /// fires first — unless [`ignore_cancellation`] puts the mock in
    /// "slow to honor its abort signal" mode, which lets tests exercise
    /// the staleness gate with completions that really arrive.
    ///
    /// [`ignore_cancellation`]: MockTransport::ignore_cancellation
    #[derive(Debug, Default)]
    pub struct MockTransport {
        script: Mutex<VecDeque<ScriptedReply>>,
        requests: Mutex<Vec<TransportRequest>>,
        started: AtomicUsize,
        deaf_to_cancellation: AtomicBool,
    }

    impl MockTransport {
        /// Create a mock with an empty script.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Append one scripted reply.
        ///
        /// # Panics
        ///
        /// Panics if the script mutex is poisoned.
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        pub fn enqueue(&self, reply: ScriptedReply) {
            self.script.lock().unwrap().push_back(reply);
        }

        /// Stop honoring cancellation tokens: calls run their full
        /// latency and return their scripted outcome even when aborted.
        pub fn ignore_cancellation(&self) {
            self.deaf_to_cancellation.store(true, Ordering::Release);
        }

        /// Every request received so far, in call order.
        ///
        /// # Panics
        ///
        /// Panics if the request log mutex is poisoned.
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        #[must_use]
        pub fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// Number of calls that reached the mock.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.started.load(Ordering::Acquire)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        async fn send(
            &self,
            request: TransportRequest,
            cancel: CancelToken,
        ) -> Result<TransportReply, TransportError> {
            self.started.fetch_add(1, Ordering::AcqRel);
            self.requests.lock().unwrap().push(request);

            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::success(200, Value::Null));

            let deaf = self.deaf_to_cancellation.load(Ordering::Acquire);
            if !reply.latency.is_zero() {
                if deaf {
                    tokio::time::sleep(reply.latency).await;
                } else {
                    tokio::select! {
                        () = cancel.cancelled() => return Err(TransportError::Cancelled),
                        () = tokio::time::sleep(reply.latency) => {}
                    }
                }
            }
            if !deaf && cancel.is_aborted() {
                return Err(TransportError::Cancelled);
            }
            reply.outcome
        }
    }
}

/// Initialize a compact tracing subscriber for tests.
///
/// Reads `RUST_LOG` for filtering and is safe to call from every test —
/// only the first call installs a subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

//! The wire-level call, behind a trait.
//!
//! The orchestrator treats the actual network call as an opaque,
//! cancellable async operation. Implementations live elsewhere
//! (`lastcall-http` for `reqwest`, `lastcall-testing` for scripted mocks)
//! and are injected as `Arc<dyn Transport>`.

use crate::cancel::CancelToken;
use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use thiserror::Error;

/// One fully resolved wire-level request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Path plus query string, relative to the transport's base address.
    pub target: String,
    /// HTTP method.
    pub method: Method,
    /// Header pairs in the order supplied.
    pub headers: Vec<(String, String)>,
    /// JSON body; `None` for body-less requests (always `None` for GET).
    pub body: Option<Value>,
}

/// A successful (2xx) transport outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `Value::Null` when the body was empty.
    pub body: Value,
}

/// Errors a transport call can produce.
///
/// Non-2xx statuses are a distinct variant so the orchestrator can keep
/// the real status and error body; everything that never produced a
/// usable response folds into `Network`/`Decode`.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error (status {status})")]
    Http {
        /// The actual response status.
        status: u16,
        /// Decoded error body; `Value::Null` when the body was empty.
        body: Value,
    },

    /// The request never produced a response (connection, DNS, TLS, ...).
    #[error("Network failure: {0}")]
    Network(String),

    /// The response body was not valid JSON.
    #[error("Malformed response body: {0}")]
    Decode(String),

    /// The call was aborted through its cancellation token.
    #[error("Cancelled")]
    Cancelled,
}

/// An injected wire-level call.
///
/// Implementations must abort promptly when `cancel` fires, returning
/// [`TransportError::Cancelled`], and must report non-2xx statuses as
/// [`TransportError::Http`] rather than a generic failure.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for HTTP errors, connection-level
    /// failures, undecodable bodies, and cancellation.
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancelToken,
    ) -> Result<TransportReply, TransportError>;
}

//! Published request outcomes.
//!
//! A fetcher exposes exactly one of three observable states at any time:
//! no result yet, the payload of the last successful operation, or the
//! payload of the last failed one. Publishing a success clears any prior
//! failure and vice versa; that exclusivity is what the enum encodes.

use serde::{Deserialize, Serialize};

/// Payload published when an operation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessPayload<T> {
    /// HTTP status code of the response.
    pub status: u16,
    /// Decoded response body.
    pub result: T,
}

/// Payload published when an operation fails.
///
/// Transport-level failures carry status 500; HTTP failures carry the
/// actual status and the decoded error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload<U> {
    /// HTTP status code, or 500 when the failure never reached the server.
    pub status: u16,
    /// Decoded error body, or `U::default()` when none was available.
    pub error: U,
}

/// The last published outcome of a fetcher.
///
/// Only the orchestrator writes this, and only for an operation that is
/// still current while its owner is alive. A stale result is discarded
/// before it gets anywhere near this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseState<T = serde_json::Value, U = serde_json::Value> {
    /// No operation has published yet.
    #[default]
    Pending,
    /// The most recent current operation succeeded.
    Success(SuccessPayload<T>),
    /// The most recent current operation failed.
    Failed(FailurePayload<U>),
}

impl<T, U> ResponseState<T, U> {
    /// Whether nothing has been published yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the last published outcome was a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the last published outcome was a failure.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Status code of the last published outcome, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Pending => None,
            Self::Success(payload) => Some(payload.status),
            Self::Failed(payload) => Some(payload.status),
        }
    }

    /// The success payload, if that is what was last published.
    #[must_use]
    pub const fn success(&self) -> Option<&SuccessPayload<T>> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// The failure payload, if that is what was last published.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailurePayload<U>> {
        match self {
            Self::Failed(payload) => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = ResponseState<serde_json::Value, serde_json::Value>;

    #[test]
    fn starts_pending() {
        let state = State::default();
        assert!(state.is_pending());
        assert_eq!(state.status(), None);
    }

    #[test]
    fn success_replaces_failure_wholesale() {
        let mut state = State::Failed(FailurePayload {
            status: 404,
            error: serde_json::json!({"reason": "missing"}),
        });
        state = State::Success(SuccessPayload {
            status: 200,
            result: serde_json::json!({"id": 1}),
        });
        assert!(state.is_success());
        assert!(state.failure().is_none());
        assert_eq!(state.status(), Some(200));
    }
}

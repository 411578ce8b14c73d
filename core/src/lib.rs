//! # Lastcall Core
//!
//! Core types for the lastcall request orchestrator.
//!
//! Lastcall issues one logical network operation at a time and guarantees
//! that only the most recently issued operation can ever affect observable
//! state. This crate holds the vocabulary the orchestrator is built from:
//!
//! - **[`RequestSpec`]**: an immutable description of one request intent
//! - **[`Params`]**: ordered path/query parameters with present, null, and
//!   omitted values
//! - **[`ResponseState`]**: the last published outcome (pending, success,
//!   or failure)
//! - **[`CancelToken`]**: cooperative cancellation handle for one
//!   in-flight transport call
//! - **[`OwnerHandle`]**: liveness flag and teardown registration for
//!   whatever owns a fetcher
//! - **[`Transport`]**: the injected wire-level call, kept behind a trait
//!   so runtimes and tests can swap implementations
//!
//! The orchestrator itself lives in `lastcall-runtime`; a `reqwest`-backed
//! [`Transport`] lives in `lastcall-http`.
//!
//! ## Example
//!
//! ```ignore
//! use lastcall_core::{Params, RequestSpec};
//!
//! let defaults: RequestSpec = RequestSpec::new()
//!     .with_basename("/api")
//!     .with_target("/users")
//!     .with_params(Params::new().set("id", 5));
//! ```

// Re-export commonly used types
pub use http::Method;
pub use serde_json::Value;

pub mod cancel;
pub mod owner;
pub mod params;
pub mod request;
pub mod response;
pub mod transport;
pub mod url;

pub use cancel::CancelToken;
pub use owner::OwnerHandle;
pub use params::{ParamValue, Params};
pub use request::{FailureCallback, RequestOverrides, RequestSpec, SuccessCallback};
pub use response::{FailurePayload, ResponseState, SuccessPayload};
pub use transport::{Transport, TransportError, TransportReply, TransportRequest};

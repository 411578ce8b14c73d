//! # Lastcall HTTP
//!
//! `reqwest`-backed [`Transport`] implementation.
//!
//! [`HttpTransport`] holds a shared [`Client`] and a base URL; every
//! request target the orchestrator composes is appended to that base.
//! Cancellation races the request future against the token, so an abort
//! takes effect without waiting for the server.
//!
//! ## Example
//!
//! ```ignore
//! use lastcall_http::HttpTransport;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new("https://api.example.com"));
//! let fetcher = Fetcher::new(transport, owner, defaults);
//! ```

use async_trait::async_trait;
use lastcall_core::{
    CancelToken, Transport, TransportError, TransportReply, TransportRequest,
};
use reqwest::Client;
use serde_json::Value;

/// `reqwest`-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`.
    ///
    /// The base is prepended verbatim to every request target, so it
    /// should carry no trailing slash.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use a preconfigured [`Client`] (timeouts, proxies, default
    /// headers).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn perform(&self, request: TransportRequest) -> Result<TransportReply, TransportError> {
        let url = format!("{}{}", self.base_url, request.target);
        let mut builder = self.client.request(request.method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::Network(error.to_string()))?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| TransportError::Network(error.to_string()))?;
        let body = decode_body(&bytes)?;

        if success {
            Ok(TransportReply { status, body })
        } else {
            Err(TransportError::Http { status, body })
        }
    }
}

/// Decode a response body: empty bodies are `null`, anything else must
/// be valid JSON.
fn decode_body(bytes: &[u8]) -> Result<Value, TransportError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|error| TransportError::Decode(error.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancelToken,
    ) -> Result<TransportReply, TransportError> {
        if cancel.is_aborted() {
            return Err(TransportError::Cancelled);
        }

        let target = request.target.clone();
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(path = %target, "Request aborted by cancellation token");
                Err(TransportError::Cancelled)
            }
            outcome = self.perform(request) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bodies_decode_as_null() {
        assert_eq!(decode_body(b"").ok(), Some(Value::Null));
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(
            decode_body(b"not json"),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn base_url_is_kept_verbatim() {
        let transport = HttpTransport::new("http://localhost:9999");
        assert_eq!(transport.base_url, "http://localhost:9999");
    }
}

//! Operation descriptors.
//!
//! A [`RequestSpec`] is an immutable snapshot of one request intent:
//! where to send it, how, with which parameters, how long to debounce,
//! and which callbacks to notify. A fetcher is constructed with a spec of
//! defaults; each issued operation merges per-call
//! [`RequestOverrides`] over those defaults into the spec that operation
//! owns for the rest of its life.

use crate::params::Params;
use crate::response::{FailurePayload, SuccessPayload};
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked when a still-current operation succeeds.
pub type SuccessCallback<T> = Arc<dyn Fn(&SuccessPayload<T>) + Send + Sync>;

/// Callback invoked when a still-current operation fails.
pub type FailureCallback<U> = Arc<dyn Fn(&FailurePayload<U>) + Send + Sync>;

/// Immutable description of one request intent.
///
/// `T` is the decoded success body, `U` the decoded error body.
///
/// # Example
///
/// ```
/// use lastcall_core::{Params, RequestSpec};
/// use std::time::Duration;
///
/// let spec: RequestSpec = RequestSpec::new()
///     .with_basename("/api")
///     .with_target("/search")
///     .with_query(Params::new().set("q", "rust"))
///     .with_delay(Duration::from_millis(300));
/// ```
pub struct RequestSpec<T = Value, U = Value> {
    /// Path to request, appended to `basename`. Defaults to `/`.
    pub target: String,
    /// Path prefix shared by every request this spec issues.
    pub basename: String,
    /// HTTP method. Defaults to GET.
    pub method: Method,
    /// Header pairs in the order supplied.
    pub headers: Vec<(String, String)>,
    /// Ordered path parameters, appended as path segments.
    pub params: Params,
    /// Ordered query parameters.
    pub query: Params,
    /// JSON body. Ignored for GET requests.
    pub body: Option<Value>,
    /// Debounce delay before the operation starts. Zero starts it
    /// synchronously.
    pub delay: Duration,
    /// Invoked with the payload when a still-current operation succeeds.
    pub on_success: Option<SuccessCallback<T>>,
    /// Invoked with the payload when a still-current operation fails.
    pub on_failed: Option<FailureCallback<U>>,
}

impl<T, U> RequestSpec<T, U> {
    /// Create a spec with defaults: GET `/`, no parameters, zero delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: "/".to_string(),
            basename: String::new(),
            method: Method::GET,
            headers: Vec::new(),
            params: Params::new(),
            query: Params::new(),
            body: None,
            delay: Duration::ZERO,
            on_success: None,
            on_failed: None,
        }
    }

    /// Set the target path.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the path prefix.
    #[must_use]
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header pair.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the debounce delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the success callback.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&SuccessPayload<T>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Set the failure callback.
    #[must_use]
    pub fn on_failed(mut self, callback: impl Fn(&FailurePayload<U>) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Arc::new(callback));
        self
    }

    /// Merge per-call overrides over these defaults.
    ///
    /// Every overridden field replaces the default, except callbacks:
    /// those combine, with the default callback running first and the
    /// override's after it.
    #[must_use]
    pub fn merge(&self, overrides: RequestOverrides<T, U>) -> Self
    where
        T: 'static,
        U: 'static,
    {
        Self {
            target: overrides.target.unwrap_or_else(|| self.target.clone()),
            basename: overrides.basename.unwrap_or_else(|| self.basename.clone()),
            method: overrides.method.unwrap_or_else(|| self.method.clone()),
            headers: overrides.headers.unwrap_or_else(|| self.headers.clone()),
            params: overrides.params.unwrap_or_else(|| self.params.clone()),
            query: overrides.query.unwrap_or_else(|| self.query.clone()),
            body: overrides.body.or_else(|| self.body.clone()),
            delay: overrides.delay.unwrap_or(self.delay),
            on_success: combine(self.on_success.clone(), overrides.on_success),
            on_failed: combine(self.on_failed.clone(), overrides.on_failed),
        }
    }
}

/// Chain two callbacks so both observe the payload, base first.
fn combine<P: 'static>(
    base: Option<Arc<dyn Fn(&P) + Send + Sync>>,
    overriding: Option<Arc<dyn Fn(&P) + Send + Sync>>,
) -> Option<Arc<dyn Fn(&P) + Send + Sync>> {
    match (base, overriding) {
        (Some(first), Some(second)) => Some(Arc::new(move |payload: &P| {
            first(payload);
            second(payload);
        })),
        (first, None) => first,
        (None, second) => second,
    }
}

impl<T, U> Default for RequestSpec<T, U> {
    fn default() -> Self {
        Self::new()
    }
}

// Manual Clone: callback Arcs clone without T: Clone / U: Clone bounds.
impl<T, U> Clone for RequestSpec<T, U> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            basename: self.basename.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            delay: self.delay,
            on_success: self.on_success.clone(),
            on_failed: self.on_failed.clone(),
        }
    }
}

impl<T, U> std::fmt::Debug for RequestSpec<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("target", &self.target)
            .field("basename", &self.basename)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("delay", &self.delay)
            .field("on_success", &self.on_success.as_ref().map(|_| "<callback>"))
            .field("on_failed", &self.on_failed.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Per-call overrides for one issued operation.
///
/// Unset fields fall through to the fetcher's defaults; see
/// [`RequestSpec::merge`] for the callback-combining rule.
pub struct RequestOverrides<T = Value, U = Value> {
    /// Replacement target path.
    pub target: Option<String>,
    /// Replacement path prefix.
    pub basename: Option<String>,
    /// Replacement HTTP method.
    pub method: Option<Method>,
    /// Replacement header list.
    pub headers: Option<Vec<(String, String)>>,
    /// Replacement path parameters.
    pub params: Option<Params>,
    /// Replacement query parameters.
    pub query: Option<Params>,
    /// Replacement JSON body.
    pub body: Option<Value>,
    /// Replacement debounce delay.
    pub delay: Option<Duration>,
    /// Additional success callback, run after the default one.
    pub on_success: Option<SuccessCallback<T>>,
    /// Additional failure callback, run after the default one.
    pub on_failed: Option<FailureCallback<U>>,
}

impl<T, U> RequestOverrides<T, U> {
    /// Create empty overrides: the operation uses the defaults as-is.
    #[must_use]
    pub fn none() -> Self {
        Self {
            target: None,
            basename: None,
            method: None,
            headers: None,
            params: None,
            query: None,
            body: None,
            delay: None,
            on_success: None,
            on_failed: None,
        }
    }

    /// Override the target path.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Override the path prefix.
    #[must_use]
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    /// Override the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Override the header list.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Override the path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Override the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Params) -> Self {
        self.query = Some(query);
        self
    }

    /// Override the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the debounce delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a success callback for this call only.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&SuccessPayload<T>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Add a failure callback for this call only.
    #[must_use]
    pub fn on_failed(mut self, callback: impl Fn(&FailurePayload<U>) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Arc::new(callback));
        self
    }
}

impl<T, U> Default for RequestOverrides<T, U> {
    fn default() -> Self {
        Self::none()
    }
}

// Manual Clone for the same reason as RequestSpec.
impl<T, U> Clone for RequestOverrides<T, U> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            basename: self.basename.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            delay: self.delay,
            on_success: self.on_success.clone(),
            on_failed: self.on_failed.clone(),
        }
    }
}

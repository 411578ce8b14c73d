//! Pure request-target builders.
//!
//! No state, no concurrency: these functions turn a base path plus
//! ordered parameters into the final target string handed to the
//! transport.

use crate::params::{ParamValue, Params};

/// Build a path from a base and ordered path parameters.
///
/// Trailing separators on the base are trimmed, each present non-null
/// value becomes one path segment in order, and accidental empty segments
/// (`//`) are collapsed. The result carries no trailing slash.
///
/// # Example
///
/// ```
/// use lastcall_core::{Params, url::build_path};
///
/// let params = Params::new().set("id", 5);
/// assert_eq!(build_path("/users/", &params), "/users/5");
/// ```
#[must_use]
pub fn build_path(base: &str, params: &Params) -> String {
    let absolute = base.starts_with('/');
    let mut segments: Vec<String> = base
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    for (_, value) in params.iter() {
        match value {
            Some(ParamValue::Null) | None => {}
            Some(value) => segments.push(value.to_string()),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Build a query string from ordered query parameters.
///
/// Present values are joined as `?k=v&k=v` in supplied order. Omitted
/// values are skipped entirely; explicit nulls render as the literal
/// `null`. With no present values the result is empty — no dangling `?`.
///
/// # Example
///
/// ```
/// use lastcall_core::{Params, url::build_query};
///
/// let query = Params::new().set("q", "a").omit("page");
/// assert_eq!(build_query(&query), "?q=a");
/// ```
#[must_use]
pub fn build_query(query: &Params) -> String {
    let mut out = String::new();
    for (key, value) in query.iter() {
        let Some(value) = value else { continue };
        out.push(if out.is_empty() { '?' } else { '&' });
        out.push_str(key);
        out.push('=');
        out.push_str(&value.to_string());
    }
    out
}

/// Compose the final request target from its pieces.
#[must_use]
pub fn compose_target(basename: &str, target: &str, params: &Params, query: &Params) -> String {
    let path = build_path(&format!("{basename}{target}"), params);
    let query = build_query(query);
    format!("{path}{query}")
}

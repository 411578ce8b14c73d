//! Integration tests for the fetcher's request lifecycle.
//!
//! These exercise the orchestration guarantees end to end against a
//! scripted transport: latest-wins publication, debounce collapsing,
//! synchronous zero-delay starts, teardown cancellation, and failure
//! normalization.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use lastcall_core::{
    Method, OwnerHandle, Params, RequestOverrides, RequestSpec, TransportError,
};
use lastcall_runtime::Fetcher;
use lastcall_testing::{MockTransport, ScriptedReply};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

type TestFetcher = Fetcher<Value, Value>;

struct Fixture {
    transport: Arc<MockTransport>,
    owner: OwnerHandle,
    fetcher: TestFetcher,
}

fn fixture(defaults: RequestSpec<Value, Value>) -> Fixture {
    lastcall_testing::init_test_logging();
    let transport = Arc::new(MockTransport::new());
    let owner = OwnerHandle::new();
    let fetcher = Fetcher::new(
        Arc::clone(&transport) as Arc<dyn lastcall_core::Transport>,
        owner.clone(),
        defaults,
    );
    Fixture {
        transport,
        owner,
        fetcher,
    }
}

/// Shared recorder for callback invocations.
fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&log);
    (log, move |entry: &str| {
        writer.lock().unwrap().push(entry.to_string())
    })
}

// ============================================================================
// Latest-wins publication
// ============================================================================

#[tokio::test]
async fn rapid_fire_publishes_only_the_latest_operation() {
    let fix = fixture(RequestSpec::new().with_target("/items"));
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"n": 1})).after(Duration::from_millis(50)));
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"n": 2})).after(Duration::from_millis(10)));

    let (log, record) = recorder();
    let first_record = record.clone();
    let mut first = fix.fetcher.request(
        RequestOverrides::none().on_success(move |_| first_record("first")),
    );
    let second_record = record.clone();
    let mut second = fix.fetcher.request(
        RequestOverrides::none().on_success(move |_| second_record("second")),
    );

    first.wait().await;
    second.wait().await;

    let response = fix.fetcher.response();
    assert_eq!(response.success().unwrap().result, json!({"n": 2}));
    // The superseded operation's callbacks never ran.
    assert_eq!(*log.lock().unwrap(), vec!["second".to_string()]);
    assert!(!fix.fetcher.is_loading());
}

#[tokio::test]
async fn stale_success_never_overwrites_newer_state() {
    // A transport slow to honor its abort signal: the first operation's
    // call genuinely completes, after the second already published.
    let fix = fixture(RequestSpec::new().with_target("/items"));
    fix.transport.ignore_cancellation();
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"n": 1})).after(Duration::from_millis(60)));
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"n": 2})).after(Duration::from_millis(10)));

    let (log, record) = recorder();
    let stale_record = record.clone();
    let mut first = fix.fetcher.request(
        RequestOverrides::none().on_success(move |_| stale_record("stale")),
    );
    let mut second = fix.fetcher.request(RequestOverrides::none());

    first.wait().await;
    second.wait().await;

    // Both calls reached the wire; only the latest one published.
    assert_eq!(fix.transport.calls(), 2);
    let response = fix.fetcher.response();
    assert_eq!(response.success().unwrap().result, json!({"n": 2}));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rapid_reissue_aborts_are_idempotent() {
    let fix = fixture(RequestSpec::new().with_target("/burst"));
    for n in 1..=4 {
        fix.transport.enqueue(
            ScriptedReply::success(200, json!({"n": n})).after(Duration::from_millis(15)),
        );
    }

    let mut last = lastcall_runtime::OperationHandle::settled();
    for _ in 0..4 {
        last = fix.fetcher.request(RequestOverrides::none());
    }
    last.wait().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = fix.fetcher.response();
    assert!(response.is_success());
    assert_eq!(response.success().unwrap().result, json!({"n": 4}));
}

// ============================================================================
// Debounce
// ============================================================================

#[tokio::test]
async fn debounced_issues_collapse_to_the_last_one() {
    let fix = fixture(
        RequestSpec::new()
            .with_target("/search")
            .with_delay(Duration::from_millis(60)),
    );

    let mut handles = Vec::new();
    for term in ["a", "ab", "abc"] {
        handles.push(fix.fetcher.request(
            RequestOverrides::none().with_query(Params::new().set("q", term)),
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for handle in &mut handles {
        handle.wait().await;
    }

    // Exactly one transport call: the last issue, after its own delay.
    assert_eq!(fix.transport.calls(), 1);
    let requests = fix.transport.requests();
    assert_eq!(requests[0].target, "/search?q=abc");
    assert!(fix.fetcher.response().is_success());
}

#[tokio::test]
async fn zero_delay_starts_before_request_returns() {
    let fix = fixture(RequestSpec::new().with_target("/now"));
    fix.transport
        .enqueue(ScriptedReply::success(200, Value::Null).after(Duration::from_millis(100)));

    assert!(!fix.fetcher.is_loading());
    let _handle = fix.fetcher.request(RequestOverrides::none());
    // No deferred scheduling: the operation began synchronously.
    assert!(fix.fetcher.is_loading());

    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fix.transport.calls(), 1);
}

#[tokio::test]
async fn pending_debounced_start_is_cancelled_by_clear() {
    let fix = fixture(
        RequestSpec::new()
            .with_target("/later")
            .with_delay(Duration::from_millis(30)),
    );

    let mut handle = fix.fetcher.request(RequestOverrides::none());
    fix.fetcher.clear_side_effects();
    handle.wait().await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fix.transport.calls(), 0);
    assert!(fix.fetcher.response().is_pending());
    assert!(!fix.fetcher.is_loading());
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn disposal_discards_a_result_that_still_arrives() {
    let fix = fixture(RequestSpec::new().with_target("/slow"));
    fix.transport.ignore_cancellation();
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"late": true})).after(Duration::from_millis(40)));

    let (log, record) = recorder();
    let seen = record.clone();
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().on_success(move |_| seen("late-success")),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    fix.owner.dispose();
    handle.wait().await;

    // The transport call resolved successfully, but nothing published.
    assert_eq!(fix.transport.calls(), 1);
    assert!(fix.fetcher.response().is_pending());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disposal_aborts_the_armed_token() {
    let fix = fixture(RequestSpec::new().with_target("/slow"));
    fix.transport
        .enqueue(ScriptedReply::success(200, Value::Null).after(Duration::from_secs(30)));

    let mut handle = fix.fetcher.request(RequestOverrides::none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    fix.owner.dispose();

    // The cancelled call settles promptly instead of running out the
    // scripted thirty seconds.
    handle
        .wait_with_timeout(Duration::from_millis(500))
        .await
        .expect("cancelled operation should settle quickly");
    assert!(fix.fetcher.response().is_pending());
}

// ============================================================================
// Target construction
// ============================================================================

#[tokio::test]
async fn path_params_become_path_segments() {
    let fix = fixture(RequestSpec::new().with_target("/users"));
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().with_params(Params::new().set("id", 5)),
    );
    handle.wait().await;

    assert_eq!(fix.transport.requests()[0].target, "/users/5");
}

#[tokio::test]
async fn omitted_query_values_are_dropped() {
    let fix = fixture(RequestSpec::new().with_target("/search"));
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().with_query(Params::new().set("q", "a").omit("page")),
    );
    handle.wait().await;

    assert_eq!(fix.transport.requests()[0].target, "/search?q=a");
}

#[tokio::test]
async fn basename_prefixes_every_target() {
    let fix = fixture(
        RequestSpec::new()
            .with_basename("/api/")
            .with_target("/users"),
    );
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().with_params(Params::new().set("id", 7)),
    );
    handle.wait().await;

    assert_eq!(fix.transport.requests()[0].target, "/api/users/7");
}

#[tokio::test]
async fn get_requests_never_carry_a_body() {
    let fix = fixture(
        RequestSpec::new()
            .with_target("/things")
            .with_body(json!({"ignored": true})),
    );
    let mut handle = fix.fetcher.request(RequestOverrides::none());
    handle.wait().await;

    assert!(fix.transport.requests()[0].body.is_none());
}

#[tokio::test]
async fn non_get_requests_forward_body_and_headers() {
    let fix = fixture(
        RequestSpec::new()
            .with_target("/things")
            .with_method(Method::POST)
            .with_header("x-tenant", "demo")
            .with_body(json!({"name": "widget"})),
    );
    let mut handle = fix.fetcher.request(RequestOverrides::none());
    handle.wait().await;

    let request = &fix.transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.body, Some(json!({"name": "widget"})));
    assert!(
        request
            .headers
            .contains(&("x-tenant".to_string(), "demo".to_string()))
    );
}

// ============================================================================
// Outcome normalization
// ============================================================================

#[tokio::test]
async fn http_errors_publish_the_real_status_and_body() {
    let fix = fixture(RequestSpec::new().with_target("/missing"));
    fix.transport
        .enqueue(ScriptedReply::http_error(404, json!({"reason": "missing"})));

    let (log, record) = recorder();
    let seen = record.clone();
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().on_failed(move |payload| seen(&format!("failed:{}", payload.status))),
    );
    handle.wait().await;

    let response = fix.fetcher.response();
    let failure = response.failure().unwrap();
    assert_eq!(failure.status, 404);
    assert_eq!(failure.error, json!({"reason": "missing"}));
    assert_eq!(*log.lock().unwrap(), vec!["failed:404".to_string()]);
    assert!(!fix.fetcher.is_loading());
}

#[tokio::test]
async fn network_failures_normalize_to_500() {
    let fix = fixture(RequestSpec::new().with_target("/unreachable"));
    fix.transport.enqueue(ScriptedReply::error(
        TransportError::Network("connection refused".to_string()),
    ));

    let mut handle = fix.fetcher.request(RequestOverrides::none());
    handle.wait().await;

    let response = fix.fetcher.response();
    assert_eq!(response.failure().unwrap().status, 500);
}

#[tokio::test]
async fn success_clears_a_previous_failure() {
    let fix = fixture(RequestSpec::new().with_target("/flaky"));
    fix.transport
        .enqueue(ScriptedReply::http_error(500, json!({"attempt": 1})));
    fix.transport
        .enqueue(ScriptedReply::success(200, json!({"attempt": 2})));

    let mut first = fix.fetcher.request(RequestOverrides::none());
    first.wait().await;
    assert!(fix.fetcher.response().is_failed());

    let mut second = fix.fetcher.request(RequestOverrides::none());
    second.wait().await;

    let response = fix.fetcher.response();
    assert!(response.is_success());
    assert!(response.failure().is_none());
}

#[tokio::test]
async fn default_and_override_callbacks_both_observe_success() {
    let (log, record) = recorder();
    let default_seen = record.clone();
    let fix = fixture(
        RequestSpec::new()
            .with_target("/both")
            .on_success(move |_| default_seen("default")),
    );

    let override_seen = record.clone();
    let mut handle = fix.fetcher.request(
        RequestOverrides::none().on_success(move |_| override_seen("override")),
    );
    handle.wait().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["default".to_string(), "override".to_string()]
    );
}

// ============================================================================
// Observability of state transitions
// ============================================================================

#[tokio::test]
async fn subscribers_see_loading_and_publication() {
    let fix = fixture(RequestSpec::new().with_target("/watched"));
    fix.transport
        .enqueue(ScriptedReply::success(200, Value::Null).after(Duration::from_millis(20)));

    let mut updates = fix.fetcher.subscribe();
    let mut handle = fix.fetcher.request(RequestOverrides::none());

    // First notification: loading flipped on.
    updates.changed().await.unwrap();
    assert!(fix.fetcher.state(|s| s.loading));

    handle.wait().await;
    assert!(fix.fetcher.state(|s| s.response.is_success() && !s.loading));
}

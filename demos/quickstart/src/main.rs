//! Quickstart binary
//!
//! Demonstrates latest-wins request orchestration against a scripted
//! transport: rapid-fire supersession, debounce collapsing, and teardown.

#![allow(clippy::unwrap_used)] // Demo binary, shortest path to output

use lastcall_core::{OwnerHandle, Params, RequestOverrides, RequestSpec};
use lastcall_runtime::Fetcher;
use lastcall_testing::{MockTransport, ScriptedReply};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickstart=debug,lastcall_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Quickstart: latest-wins request orchestration ===\n");

    let transport = Arc::new(MockTransport::new());
    let owner = OwnerHandle::new();
    let fetcher: Fetcher = Fetcher::new(
        Arc::clone(&transport) as Arc<dyn lastcall_core::Transport>,
        owner.clone(),
        RequestSpec::new().with_basename("/api").with_target("/users"),
    );

    // --- Rapid fire: only the second operation may publish -------------
    println!(">>> Issuing two operations back to back");
    transport.enqueue(
        ScriptedReply::success(200, json!({"user": "stale"})).after(Duration::from_millis(80)),
    );
    transport.enqueue(
        ScriptedReply::success(200, json!({"user": "fresh"})).after(Duration::from_millis(20)),
    );

    let _superseded =
        fetcher.request(RequestOverrides::none().with_params(Params::new().set("id", 1)));
    let mut latest =
        fetcher.request(RequestOverrides::none().with_params(Params::new().set("id", 2)));
    latest.wait().await;

    let published = fetcher.response();
    println!(
        "Published result: {}",
        published.success().map(|p| p.result.to_string()).unwrap()
    );

    // --- Debounce: three issues collapse into one call -----------------
    println!("\n>>> Issuing three debounced searches within 60ms");
    let calls_before = transport.calls();
    let mut last_handle = lastcall_runtime::OperationHandle::settled();
    for term in ["r", "ru", "rust"] {
        last_handle = fetcher.request(
            RequestOverrides::none()
                .with_target("/search")
                .with_query(Params::new().set("q", term))
                .with_delay(Duration::from_millis(150)),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    last_handle.wait().await;
    println!(
        "Transport calls for three issues: {}",
        transport.calls() - calls_before
    );
    println!(
        "Final target: {}",
        transport.requests().last().map(|r| r.target.clone()).unwrap()
    );

    // --- Teardown: in-flight work is aborted ---------------------------
    println!("\n>>> Disposing the owner mid-flight");
    transport.enqueue(
        ScriptedReply::success(200, json!({"user": "never seen"}))
            .after(Duration::from_secs(30)),
    );
    let mut doomed = fetcher.request(RequestOverrides::none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    owner.dispose();
    doomed.wait().await;
    println!(
        "Response after teardown is still the last published one: {}",
        fetcher
            .response()
            .success()
            .map(|p| p.result.to_string())
            .unwrap()
    );
}

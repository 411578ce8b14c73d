//! Integration tests for the reqwest transport against a local mock
//! server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use lastcall_core::{CancelToken, Method, Transport, TransportError, TransportRequest};
use lastcall_http::HttpTransport;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(target: &str) -> TransportRequest {
    TransportRequest {
        target: target.to_string(),
        method: Method::GET,
        headers: Vec::new(),
        body: None,
    }
}

#[tokio::test]
async fn success_carries_status_and_decoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "Ada"})))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let reply = transport
        .send(request("/users/5"), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, json!({"id": 5, "name": "Ada"}));
}

#[tokio::test]
async fn query_strings_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let reply = transport
        .send(request("/search?q=a"), CancelToken::new())
        .await
        .unwrap();
    assert_eq!(reply.status, 200);
}

#[tokio::test]
async fn non_2xx_is_an_http_error_with_the_real_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"reason": "missing"})))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let outcome = transport.send(request("/missing"), CancelToken::new()).await;

    match outcome {
        Err(TransportError::Http { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, json!({"reason": "missing"}));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn post_forwards_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/things"))
        .and(header("x-tenant", "demo"))
        .and(body_json(json!({"name": "widget"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": true})))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let reply = transport
        .send(
            TransportRequest {
                target: "/things".to_string(),
                method: Method::POST,
                headers: vec![("x-tenant".to_string(), "demo".to_string())],
                body: Some(json!({"name": "widget"})),
            },
            CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.status, 201);
}

#[tokio::test]
async fn empty_bodies_decode_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let reply = transport
        .send(request("/empty"), CancelToken::new())
        .await
        .unwrap();
    assert_eq!(reply.status, 204);
    assert!(reply.body.is_null());
}

#[tokio::test]
async fn malformed_success_bodies_are_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let outcome = transport.send(request("/garbled"), CancelToken::new()).await;
    assert!(matches!(outcome, Err(TransportError::Decode(_))));
}

#[tokio::test]
async fn abort_interrupts_a_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let token = CancelToken::new();
    let aborter = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        aborter.abort();
    });

    let started = std::time::Instant::now();
    let outcome = transport.send(request("/slow"), token).await;
    assert!(matches!(outcome, Err(TransportError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn already_aborted_tokens_short_circuit() {
    // No server at all: the request must never be attempted.
    let transport = HttpTransport::new("http://127.0.0.1:9");
    let token = CancelToken::new();
    token.abort();

    let outcome = transport.send(request("/anything"), token).await;
    assert!(matches!(outcome, Err(TransportError::Cancelled)));
}

#[tokio::test]
async fn connection_failures_are_network_errors() {
    // Port 9 (discard) is near-guaranteed to refuse connections.
    let transport = HttpTransport::new("http://127.0.0.1:9");
    let outcome = transport
        .send(request("/unreachable"), CancelToken::new())
        .await;
    assert!(matches!(outcome, Err(TransportError::Network(_))));
}

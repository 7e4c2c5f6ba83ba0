//! One-shot refresh and retry on 401.

use super::harness::{authorization, calls, Harness};
use crate::ApiRequest;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn retries_once_with_fresh_token() {
    let h = Harness::start().await;
    let resolver_calls = h.register_sequence(&["stale", "fresh"]);

    Mock::given(method("GET"))
        .and(path("/user/1"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/1"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .expect(1)
        .mount(&h.server)
        .await;

    let response = h.client.send(ApiRequest::get("/user/1")).await.unwrap();
    assert_eq!(response.text(), r#"{"ok":true}"#);
    assert_eq!(calls(&resolver_calls), 2);
}

#[tokio::test]
async fn second_401_is_terminal() {
    let h = Harness::start().await;
    let resolver_calls = h.register_sequence(&["t1", "t2", "t3"]);

    Mock::given(method("GET"))
        .and(path("/user/1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "Token revoked"
        })))
        .expect(2)
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/user/1")).await.unwrap_err();
    assert_eq!(error.status(), 401);
    assert_eq!(error.detail(), Some("Token revoked"));
    assert_eq!(error.message_key(), Some("http.error.401"));

    let requests = h.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(authorization(&requests[0]).as_deref(), Some("Bearer t1"));
    assert_eq!(authorization(&requests[1]).as_deref(), Some("Bearer t2"));
    // One resolve to attach, one to retry, none after the second 401
    assert_eq!(calls(&resolver_calls), 2);
}

#[tokio::test]
async fn retry_body_is_resent() {
    let h = Harness::start().await;
    h.register_sequence(&["stale", "fresh"]);

    Mock::given(method("PUT"))
        .and(path("/user/1"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/user/1"))
        .and(header("authorization", "Bearer fresh"))
        .and(wiremock::matchers::body_json(serde_json::json!({ "username": "lan" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&h.server)
        .await;

    let request = ApiRequest::put("/user/1")
        .json(&serde_json::json!({ "username": "lan" }))
        .unwrap();
    h.client.send(request).await.unwrap();
}

#[tokio::test]
async fn resolve_failure_on_401_is_terminal() {
    let h = Harness::start().await;
    let resolver_calls = h.register_failing_after(1);

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/orders")).await.unwrap_err();
    assert_eq!(error.status(), 401);
    assert_eq!(error.message_key(), Some("http.error.401"));
    assert_eq!(calls(&resolver_calls), 2);
}

#[tokio::test]
async fn empty_fresh_token_is_terminal() {
    let h = Harness::start().await;
    h.register_sequence(&["stale", ""]);

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/orders")).await.unwrap_err();
    assert_eq!(error.status(), 401);
}

#[tokio::test]
async fn unregistered_provider_on_401_is_terminal() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "messageKey": "auth.required"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/orders")).await.unwrap_err();
    assert_eq!(error.status(), 401);
    assert_eq!(error.message_key(), Some("auth.required"));
}

#[tokio::test]
async fn skip_auth_401_is_not_retried() {
    let h = Harness::start().await;
    let resolver_calls = h.register_sequence(&["token"]);

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let error = h
        .client
        .send(ApiRequest::post("/chat").skip_auth())
        .await
        .unwrap_err();
    assert_eq!(error.status(), 401);

    let requests = h.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(authorization(&requests[0]).is_none());
    assert_eq!(calls(&resolver_calls), 0);
}

#[tokio::test]
async fn retry_ending_in_other_error_keeps_that_status() {
    let h = Harness::start().await;
    h.register_sequence(&["stale", "fresh"]);

    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/cart")).await.unwrap_err();
    assert_eq!(error.status(), 403);
    assert!(error.is_client_error());
    assert!(!error.is_hard());
}

//! Network vs HTTP failure normalization.

use super::harness::{closed_port_url, Harness};
use crate::{error_message, is_http_error, ApiClient, ApiRequest, ClientError};
use auth_session::TokenProvider;
use http_problem::MessageCatalog;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn connection_refused_is_status_zero() {
    let catalog = Arc::new(MessageCatalog::with_locale("vi").unwrap());
    let client = ApiClient::new(
        &closed_port_url(),
        Duration::from_secs(2),
        Arc::new(TokenProvider::new()),
        catalog.clone(),
    )
    .unwrap();

    let error = client.send(ApiRequest::get("/user/1")).await.unwrap_err();
    assert_eq!(error.status(), 0);
    assert!(error.is_network_error());
    assert!(error.is_retryable());
    assert!(!error.is_hard());
    assert_eq!(error.message_key(), Some("http.error.network"));
    assert_eq!(error.user_message(&catalog), "Không thể kết nối tới máy chủ");
    assert_eq!(error.method(), Some("GET"));
}

#[tokio::test]
async fn timeout_is_status_zero() {
    let h = Harness::start_with_timeout(Duration::from_millis(100)).await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/slow")).await.unwrap_err();
    assert_eq!(error.status(), 0);
}

#[tokio::test]
async fn problem_detail_is_carried() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "title": "Validation failed",
            "status": 422,
            "messageKey": "user.invalid",
            "params": { "field": "email" },
            "errors": { "email": "must be a valid address" }
        })))
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::post("/user")).await.unwrap_err();
    assert_eq!(error.status(), 422);
    assert_eq!(error.title(), Some("Validation failed"));
    assert_eq!(error.message_key(), Some("user.invalid"));
    assert_eq!(error.params().unwrap()["field"], "email");
    assert_eq!(error.errors().unwrap()["email"], "must be a valid address");
    assert_eq!(error.method(), Some("POST"));
    assert_eq!(error.url(), Some(format!("{}/user", h.server.uri()).as_str()));
}

#[tokio::test]
async fn non_json_error_body_is_tolerated() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
        .mount(&h.server)
        .await;

    let error = h.client.send(ApiRequest::get("/products")).await.unwrap_err();
    assert_eq!(error.status(), 503);
    assert!(error.is_retryable());
    assert!(error.is_hard());
    assert!(error.is_server_error());
    assert!(error.detail().is_none());
    assert_eq!(error.i18n_key(), "http.error.503");
    assert_eq!(
        error.user_message(h.client.catalog()),
        "The service is temporarily unavailable"
    );
}

#[tokio::test]
async fn typed_helpers_surface_http_errors() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/user/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "detail": "User 404 not found"
        })))
        .mount(&h.server)
        .await;

    let error = h
        .client
        .get_json::<serde_json::Value>("/user/404")
        .await
        .unwrap_err();
    assert!(is_http_error(&error));
    assert_eq!(error_message(&error, h.client.catalog()), "User 404 not found");
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/user/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&h.server)
        .await;

    let error = h
        .client
        .get_json::<serde_json::Value>("/user/1")
        .await
        .unwrap_err();
    assert!(matches!(error, ClientError::Decode(_)));
    assert!(!is_http_error(&error));
}

#[tokio::test]
async fn delete_ignores_empty_body() {
    let h = Harness::start().await;

    Mock::given(method("DELETE"))
        .and(path("/cart/items/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.delete("/cart/items/3").await.unwrap();
}

//! Typed user and chat endpoints.

use super::harness::{authorization, Harness};
use crate::api::{ChatApi, ChatProvider, UserApi};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn get_user_by_id_unwraps_envelope() {
    let h = Harness::start().await;
    h.register_sequence(&["token"]);

    Mock::given(method("GET"))
        .and(path("/user/kc-1"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "keycloakId": "kc-1",
                "username": "lan",
                "email": "lan@shop.test",
                "phoneNumber": null,
                "dateOfBirth": "1999-02-03",
                "avatarUrl": null,
                "lastSeenAt": null
            },
            "message": "OK",
            "status": 200,
            "timestamp": "2026-10-18T10:00:00Z"
        })))
        .mount(&h.server)
        .await;

    let user = UserApi::new(h.client.clone())
        .get_current_user("kc-1")
        .await
        .unwrap();
    assert_eq!(user.keycloak_id, "kc-1");
    assert_eq!(user.username, "lan");
    assert_eq!(user.date_of_birth.as_deref(), Some("1999-02-03"));
    assert!(user.avatar_url.is_none());
}

#[tokio::test]
async fn chat_is_public() {
    let h = Harness::start().await;
    h.register_sequence(&["token"]);

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(serde_json::json!({
            "question": "Which shoes fit wide feet?",
            "provider": "gemini"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "provider": "gemini",
            "answer": "Try the wide-fit range."
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let reply = ChatApi::new(h.client.clone())
        .ask("  Which shoes fit wide feet? ", Some(ChatProvider::Gemini))
        .await
        .unwrap();
    assert_eq!(reply.provider, "gemini");
    assert_eq!(reply.answer, "Try the wide-fit range.");

    let requests = h.requests().await;
    assert!(authorization(&requests[0]).is_none());
}

#[tokio::test]
async fn get_user_by_id_encodes_the_id_segment() {
    let h = Harness::start().await;
    h.register_sequence(&["token"]);

    Mock::given(method("GET"))
        .and(path("/user/a%2Fb%3Fc%23d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "keycloakId": "a/b?c#d",
                "username": "odd",
                "email": "odd@shop.test"
            },
            "message": "OK",
            "status": 200,
            "timestamp": "2026-10-18T10:00:00Z"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = UserApi::new(h.client.clone())
        .get_user_by_id("a/b?c#d")
        .await
        .unwrap();
    assert_eq!(user.keycloak_id, "a/b?c#d");

    let requests = h.requests().await;
    assert!(requests[0].url.query().is_none());
}

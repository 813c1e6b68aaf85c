//! End-to-end test — build the router over the in-memory store and a stub
//! AI client, then walk the signup → login → new conversation → chat →
//! history flow a browser client performs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use genai_chat::{AccountService, AppState, ChatService, CompletionService, MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

struct StubAI;

#[async_trait]
impl CompletionService for StubAI {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(format!("echo: {prompt}"))
    }
}

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        accounts: Arc::new(AccountService::new(store.clone())),
        chat: Arc::new(ChatService::new(store, Arc::new(StubAI))),
        google: None,
        jwt_secret: Arc::new("test-secret".to_string()),
    };
    genai_chat::router(state)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json, cookie)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn full_signup_login_chat_history_flow() {
    let app = app();

    // Signup
    let (status, body, _) = send_json(
        &app,
        "POST",
        "/signup",
        json!({"name": "A", "email": "a@x.com", "password": "secret123"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["userId"].as_str().unwrap().to_string();

    // Login sets an httpOnly session cookie
    let (status, body, cookie) = send_json(
        &app,
        "POST",
        "/login",
        json!({"email": "a@x.com", "password": "secret123"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], user_id.as_str());
    let cookie = cookie.expect("login sets a cookie");
    assert!(cookie.starts_with("authToken="));
    assert!(cookie.contains("HttpOnly"));

    // New conversation: empty, named after the user
    let (status, body, _) =
        send_json(&app, "POST", &format!("/chat/new/{user_id}"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "A");
    let conv_id = body["conversation"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["conversation"]["messages"].as_array().unwrap().len(), 0);

    // Chat into that conversation
    let (status, body, _) = send_json(
        &app,
        "POST",
        "/chat",
        json!({"question": "hi", "userId": user_id, "messageId": conv_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aiResponse"], "echo: hi");
    assert_eq!(body["conversationId"], conv_id.as_str());

    // History shows exactly one conversation with the message pair
    let (status, body) = get_json(&app, &format!("/chat/history/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["id"], conv_id.as_str());
    let messages = conversations[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["sender"], "user");
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[1]["sender"], "assistant");

    // Single-conversation lookup
    let (status, body, _) = send_json(
        &app,
        "POST",
        &format!("/user/history/{user_id}"),
        json!({"messageId": conv_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_signup_returns_machine_readable_code() {
    let app = app();

    send_json(
        &app,
        "POST",
        "/signup",
        json!({"name": "A", "email": "a@x.com", "password": "secret123"}),
    )
    .await;

    let (status, body, _) = send_json(
        &app,
        "POST",
        "/signup",
        json!({"name": "B", "email": "a@x.com", "password": "other"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_email");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn history_of_unknown_user_is_empty_not_an_error() {
    let app = app();
    let (status, body) = get_json(&app, "/chat/history/nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn chat_with_unknown_id_reports_the_minted_conversation() {
    let app = app();

    let (_, body, _) = send_json(
        &app,
        "POST",
        "/signup",
        json!({"name": "A", "email": "a@x.com", "password": "secret123"}),
    )
    .await;
    let user_id = body["userId"].as_str().unwrap().to_string();

    let (status, body, _) = send_json(
        &app,
        "POST",
        "/chat",
        json!({"question": "hi", "userId": user_id, "messageId": "pre-allocated"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["conversationId"], "pre-allocated");

    let (_, history) = get_json(&app, &format!("/chat/history/{user_id}")).await;
    assert_eq!(history["conversations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_conversation_lookup_is_404() {
    let app = app();
    let (status, body, _) = send_json(
        &app,
        "POST",
        "/user/history/u1",
        json!({"messageId": "missing"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn session_probe_accepts_cookie_and_rejects_absence() {
    let app = app();

    send_json(
        &app,
        "POST",
        "/signup",
        json!({"name": "A", "email": "a@x.com", "password": "secret123"}),
    )
    .await;
    let (_, _, cookie) = send_json(
        &app,
        "POST",
        "/login",
        json!({"email": "a@x.com", "password": "secret123"}),
    )
    .await;
    let cookie = cookie.unwrap();
    let cookie_pair = cookie.split(';').next().unwrap().to_string();

    let req = Request::builder()
        .uri("/auth")
        .header(header::COOKIE, cookie_pair)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = get_json(&app, "/auth").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::chat::ChatService;
use crate::error::{AppError, AppResult};
use crate::models::Conversation;
use crate::oauth::GoogleOAuthClient;
use crate::users::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub chat: Arc<ChatService>,
    pub google: Option<Arc<GoogleOAuthClient>>,
    pub jwt_secret: Arc<String>,
}

async fn health_check() -> impl IntoResponse {
    "Chat server is running"
}

// --- Account handlers ---

// Fields default to empty so a missing field surfaces as the service's
// validation error rather than a body-rejection.
#[derive(Deserialize, Default)]
#[serde(default)]
struct SignupReq {
    name: String,
    email: String,
    password: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupReq>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .accounts
        .signup(&req.name, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully!",
            "userId": user.id,
        })),
    ))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginReq {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginReq>,
) -> AppResult<impl IntoResponse> {
    let user = state.accounts.login(&req.email, &req.password).await?;

    let token = auth::generate_token(&user.id, &user.email, state.jwt_secret.as_bytes())
        .map_err(AppError::persistence)?;

    Ok((
        jar.add(auth::auth_cookie(&token)),
        Json(json!({
            "message": "Login successful",
            "userId": user.id,
        })),
    ))
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(auth::clear_auth_cookie()), Redirect::to("/"))
}

/// Session probe: verifies the auth cookie and echoes the claims.
async fn auth_check(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let claims = jar
        .get(auth::AUTH_COOKIE)
        .and_then(|c| auth::verify_token(c.value(), state.jwt_secret.as_bytes()));

    match claims {
        Some(claims) => (
            StatusCode::OK,
            Json(json!({
                "message": "Authenticated successfully",
                "userId": claims.sub,
                "email": claims.email,
            })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        ),
    }
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = state.accounts.get_user(&id).await?;
    Ok(Json(user))
}

// --- Chat handlers ---

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ChatReq {
    question: String,
    user_id: String,
    // Legacy wire name for the conversation id.
    message_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResp {
    ai_response: String,
    conversation_id: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatReq>,
) -> AppResult<Json<ChatResp>> {
    let reply = state
        .chat
        .handle_chat(&req.question, &req.user_id, &req.message_id)
        .await?;

    Ok(Json(ChatResp {
        ai_response: reply.assistant_text,
        conversation_id: reply.conversation_id,
    }))
}

#[derive(Serialize)]
struct HistoryResp {
    conversations: Vec<Conversation>,
}

async fn chat_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<HistoryResp>> {
    let conversations = state.chat.get_history(&user_id).await?;
    Ok(Json(HistoryResp { conversations }))
}

async fn chat_new(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    // The sidebar shows the owner's name next to the fresh conversation.
    let user = state.accounts.get_user(&user_id).await?;
    let conversation = state.chat.start_conversation(&user_id).await?;

    Ok(Json(json!({
        "conversation": conversation,
        "name": user.name,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ConversationLookupReq {
    message_id: String,
}

async fn user_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ConversationLookupReq>,
) -> AppResult<impl IntoResponse> {
    let conversation = state
        .chat
        .get_conversation(&user_id, &req.message_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": conversation,
    })))
}

// --- Google OAuth handlers ---

fn google_client(state: &AppState) -> AppResult<Arc<GoogleOAuthClient>> {
    state
        .google
        .clone()
        .ok_or_else(|| AppError::NotFound("Google login is not configured".into()))
}

async fn google_redirect(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let client = google_client(&state)?;
    Ok(Redirect::to(&client.authorize_url()))
}

#[derive(Deserialize)]
struct OAuthCallbackParams {
    code: Option<String>,
}

async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> AppResult<impl IntoResponse> {
    let client = google_client(&state)?;
    let code = params
        .code
        .ok_or_else(|| AppError::Validation("missing authorization code".into()))?;

    let profile = client
        .exchange_code(&code)
        .await
        .map_err(|e| AppError::Upstream(format!("{e:#}")))?;

    let user = state.accounts.google_login(profile).await?;
    let token = auth::generate_token(&user.id, &user.email, state.jwt_secret.as_bytes())
        .map_err(AppError::persistence)?;

    Ok((jar.add(auth::auth_cookie(&token)), Redirect::to("/")))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/auth", get(auth_check))
        .route("/chat", post(chat))
        .route("/chat/history/{user_id}", get(chat_history))
        .route("/chat/new/{user_id}", post(chat_new))
        .route("/user/history/{user_id}", post(user_history))
        .route("/user/{id}", get(get_user))
        .route("/google", get(google_redirect))
        .route("/google-auth/callback", get(google_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

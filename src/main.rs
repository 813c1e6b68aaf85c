use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use genai_chat::{
    connect_turso, AIService, AccountService, AppConfig, AppState, ChatService, HistoryStore,
    MemoryStore, UserStore,
};
use genai_chat::oauth::GoogleOAuthClient;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting GenAI chat server...");
    let config = AppConfig::load()?;

    let (users, histories): (Arc<dyn UserStore>, Arc<dyn HistoryStore>) =
        match (&config.turso_db_url, &config.turso_auth_token) {
            (Some(url), Some(token)) => {
                let store = Arc::new(connect_turso(url, token).await?);
                info!("✓ Turso connected");
                (store.clone(), store)
            }
            _ => {
                warn!("TURSO_DATABASE_URL not set, using in-memory store");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    // One AI client for the whole process, shared by every request.
    let ai = Arc::new(AIService::new(
        config.groq_model.clone(),
        config.groq_api_key.clone(),
    ));

    let google = match (&config.google_client_id, &config.google_client_secret) {
        (Some(id), Some(secret)) => Some(Arc::new(GoogleOAuthClient::new(
            id.clone(),
            secret.clone(),
            config.google_redirect_url.clone(),
        ))),
        _ => {
            warn!("GOOGLE_CLIENT_ID not set, Google login disabled");
            None
        }
    };

    let state = AppState {
        accounts: Arc::new(AccountService::new(users)),
        chat: Arc::new(ChatService::new(histories, ai)),
        google,
        jwt_secret: Arc::new(config.access_token_secret.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(config.client_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = genai_chat::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("🚀 Server ready on {}", addr);
    info!("🤖 AI model: {}", config.groq_model);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

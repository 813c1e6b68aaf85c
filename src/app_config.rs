use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // --- Server ---
    pub port: String,
    pub client_url: String,

    // --- Turso (absent => in-memory store) ---
    pub turso_db_url: Option<String>,
    pub turso_auth_token: Option<String>,

    // --- AI ---
    pub groq_model: String,
    pub groq_api_key: String,

    // --- Auth ---
    pub access_token_secret: String,

    // --- Google OAuth (absent => password login only) ---
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // dotenv belongs HERE, nowhere else
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env::var("PORT").unwrap_or_else(|_| "5000".into()),
            client_url: env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".into()),

            turso_db_url: env::var("TURSO_DATABASE_URL").ok(),
            turso_auth_token: env::var("TURSO_AUTH_TOKEN").ok(),

            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".into()),
            groq_api_key: env::var("GROQ_API_KEY").context("GROQ_API_KEY missing")?,

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET missing")?,

            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
            google_redirect_url: env::var("GOOGLE_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/google-auth/callback".into()),
        })
    }
}

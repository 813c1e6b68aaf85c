use anyhow::{Context, Result};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Cookie carrying the session JWT.
pub const AUTH_COOKIE: &str = "authToken";

/// Session lifetime: 7 days.
const SESSION_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, BCRYPT_COST).context("bcrypt hash")
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("bcrypt verify")
}

/// Generate a signed session token (HS256).
pub fn generate_token(user_id: &str, email: &str, secret: &[u8]) -> Result<String> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + Duration::seconds(SESSION_EXPIRY_SECS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .context("jwt encode")
}

/// Verify a session token, returning the claims on success.
pub fn verify_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Build the httpOnly session cookie.
pub fn auth_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(false) // TODO: set true once served over TLS
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(time::Duration::seconds(SESSION_EXPIRY_SECS))
        .build()
}

/// Build an expired cookie that clears the session.
pub fn clear_auth_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(false)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(time::Duration::ZERO)
        .build()
}

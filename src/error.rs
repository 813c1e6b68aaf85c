use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Convenience alias for service and handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application errors with a fixed HTTP status mapping. Every variant is
/// terminal for the current request; nothing is retried internally.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please login with Google")]
    GoogleOnlyAccount,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("AI service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Persistence(String),
}

impl AppError {
    /// Wrap a store failure, keeping the source chain in the message.
    pub fn persistence(e: anyhow::Error) -> Self {
        AppError::Persistence(format!("{e:#}"))
    }

    /// Stable machine-readable code, exposed alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::GoogleOnlyAccount => "google_only_account",
            AppError::NotFound(_) => "not_found",
            AppError::Upstream(_) => "upstream_error",
            AppError::Persistence(_) => "persistence_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::InvalidCredentials
            | AppError::GoogleOnlyAccount => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Upstream details stay in the logs; the client gets a retry hint.
            AppError::Upstream(detail) => {
                error!("upstream AI failure: {detail}");
                "The AI service is currently unavailable, please try again".to_string()
            }
            AppError::Persistence(detail) => {
                error!("persistence failure: {detail}");
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorBody {
            error: self.code(),
            message,
        });
        (self.status(), body).into_response()
    }
}

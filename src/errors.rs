use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::{
    db_persistence::DbError,
    handlers::{auth::AuthHandlerError, ErrorResponse, HandlerError},
    services::{identity_service::IdentityError, token_service::TokenError, tonapi_client::TonApiError},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("TonAPI error: {0}")]
    TonApi(#[from] TonApiError),
    #[error("Server error: {0}")]
    Server(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Handler(HandlerError::Auth(err)) => match err {
                AuthHandlerError::InvalidProof => (StatusCode::BAD_REQUEST, "Invalid proof".to_string()),
                AuthHandlerError::PayloadMismatch => (StatusCode::BAD_REQUEST, "Invalid payload".to_string()),
                AuthHandlerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            },
            AppError::Identity(err) => match err {
                IdentityError::InvalidProof => (StatusCode::BAD_REQUEST, "Invalid proof".to_string()),
                IdentityError::PayloadMismatch => (StatusCode::BAD_REQUEST, "Invalid payload".to_string()),
                IdentityError::Token(TokenError::Signing(_)) => internal_error(self),
                IdentityError::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string()),
                IdentityError::NotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
                IdentityError::Conflict => conflict(),
                IdentityError::Database(_) => internal_error(self),
            },
            AppError::Token(TokenError::Signing(_)) => internal_error(self),
            AppError::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string()),
            AppError::Database(DbError::IdentityNotFound(_)) => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AppError::Database(DbError::Conflict(_)) => conflict(),
            _ => internal_error(self),
        }
    }
}

fn conflict() -> (StatusCode, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "Wallet link is being updated concurrently, please retry".to_string(),
    )
}

fn internal_error(err: &AppError) -> (StatusCode, String) {
    tracing::error!(error = %err, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        let body = Json(ErrorResponse { status: "fail", message });

        (status, body).into_response()
    }
}

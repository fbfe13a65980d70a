use serde::Serialize;

use crate::handlers::auth::AuthHandlerError;

pub mod auth;
pub mod identity;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Auth handler error: {0}")]
    Auth(#[from] AuthHandlerError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

//! # TonLink Library
//!
//! Links TON wallets to platform accounts. A wallet proves ownership with a
//! TON Connect `ton_proof`, the server checks the signature against the
//! wallet's StateInit and records the binding for the calling account.

pub mod config;
pub mod db_persistence;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod ton;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use db_persistence::{DbError, DbPersistence};
pub use errors::{AppError, AppResult};
pub use http_server::AppState;
pub use services::{
    identity_service::{IdentityError, IdentityService},
    ton_proof_service::TonProofService,
    token_service::{TokenError, TokenService},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}

/// Get the library name
pub fn name() -> &'static str {
    NAME
}

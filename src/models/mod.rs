#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid data input")]
    InvalidInput,
}

pub type ModelResult<T> = Result<T, ModelError>;

pub mod auth;
pub mod identity;
pub mod ton_proof;

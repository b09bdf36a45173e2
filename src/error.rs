//! Error types
//!
//! Record-level rejections are not errors; they travel as
//! [`ConflictKind`](crate::model::ConflictKind) entries in an apply result.

use thiserror::Error;

/// Failure of a store round-trip as a whole
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Crate-level error for configuration, logging and store access
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

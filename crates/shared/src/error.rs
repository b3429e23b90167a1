//! Error types for Trichat

use thiserror::Error;

/// Typed outcome of every store and service call.
///
/// Callers match on the variant instead of parsing a flattened message, so
/// "nothing there" and "upstream broke" stay distinguishable.
#[derive(Debug, Error)]
pub enum TrichatError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrichatError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<sqlx::Error> for TrichatError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => TrichatError::NotFound("row".to_string()),
            other => TrichatError::Database(other.to_string()),
        }
    }
}

pub type TrichatResult<T> = Result<T, TrichatError>;

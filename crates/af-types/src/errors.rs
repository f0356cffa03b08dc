//! Error types and conversions
//!
//! The taxonomy separates errors that fail fast before any network activity
//! (`Validation`, `Config`) from errors where a request was sent but no
//! usable response came back (`Transport`), and from errors where a response
//! arrived but was semantically invalid (`Protocol`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for String {
    fn from(err: AuthError) -> String {
        err.to_string()
    }
}

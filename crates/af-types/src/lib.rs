//! Shared error types for authflow

pub mod errors;

pub use errors::{AuthError, AuthResult};

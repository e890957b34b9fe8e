//! Error types for the todo API client.

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400: the server rejected the input. Carries the server's message.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 404: the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// Any other unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}

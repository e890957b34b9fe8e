//! Error taxonomy for the HTTP layer.
//!
//! Each variant knows its status code. Storage and internal failures are
//! logged here and reach the client only as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

const NOT_FOUND_MESSAGE: &str = "Todo not found";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing input; the message is returned to the client.
    #[error("{0}")]
    Validation(String),

    #[error("todo not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A blocking store task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body for every non-2xx response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(message) => message,
            ApiError::NotFound => NOT_FOUND_MESSAGE.to_string(),
            ApiError::Storage(err) => {
                error!(error = %err, "todo store operation failed");
                INTERNAL_MESSAGE.to_string()
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "todo request failed");
                INTERNAL_MESSAGE.to_string()
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

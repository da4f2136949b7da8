//! API error types
//!
//! Attach failures and malformed requests surface to the admin client
//! as plain-text 4xx responses; the message is the whole body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::debug;

use tapwire_core::TapError;

/// Admin surface errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (missing body, malformed payload, attach
    /// rejection)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TapError> for ApiError {
    fn from(err: TapError) -> Self {
        match err {
            TapError::AlreadyAttached
            | TapError::MissingTapConfig
            | TapError::UnknownConfigId(_)
            | TapError::UnsupportedFormat(_) => Self::BadRequest(err.to_string()),
            TapError::Render(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(error = %self, "admin tap request rejected");
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Result type for admin surface handlers
pub type Result<T> = std::result::Result<T, ApiError>;

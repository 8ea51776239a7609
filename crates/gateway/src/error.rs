//! HTTP error mapping.
//!
//! Handlers return [`ApiError`]. Validation failures become 400 responses;
//! failed commands, failed read-backs and local I/O failures become 500
//! responses. Diagnostics are logged here; the caller only sees the message.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use protocol::{ErrorResponse, ProtocolError};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::process::CommandError;

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input, or a path that does not exist.
    #[error("{0}")]
    Validation(String),

    /// An external command failed or could not run.
    #[error("{message}")]
    Command {
        message: String,
        #[source]
        source: CommandError,
    },

    /// A command reported success but the read-back disagrees.
    #[error("{0}")]
    Postcondition(String),

    /// Local temporary file handling failed.
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn command(message: impl Into<String>, source: CommandError) -> Self {
        ApiError::Command {
            message: message.into(),
            source,
        }
    }

    pub fn postcondition(message: impl Into<String>) -> Self {
        ApiError::Postcondition(message.into())
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        ApiError::Io {
            message: message.into(),
            source,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Command { .. } | ApiError::Postcondition(_) | ApiError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(message) => {
                debug!(error = %message, "Rejected request");
            }
            ApiError::Command { message, source } => {
                error!(error = %source, "{}", message);
            }
            ApiError::Postcondition(message) => {
                warn!("Post-condition check failed: {}", message);
            }
            ApiError::Io { message, source } => {
                error!(error = %source, "{}", message);
            }
        }

        let body = ErrorResponse::new(self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

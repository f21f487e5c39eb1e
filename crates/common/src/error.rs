//! Common error types shared across crates.

use thiserror::Error;

use crate::protocol::{ErrorResponse, MessageResponse};

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Database`] → 500
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Connecting to or talking with the database failed.
    ///
    /// Carries the driver's message verbatim; it is returned to the client
    /// unmodified, so it may reveal deployment details.
    #[error("{0}")]
    Database(String),

    /// An unexpected internal error occurred.
    #[error("{0}")]
    Internal(String),
}

/// Response body for a [`ServiceError`], shaped per status class.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// `{"message": ...}` — used for 404.
    Message(MessageResponse),
    /// `{"error": ...}` — used for 5xx.
    Error(ErrorResponse),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Database(_) => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Returns the JSON body that accompanies [`Self::http_status`].
    pub fn body(&self) -> ErrorBody {
        match self {
            ServiceError::NotFound(msg) => ErrorBody::Message(MessageResponse::new(msg.clone())),
            ServiceError::Database(msg) | ServiceError::Internal(msg) => {
                ErrorBody::Error(ErrorResponse::new(msg.clone()))
            }
        }
    }
}

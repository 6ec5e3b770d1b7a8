//! Error types for the Zep client.
//!
//! # Design
//! Failures are categorized by HTTP status code alone. Each status-derived
//! variant carries an [`ApiError`] with the raw body; `message` is filled in
//! only when the body decodes as the service's `{"message": ...}` envelope.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// A non-success response from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: Option<String>,
    pub body: String,
}

impl ApiError {
    /// Build an error from a raw body, decoding the message when possible.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|decoded| decoded.message);
        Self {
            status,
            message,
            body: body.to_string(),
        }
    }

    pub(crate) fn with_message(status: u16, message: impl Into<String>, body: &str) -> Self {
        Self {
            status,
            message: Some(message.into()),
            body: body.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "HTTP {}: {message}", self.status),
            None => write!(f, "HTTP {}: {}", self.status, self.body),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// A failure below HTTP: connection refused, timeout, malformed response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Errors returned by every client in this crate.
#[derive(Debug, Error)]
pub enum ZepError {
    #[error("bad request: {0}")]
    BadRequest(ApiError),

    #[error("unauthorized: {0}")]
    Unauthorized(ApiError),

    #[error("not found: {0}")]
    NotFound(ApiError),

    #[error("internal server error: {0}")]
    InternalServerError(ApiError),

    /// Any status the endpoint does not document.
    #[error("api error: {0}")]
    Api(ApiError),

    /// The transport kept failing until the attempt budget ran out.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server is unreachable or reported itself unhealthy.
    #[error("{0}")]
    Server(String),

    #[error("invalid server version {0:?}")]
    Version(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ZepError {
    /// The HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        self.api_error().map(|error| error.status)
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ZepError::BadRequest(error)
            | ZepError::Unauthorized(error)
            | ZepError::NotFound(error)
            | ZepError::InternalServerError(error)
            | ZepError::Api(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ZepError::NotFound(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ZepError>;

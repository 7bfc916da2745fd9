//! Error types for the gateway

use crate::server::Ack;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clima_core::CallError;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Startup and plumbing errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// gRPC transport error (initial dial)
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics error
    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Failure of one `POST /clima` request, as the producer sees it
///
/// Only the status class and a fixed message reach the caller; the detail
/// stays in the logs.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Anything but POST on the ingest route
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Body did not parse as a reading
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tweet service call failed
    #[error("downstream call failed: {0}")]
    Downstream(#[from] CallError),
}

impl IngestError {
    /// HTTP status the producer receives
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IngestError::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let message = match &self {
            IngestError::MethodNotAllowed => "method not allowed",
            IngestError::InvalidInput(_) => "invalid input",
            IngestError::Downstream(_) => "internal processing error",
        };
        (self.status_code(), Json(Ack::error(message))).into_response()
    }
}

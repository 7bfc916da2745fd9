//! Error taxonomy for a single `SendTweet` attempt

use crate::proto::Rejection;
use std::time::Duration;
use thiserror::Error;
use tonic::{Code, Status};

/// Classified failure of one call from the gateway to the tweet service
///
/// Transport-level variants ([`CallError::DeadlineExceeded`],
/// [`CallError::Unavailable`]) describe the channel, not the request; the
/// remaining variants are answers the service actually gave.
///
/// # Example
///
/// ```
/// use clima_core::CallError;
///
/// let err = CallError::from(tonic::Status::unavailable("connection refused"));
/// assert!(err.is_transport());
/// assert_eq!(err.code(), tonic::Code::Unavailable);
/// ```
#[derive(Error, Debug)]
pub enum CallError {
    /// No response arrived before the caller's deadline
    ///
    /// The service may still complete the call after this is reported.
    #[error("deadline exceeded after {}ms", .0.as_millis())]
    DeadlineExceeded(Duration),

    /// The channel could not reach the service
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The circuit breaker is open; the call was never attempted
    #[error("circuit open, call not attempted")]
    CircuitOpen,

    /// The service refused the request as invalid
    #[error("rejected: {reason} (missing: {})", .missing_fields.join(", "))]
    Rejected {
        /// Why the request was refused
        reason: String,
        /// Names of the empty request fields
        missing_fields: Vec<String>,
    },

    /// Any other status returned by the service, unchanged
    #[error("service error: {0}")]
    Status(Status),
}

impl CallError {
    /// gRPC code equivalent of this failure
    pub fn code(&self) -> Code {
        match self {
            CallError::DeadlineExceeded(_) => Code::DeadlineExceeded,
            CallError::Unavailable(_) | CallError::CircuitOpen => Code::Unavailable,
            CallError::Rejected { .. } => Code::InvalidArgument,
            CallError::Status(status) => status.code(),
        }
    }

    /// Whether the failure says something about the channel rather than the request
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CallError::DeadlineExceeded(_) | CallError::Unavailable(_)
        )
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::DeadlineExceeded(_) => "deadline_exceeded",
            CallError::Unavailable(_) => "unavailable",
            CallError::CircuitOpen => "circuit_open",
            CallError::Rejected { .. } => "rejected",
            CallError::Status(_) => "status",
        }
    }
}

impl From<Status> for CallError {
    fn from(status: Status) -> Self {
        if let Some(rejection) = Rejection::from_status(&status) {
            return CallError::Rejected {
                reason: rejection.reason,
                missing_fields: rejection.missing_fields,
            };
        }

        match status.code() {
            // Server-reported deadline; the local timeout carries the real budget
            Code::DeadlineExceeded => CallError::DeadlineExceeded(Duration::ZERO),
            Code::Unavailable => CallError::Unavailable(status.message().to_string()),
            _ => CallError::Status(status),
        }
    }
}

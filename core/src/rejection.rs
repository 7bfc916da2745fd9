//! Structured validation failures carried in gRPC status details

use crate::proto::{Rejection, TweetRequest};
use bytes::Bytes;
use prost::Message;
use tonic::{Code, Status};

/// Reason used when a request is missing one of its fields
pub const INCOMPLETE_DATA: &str = "incomplete data";

impl Rejection {
    /// Check a request for empty fields, returning the rejection if any are missing
    pub fn check(request: &TweetRequest) -> Option<Rejection> {
        let missing_fields: Vec<String> = [
            ("description", &request.description),
            ("country", &request.country),
            ("weather", &request.weather),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.to_string())
        .collect();

        if missing_fields.is_empty() {
            None
        } else {
            Some(Rejection {
                reason: INCOMPLETE_DATA.to_string(),
                missing_fields,
            })
        }
    }

    /// Human-readable status text, always prefixed with `Error:`
    pub fn status_message(&self) -> String {
        format!("Error: {}", self.reason)
    }

    /// Recover a rejection from an `INVALID_ARGUMENT` status
    ///
    /// Returns `None` for any other code or when the details don't decode.
    pub fn from_status(status: &Status) -> Option<Rejection> {
        if status.code() != Code::InvalidArgument || status.details().is_empty() {
            return None;
        }
        Rejection::decode(status.details()).ok()
    }
}

impl From<Rejection> for Status {
    fn from(rejection: Rejection) -> Self {
        let message = rejection.status_message();
        Status::with_details(
            Code::InvalidArgument,
            message,
            Bytes::from(rejection.encode_to_vec()),
        )
    }
}

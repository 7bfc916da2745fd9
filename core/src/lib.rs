//! clima-core - Shared contract for the clima relay
//!
//! Everything both sides of the relay agree on lives here:
//!
//! - [`Reading`] - the JSON observation the gateway ingests
//! - [`proto`] - the `clima.v1` wire types and gRPC stubs
//! - [`CallError`] - how a single `SendTweet` attempt can fail
//! - [`logging`] and [`signal`] - process plumbing shared by both binaries
//!
//! ```text
//! producer ──HTTP──► clima-gateway ──gRPC──► clima-service
//!                        │                        │
//!                        └──── clima-core ────────┘
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

mod error;
/// Tracing subscriber setup
pub mod logging;
mod reading;
mod rejection;
/// Termination signal handling
pub mod signal;

// Proto types generated from clima/v1/tweet.proto
pub mod proto {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::derive_partial_eq_without_eq)]
    #![allow(missing_docs)]

    tonic::include_proto!("clima.v1");

    /// Encoded descriptor set for the reflection service
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("clima_descriptor");

    pub use tweet_service_client::TweetServiceClient;
    pub use tweet_service_server::{TweetService, TweetServiceServer};
}

pub use error::CallError;
pub use logging::LogFormat;
pub use proto::{Rejection, TweetRequest, TweetResponse};
pub use reading::Reading;
pub use rejection::INCOMPLETE_DATA;

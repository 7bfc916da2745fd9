//! Outbound side of the gateway
//!
//! A [`TweetSink`] delivers one `SendTweet` call under a deadline. The
//! production stack is a [`GrpcSink`] behind a [`CircuitBreakerSink`]:
//!
//! ```text
//! handler ──► CircuitBreakerSink ──► GrpcSink ──► supervised Channel ──► service
//! ```

mod circuit_breaker;
mod grpc;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerSink, CircuitState};
pub use grpc::GrpcSink;

use async_trait::async_trait;
use clima_core::{CallError, TweetRequest, TweetResponse};
use std::time::Duration;

/// Delivers tweets to the tweet service
///
/// # Implementation Requirements
///
/// - Must be `Send + Sync`; one instance serves every in-flight request
/// - `send` makes exactly one attempt; retry policy belongs to the caller
/// - `send` must return within roughly `deadline`
#[async_trait]
pub trait TweetSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Issue one call and wait at most `deadline` for the answer
    async fn send(
        &self,
        request: TweetRequest,
        deadline: Duration,
    ) -> Result<TweetResponse, CallError>;

    /// Whether the sink believes the service is reachable
    async fn health(&self) -> bool {
        true
    }
}

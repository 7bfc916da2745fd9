//! clima-gateway - HTTP ingestion gateway
//!
//! Accepts weather readings over HTTP and relays each one as a single
//! `clima.v1.TweetService/SendTweet` call, answering the producer
//! synchronously.
//!
//! ```text
//! POST /clima ──► server ──► CircuitBreakerSink ──► GrpcSink ──► clima-service
//! ```
//!
//! The outbound sink is built once at startup and injected into the router
//! through [`server::AppState`]; there is no global client.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod sink;

pub use config::GatewayConfig;
pub use error::{GatewayError, IngestError, Result};
pub use metrics::Metrics;
pub use server::{Ack, AppState, router, serve};
pub use sink::{
    CircuitBreakerConfig, CircuitBreakerSink, CircuitState, GrpcSink, TweetSink,
};

//! clima-service - gRPC tweet service
//!
//! Terminates `clima.v1.TweetService/SendTweet` calls relayed by the
//! gateway: validates, logs, journals, answers. Also serves the standard
//! `grpc.health.v1` and reflection services.
//!
//! # Example
//!
//! ```ignore
//! let config = ServiceConfig::from_env()?;
//! let handler = TweetHandler::new(TweetJournal::new(config.journal_capacity));
//! let server = RpcServer::bind(&config, handler).await?;
//! server.serve_with_shutdown(clima_core::signal::shutdown_signal()).await?;
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod error;
pub mod handler;
pub mod journal;
pub mod server;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use handler::TweetHandler;
pub use journal::{ProcessedTweet, TweetJournal};
pub use server::{RpcServer, ShutdownOutcome};

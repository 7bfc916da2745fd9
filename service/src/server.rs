//! gRPC server lifecycle: bind, serve, bounded graceful drain
//!
//! ```text
//! bind ──► SERVING ──signal──► NOT_SERVING + drain ──► Drained
//!                                      │
//!                                      └─ drain_timeout ──► Forced (abort)
//! ```

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use clima_core::proto::{FILE_DESCRIPTOR_SET, TweetService, TweetServiceServer};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic_health::ServingStatus;
use tracing::{info, warn};

/// How the server stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight call finished inside the drain window
    Drained,
    /// The drain window elapsed and the server task was aborted
    Forced,
}

/// A bound, not-yet-serving tweet service
pub struct RpcServer<S> {
    listener: TcpListener,
    service: S,
    drain_timeout: Duration,
    max_message_bytes: usize,
}

impl<S: TweetService> RpcServer<S> {
    /// Bind the listening socket
    ///
    /// A bind failure is fatal for the process; there is no retry.
    pub async fn bind(config: &ServiceConfig, service: S) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: config.listen_addr,
                source,
            })?;

        Ok(Self {
            listener,
            service,
            drain_timeout: config.drain_timeout,
            max_message_bytes: config.max_message_bytes,
        })
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `signal` resolves, then drain
    ///
    /// Health flips to `NOT_SERVING` as soon as the signal arrives. New
    /// connections are refused while in-flight calls finish, for at most
    /// `drain_timeout`.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<ShutdownOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;

        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<TweetServiceServer<S>>()
            .await;
        health_reporter
            .set_service_status("", ServingStatus::Serving)
            .await;

        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|e| ServiceError::Reflection(e.to_string()))?;

        let tweet_service = TweetServiceServer::new(self.service)
            .max_decoding_message_size(self.max_message_bytes)
            .max_encoding_message_size(self.max_message_bytes);

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let incoming = TcpListenerStream::new(self.listener);

        let mut server = tokio::spawn(
            Server::builder()
                .add_service(health_service)
                .add_service(reflection_service)
                .add_service(tweet_service)
                .serve_with_incoming_shutdown(incoming, async move {
                    let _ = drain_rx.await;
                }),
        );

        info!(%addr, "Tweet service listening (health + reflection enabled)");

        tokio::select! {
            joined = &mut server => {
                // Server stopped without being asked to
                joined??;
                return Ok(ShutdownOutcome::Drained);
            }
            _ = signal => {}
        }

        info!(
            drain_timeout_ms = self.drain_timeout.as_millis() as u64,
            "Shutdown requested, draining in-flight calls"
        );
        health_reporter
            .set_not_serving::<TweetServiceServer<S>>()
            .await;
        health_reporter
            .set_service_status("", ServingStatus::NotServing)
            .await;

        let _ = drain_tx.send(());

        match tokio::time::timeout(self.drain_timeout, &mut server).await {
            Ok(joined) => {
                joined??;
                info!("Tweet service stopped cleanly");
                Ok(ShutdownOutcome::Drained)
            }
            Err(_) => {
                server.abort();
                warn!(
                    drain_timeout_ms = self.drain_timeout.as_millis() as u64,
                    "Drain window elapsed, abandoning in-flight calls"
                );
                Ok(ShutdownOutcome::Forced)
            }
        }
    }
}

//! gRPC sink over one supervised, multiplexed channel
//!
//! The channel is dialed eagerly at startup. When a call comes back
//! `UNAVAILABLE`, the handle swaps in a freshly built lazy channel so the
//! next call dials again; the failed call itself is never retried.

use crate::error::{GatewayError, Result};
use crate::metrics::Metrics;
use crate::sink::TweetSink;
use async_trait::async_trait;
use clima_core::proto::TweetServiceClient;
use clima_core::{CallError, TweetRequest, TweetResponse};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// Tweet sink backed by a tonic channel
pub struct GrpcSink {
    endpoint: Endpoint,
    target: String,
    /// Current client; tonic clients are cheap to clone and safe to share
    client: RwLock<TweetServiceClient<Channel>>,
    /// Bumped on every redial
    generation: AtomicU64,
    reachable: AtomicBool,
}

impl GrpcSink {
    /// Dial the service now; fails if it is unreachable
    ///
    /// # Arguments
    /// * `addr` - `host:port` or a full `http://` URI
    /// * `connect_timeout` - bound on this dial and on later redials
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let endpoint = endpoint_for(addr, connect_timeout)?;
        let channel = endpoint.connect().await?;
        info!(target = %endpoint.uri(), "Connected to tweet service");
        Ok(Self::with_channel(endpoint, channel))
    }

    /// Configure the channel without dialing; the first call connects
    pub fn connect_lazy(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let endpoint = endpoint_for(addr, connect_timeout)?;
        let channel = endpoint.connect_lazy();
        debug!(target = %endpoint.uri(), "Tweet service channel configured (lazy)");
        Ok(Self::with_channel(endpoint, channel))
    }

    fn with_channel(endpoint: Endpoint, channel: Channel) -> Self {
        Self {
            target: endpoint.uri().to_string(),
            endpoint,
            client: RwLock::new(TweetServiceClient::new(channel)),
            generation: AtomicU64::new(0),
            reachable: AtomicBool::new(true),
        }
    }

    /// URI of the tweet service
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of times the channel has been rebuilt
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn current_client(&self) -> TweetServiceClient<Channel> {
        self.client.read().clone()
    }

    /// Replace the channel unless another task already did since `observed`
    fn redial(&self, observed: u64) {
        let mut client = self.client.write();
        if self.generation.load(Ordering::Acquire) != observed {
            return;
        }

        *client = TweetServiceClient::new(self.endpoint.connect_lazy());
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if let Some(m) = Metrics::get() {
            m.record_redial();
        }
        info!(target = %self.target, generation, "Tweet service channel rebuilt");
    }
}

#[async_trait]
impl TweetSink for GrpcSink {
    fn name(&self) -> &'static str {
        "grpc"
    }

    async fn send(
        &self,
        request: TweetRequest,
        deadline: Duration,
    ) -> std::result::Result<TweetResponse, CallError> {
        let observed = self.generation();
        let mut client = self.current_client();

        // Local deadline only: the service is not told to abort, so it may
        // still finish (and log) a call we already reported as timed out.
        let outcome = tokio::time::timeout(deadline, client.send_tweet(request)).await;

        match outcome {
            Err(_) => Err(CallError::DeadlineExceeded(deadline)),
            Ok(Ok(response)) => {
                self.reachable.store(true, Ordering::Relaxed);
                Ok(response.into_inner())
            }
            Ok(Err(status)) => match CallError::from(status) {
                CallError::Unavailable(msg) => {
                    self.reachable.store(false, Ordering::Relaxed);
                    warn!(target = %self.target, error = %msg, "Tweet service unreachable");
                    self.redial(observed);
                    Err(CallError::Unavailable(msg))
                }
                CallError::DeadlineExceeded(_) => Err(CallError::DeadlineExceeded(deadline)),
                other => Err(other),
            },
        }
    }

    async fn health(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}

fn endpoint_for(addr: &str, connect_timeout: Duration) -> Result<Endpoint> {
    let uri = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };

    Ok(Endpoint::from_shared(uri)
        .map_err(|e| GatewayError::Config(format!("invalid tweet service address '{addr}': {e}")))?
        .connect_timeout(connect_timeout))
}

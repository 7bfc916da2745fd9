//! HTTP ingress
//!
//! # Endpoints
//!
//! - `POST /clima` - ingest one reading, relay it as `SendTweet`
//! - `GET /health` - liveness, always `OK`, no downstream check
//! - `GET /metrics` - Prometheus metrics

use crate::error::{IngestError, Result};
use crate::metrics::Metrics;
use crate::sink::TweetSink;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use clima_core::{Reading, TweetRequest};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    sink: Arc<dyn TweetSink>,
    deadline: Duration,
}

impl AppState {
    /// Bundle the outbound sink with the per-call deadline
    pub fn new(sink: Arc<dyn TweetSink>, deadline: Duration) -> Self {
        Self { sink, deadline }
    }
}

/// JSON body of every `/clima` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// `"success"` or `"error"`
    pub status: String,
    pub message: String,
}

impl Ack {
    /// Acknowledgment carrying the tweet service's status text
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    /// Failure body with a fixed, producer-safe message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/clima",
            post(ingest_reading).fallback(|| async { IngestError::MethodNotAllowed }),
        )
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then let in-flight requests finish
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Gateway HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

/// Handler for `POST /clima`
async fn ingest_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<Ack>, IngestError> {
    let reading: Reading = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected malformed reading");
        record_reading("invalid");
        IngestError::InvalidInput(e.to_string())
    })?;

    info!(
        location = %reading.location,
        temperature_c = reading.temperature_c,
        humidity_pct = reading.humidity_pct,
        condition = %reading.condition,
        "Reading received"
    );

    let started = Instant::now();
    let result = state
        .sink
        .send(TweetRequest::from(&reading), state.deadline)
        .await;
    let elapsed = started.elapsed();

    match result {
        Ok(response) => {
            info!(
                location = %reading.location,
                status = %response.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Tweet service acknowledged reading"
            );
            record_rpc("ok", elapsed);
            record_reading("accepted");
            Ok(Json(Ack::success(response.status)))
        }
        Err(e) => {
            error!(
                location = %reading.location,
                code = ?e.code(),
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "Tweet service call failed, reading dropped"
            );
            record_rpc(e.kind(), elapsed);
            record_reading("failed");
            Err(IngestError::Downstream(e))
        }
    }
}

/// Handler for `GET /health`
async fn health_handler() -> &'static str {
    "OK"
}

/// Handler for `GET /metrics`
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        crate::metrics::gather(),
    )
}

fn record_reading(outcome: &str) {
    if let Some(m) = Metrics::get() {
        m.record_reading(outcome);
    }
}

fn record_rpc(result: &str, elapsed: Duration) {
    if let Some(m) = Metrics::get() {
        m.record_rpc(result, elapsed);
    }
}

//! Prometheus metrics for the gateway

use crate::error::{GatewayError, Result};
use crate::sink::CircuitState;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics instance
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// All gateway metrics
pub struct Metrics {
    registry: Registry,

    /// Readings received on `POST /clima` (by outcome: accepted, invalid, failed)
    pub readings_received: CounterVec,

    /// `SendTweet` calls (by result: ok or a `CallError` kind)
    pub rpc_calls: CounterVec,

    /// `SendTweet` latency in seconds, including timeouts
    pub rpc_duration_seconds: Histogram,

    /// Circuit breaker state (0=closed, 1=open, 2=half-open)
    pub circuit_breaker_state: Gauge,

    /// Channel rebuilds after the service became unreachable
    pub channel_redials: Counter,
}

impl Metrics {
    /// Initialize metrics (call once at startup; later calls return the same instance)
    pub fn init() -> Result<&'static Metrics> {
        if let Some(metrics) = METRICS.get() {
            return Ok(metrics);
        }

        let metrics = Self::build()?;
        Ok(METRICS.get_or_init(|| metrics))
    }

    /// Get metrics if initialized
    pub fn get() -> Option<&'static Metrics> {
        METRICS.get()
    }

    fn build() -> Result<Metrics> {
        let registry = Registry::new();

        let readings_received = CounterVec::new(
            Opts::new("clima_readings_received_total", "Readings received by outcome"),
            &["outcome"],
        )
        .map_err(|e| GatewayError::Metrics(format!("readings_received: {e}")))?;

        let rpc_calls = CounterVec::new(
            Opts::new("clima_rpc_calls_total", "SendTweet calls by result"),
            &["result"],
        )
        .map_err(|e| GatewayError::Metrics(format!("rpc_calls: {e}")))?;

        let rpc_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("clima_rpc_duration_seconds", "SendTweet call latency")
                // Buckets: 1ms to 10s
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .map_err(|e| GatewayError::Metrics(format!("rpc_duration_seconds: {e}")))?;

        let circuit_breaker_state = Gauge::new(
            "clima_circuit_breaker_state",
            "Circuit breaker state (0=closed, 1=open, 2=half-open)",
        )
        .map_err(|e| GatewayError::Metrics(format!("circuit_breaker_state: {e}")))?;

        let channel_redials = Counter::new(
            "clima_channel_redials_total",
            "Channel rebuilds after UNAVAILABLE",
        )
        .map_err(|e| GatewayError::Metrics(format!("channel_redials: {e}")))?;

        registry
            .register(Box::new(readings_received.clone()))
            .and_then(|_| registry.register(Box::new(rpc_calls.clone())))
            .and_then(|_| registry.register(Box::new(rpc_duration_seconds.clone())))
            .and_then(|_| registry.register(Box::new(circuit_breaker_state.clone())))
            .and_then(|_| registry.register(Box::new(channel_redials.clone())))
            .map_err(|e| GatewayError::Metrics(format!("register: {e}")))?;

        Ok(Metrics {
            registry,
            readings_received,
            rpc_calls,
            rpc_duration_seconds,
            circuit_breaker_state,
            channel_redials,
        })
    }

    pub fn record_reading(&self, outcome: &str) {
        self.readings_received.with_label_values(&[outcome]).inc();
    }

    pub fn record_rpc(&self, result: &str, elapsed: Duration) {
        self.rpc_calls.with_label_values(&[result]).inc();
        self.rpc_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn set_circuit_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(state.as_metric_value());
    }

    pub fn record_redial(&self) {
        self.channel_redials.inc();
    }
}

/// Gather all metrics in Prometheus text format
pub fn gather() -> String {
    let Some(metrics) = Metrics::get() else {
        return String::new();
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

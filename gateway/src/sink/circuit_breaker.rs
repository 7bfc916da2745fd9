//! Circuit breaker sink
//!
//! Fails fast while the tweet service is unhealthy, which also bounds how
//! often the underlying channel gets rebuilt.

use crate::metrics::Metrics;
use crate::sink::TweetSink;
use async_trait::async_trait;
use clima_core::{CallError, TweetRequest, TweetResponse};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Circuit breaker state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - calls flow through
    Closed,
    /// Circuit is open - calls fail fast
    Open,
    /// Testing if the service recovered - allowing limited calls
    HalfOpen,
}

impl CircuitState {
    /// Convert to Prometheus metric value (0=Closed, 1=Open, 2=HalfOpen)
    pub fn as_metric_value(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive transport failures to open circuit
    pub failure_threshold: u32,
    /// Number of consecutive successes in half-open to close circuit
    pub success_threshold: u32,
    /// Time to wait before transitioning from Open to HalfOpen
    pub reset_timeout: Duration,
    /// Maximum concurrent calls allowed in HalfOpen state
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            half_open_max_requests: 1,
        }
    }
}

/// Internal state tracking
struct CircuitBreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<Instant>,
    half_open_requests: u32,
}

impl CircuitBreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_time: None,
            half_open_requests: 0,
        }
    }
}

/// Sink wrapper implementing the circuit breaker pattern
///
/// Only transport failures ([`CallError::is_transport`]) count against the
/// service; a rejection or application status proves it is alive.
pub struct CircuitBreakerSink {
    inner: Arc<dyn TweetSink>,
    config: CircuitBreakerConfig,
    state: RwLock<CircuitBreakerState>,
    /// Times circuit opened
    open_count: AtomicU64,
    /// Calls rejected by open circuit
    rejected_count: AtomicU64,
}

impl CircuitBreakerSink {
    /// Wrap `inner` with the given breaker settings
    ///
    /// Resets the circuit-state gauge to closed when metrics are installed.
    pub fn new(inner: Arc<dyn TweetSink>, config: CircuitBreakerConfig) -> Self {
        if let Some(m) = Metrics::get() {
            m.set_circuit_state(CircuitState::Closed);
        }
        Self {
            inner,
            config,
            state: RwLock::new(CircuitBreakerState::new()),
            open_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
        }
    }

    /// Wrap `inner` with [`CircuitBreakerConfig::default`]
    pub fn with_defaults(inner: Arc<dyn TweetSink>) -> Self {
        Self::new(inner, CircuitBreakerConfig::default())
    }

    /// Get current circuit state (for monitoring)
    pub fn current_state(&self) -> CircuitState {
        self.state.read().state
    }

    /// Get count of times circuit has opened
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Get count of rejected calls
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState) {
        state.state = to;
        if let Some(m) = Metrics::get() {
            m.set_circuit_state(to);
        }
    }

    /// Admit a call, applying time-based transitions
    ///
    /// Returns `None` when the circuit rejects the call. A call admitted
    /// while half-open holds one probe slot until its [`Admission`] settles
    /// or is dropped.
    fn admit(&self) -> Option<Admission<'_>> {
        let mut state = self.state.write();

        match state.state {
            CircuitState::Closed => Some(Admission::new(self, false)),

            CircuitState::Open => {
                let reset_elapsed = state
                    .last_failure_time
                    .is_some_and(|t| t.elapsed() >= self.config.reset_timeout);

                if reset_elapsed {
                    self.transition(&mut state, CircuitState::HalfOpen);
                    state.half_open_requests = 1; // this call is the probe
                    state.consecutive_successes = 0;
                    tracing::info!(
                        sink = self.inner.name(),
                        "circuit breaker transitioning to half-open"
                    );
                    return Some(Admission::new(self, true));
                }
                self.rejected_count.fetch_add(1, Ordering::Relaxed);
                None
            }

            CircuitState::HalfOpen => {
                if state.half_open_requests < self.config.half_open_max_requests {
                    state.half_open_requests += 1;
                    Some(Admission::new(self, true))
                } else {
                    self.rejected_count.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
        }
    }

    /// Record a call that reached the service
    fn record_success(&self, holds_slot: bool) {
        let mut state = self.state.write();
        state.consecutive_failures = 0;

        if state.state == CircuitState::HalfOpen {
            state.consecutive_successes += 1;
            if holds_slot {
                state.half_open_requests = state.half_open_requests.saturating_sub(1);
            }
            if state.consecutive_successes >= self.config.success_threshold {
                self.transition(&mut state, CircuitState::Closed);
                state.half_open_requests = 0;
                tracing::info!(
                    sink = self.inner.name(),
                    "circuit breaker closed - service recovered"
                );
            }
        }
    }

    /// Record a transport failure
    fn record_failure(&self) {
        let mut state = self.state.write();
        state.consecutive_successes = 0;
        state.consecutive_failures += 1;
        state.last_failure_time = Some(Instant::now());

        match state.state {
            CircuitState::Closed => {
                if state.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut state, CircuitState::Open);
                    self.open_count.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        sink = self.inner.name(),
                        failures = state.consecutive_failures,
                        "circuit breaker opened - too many failures"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Any failure in half-open immediately opens circuit again
                self.transition(&mut state, CircuitState::Open);
                state.half_open_requests = 0;
                self.open_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    sink = self.inner.name(),
                    "circuit breaker re-opened - probe failed"
                );
            }
            CircuitState::Open => {}
        }
    }

    /// Give back a probe slot whose call never reported an outcome
    fn release_slot(&self) {
        let mut state = self.state.write();
        if state.state == CircuitState::HalfOpen {
            state.half_open_requests = state.half_open_requests.saturating_sub(1);
            tracing::debug!(
                sink = self.inner.name(),
                "half-open probe abandoned, slot released"
            );
        }
    }
}

/// One admitted call
///
/// Dropping it unsettled (the caller's future was cancelled mid-call)
/// releases the half-open slot it holds, so the breaker can probe again.
struct Admission<'a> {
    breaker: &'a CircuitBreakerSink,
    holds_slot: bool,
    settled: bool,
}

impl<'a> Admission<'a> {
    fn new(breaker: &'a CircuitBreakerSink, holds_slot: bool) -> Self {
        Self {
            breaker,
            holds_slot,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.holds_slot);
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.holds_slot {
            self.breaker.release_slot();
        }
    }
}

#[async_trait]
impl TweetSink for CircuitBreakerSink {
    fn name(&self) -> &'static str {
        "circuit_breaker"
    }

    async fn send(
        &self,
        request: TweetRequest,
        deadline: Duration,
    ) -> Result<TweetResponse, CallError> {
        let Some(admission) = self.admit() else {
            return Err(CallError::CircuitOpen);
        };

        match self.inner.send(request, deadline).await {
            Ok(response) => {
                admission.succeed();
                Ok(response)
            }
            Err(e) if e.is_transport() => {
                admission.fail();
                Err(e)
            }
            Err(e) => {
                admission.succeed();
                Err(e)
            }
        }
    }

    async fn health(&self) -> bool {
        match self.current_state() {
            CircuitState::Open => false,
            _ => self.inner.health().await,
        }
    }
}

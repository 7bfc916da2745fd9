//! Environment configuration for the gateway

use crate::error::{GatewayError, Result};
use crate::sink::CircuitBreakerConfig;
use clima_core::LogFormat;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_RPC_ADDR: &str = "localhost:50051";
const DEFAULT_RPC_DEADLINE_MS: u64 = 5_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Runtime settings for `clima-gateway`
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Tweet service address, with or without scheme
    pub rpc_addr: String,
    /// Deadline applied to every `SendTweet` call
    pub rpc_deadline: Duration,
    /// Dial timeout for the initial connect and for redials
    pub connect_timeout: Duration,
    /// Circuit breaker in front of the gRPC sink
    pub circuit_breaker: CircuitBreakerConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HTTP_PORT)),
            rpc_addr: DEFAULT_RPC_ADDR.to_string(),
            rpc_deadline: Duration::from_millis(DEFAULT_RPC_DEADLINE_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            circuit_breaker: CircuitBreakerConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_or(&lookup, "PORT", DEFAULT_HTTP_PORT)?;
        let deadline_ms = parse_or(&lookup, "CLIMA_RPC_DEADLINE_MS", DEFAULT_RPC_DEADLINE_MS)?;
        let connect_ms = parse_or(
            &lookup,
            "CLIMA_CONNECT_TIMEOUT_MS",
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?;

        if deadline_ms == 0 {
            return Err(GatewayError::Config(
                "CLIMA_RPC_DEADLINE_MS must be greater than 0".to_string(),
            ));
        }

        let circuit_breaker = CircuitBreakerConfig {
            failure_threshold: parse_or(
                &lookup,
                "CLIMA_CB_FAILURE_THRESHOLD",
                defaults.circuit_breaker.failure_threshold,
            )?,
            reset_timeout: Duration::from_millis(parse_or(
                &lookup,
                "CLIMA_CB_RESET_TIMEOUT_MS",
                defaults.circuit_breaker.reset_timeout.as_millis() as u64,
            )?),
            ..defaults.circuit_breaker
        };

        let rpc_addr = match lookup("GRPC_SERVER_ADDR") {
            Some(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
            _ => defaults.rpc_addr,
        };

        let log_format = parse_or(&lookup, "CLIMA_LOG_FORMAT", defaults.log_format)?;
        let log_level = match lookup("CLIMA_LOG_LEVEL") {
            Some(level) if !level.trim().is_empty() => level.trim().to_string(),
            _ => defaults.log_level,
        };

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            rpc_addr,
            rpc_deadline: Duration::from_millis(deadline_ms),
            connect_timeout: Duration::from_millis(connect_ms),
            circuit_breaker,
            log_level,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| GatewayError::Config(format!("{key}: {e}"))),
        _ => Ok(default),
    }
}

//! Environment configuration for the tweet service

use crate::error::{Result, ServiceError};
use clima_core::LogFormat;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_GRPC_PORT: u16 = 50051;
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 10_000;
/// 10 MiB, both directions
const DEFAULT_MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_JOURNAL_CAPACITY: usize = 256;

/// Runtime settings for `clima-service`
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the gRPC listener binds
    pub listen_addr: SocketAddr,
    /// Upper bound on the graceful drain before in-flight calls are abandoned
    pub drain_timeout: Duration,
    /// Max encoded/decoded gRPC message size
    pub max_message_bytes: usize,
    /// How many accepted tweets the journal remembers
    pub journal_capacity: usize,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_GRPC_PORT)),
            drain_timeout: Duration::from_millis(DEFAULT_DRAIN_TIMEOUT_MS),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Unset keys fall back to defaults; set-but-invalid keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_or(&lookup, "GRPC_PORT", DEFAULT_GRPC_PORT)?;
        let drain_ms = parse_or(&lookup, "CLIMA_DRAIN_TIMEOUT_MS", DEFAULT_DRAIN_TIMEOUT_MS)?;
        let max_message_bytes =
            parse_or(&lookup, "CLIMA_MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_BYTES)?;
        let journal_capacity =
            parse_or(&lookup, "CLIMA_JOURNAL_CAPACITY", DEFAULT_JOURNAL_CAPACITY)?;

        if max_message_bytes == 0 {
            return Err(ServiceError::Config(
                "CLIMA_MAX_MESSAGE_BYTES must be greater than 0".to_string(),
            ));
        }

        let log_format = parse_or(&lookup, "CLIMA_LOG_FORMAT", defaults.log_format)?;
        let log_level = match lookup("CLIMA_LOG_LEVEL") {
            Some(level) if !level.trim().is_empty() => level.trim().to_string(),
            _ => defaults.log_level,
        };

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            drain_timeout: Duration::from_millis(drain_ms),
            max_message_bytes,
            journal_capacity,
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
            .map_err(|e| ServiceError::Config(format!("{key}: {e}"))),
        _ => Ok(default),
    }
}

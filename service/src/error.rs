//! Error types for the tweet service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the tweet service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// gRPC transport error
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Reflection service could not be built from the descriptor set
    #[error("reflection error: {0}")]
    Reflection(String),

    /// Server task panicked or was cancelled
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_display() {
        let err = ServiceError::Config("GRPC_PORT: invalid digit".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: GRPC_PORT: invalid digit"
        );
    }

    #[test]
    fn test_bind_display_names_address() {
        let err = ServiceError::Bind {
            addr: "0.0.0.0:50051".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert!(err.to_string().starts_with("failed to bind 0.0.0.0:50051"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServiceError>();
    }
}

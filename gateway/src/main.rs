//! `clima-gateway` binary

use clima_core::logging::init_tracing;
use clima_core::signal::shutdown_signal;
use clima_gateway::{AppState, CircuitBreakerSink, GatewayConfig, GrpcSink, Metrics, serve};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        rpc_addr = %config.rpc_addr,
        rpc_deadline_ms = config.rpc_deadline.as_millis() as u64,
        "Starting clima-gateway"
    );

    Metrics::init()?;

    // The initial dial is fatal: no service, no gateway
    let grpc = GrpcSink::connect(&config.rpc_addr, config.connect_timeout).await?;
    let sink = CircuitBreakerSink::new(Arc::new(grpc), config.circuit_breaker.clone());
    let state = AppState::new(Arc::new(sink), config.rpc_deadline);

    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, state, shutdown_signal()).await?;

    info!("clima-gateway shutdown complete");
    Ok(())
}

//! `clima-service` binary

use clima_core::logging::init_tracing;
use clima_core::signal::shutdown_signal;
use clima_service::{RpcServer, ServiceConfig, ShutdownOutcome, TweetHandler, TweetJournal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        drain_timeout_ms = config.drain_timeout.as_millis() as u64,
        max_message_bytes = config.max_message_bytes,
        "Starting clima-service"
    );

    let handler = TweetHandler::new(TweetJournal::new(config.journal_capacity));
    let journal = handler.journal();
    let server = RpcServer::bind(&config, handler).await?;

    match server.serve_with_shutdown(shutdown_signal()).await? {
        ShutdownOutcome::Drained => info!(
            accepted = journal.accepted_count(),
            rejected = journal.rejected_count(),
            "clima-service shutdown complete"
        ),
        ShutdownOutcome::Forced => warn!(
            accepted = journal.accepted_count(),
            rejected = journal.rejected_count(),
            "clima-service forced shutdown"
        ),
    }

    Ok(())
}

//! ChatRelay Channels - Main entry point.

use anyhow::Result;
use chatrelay_channels::start_server;
use chatrelay_common::config::Config;
use chatrelay_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("ChatRelay Channels v{}", env!("CARGO_PKG_VERSION"));

    // Start the HTTP server
    start_server(&config).await
}

//! Ferry bot - main entry point.

use anyhow::Result;
use ferry_common::config::Config;
use ferry_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Ferry v{}", env!("CARGO_PKG_VERSION"));

    ferry_bot::run(&config).await
}

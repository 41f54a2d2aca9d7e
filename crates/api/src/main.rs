//! CAN LED Controller - Main Entry Point
//!
//! Usage: `canled [config.toml]`

use anyhow::Context;
use api::{init_logging, run, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let config = AppConfig::load(path.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.log_level, config.log_json).context("Failed to initialise logging")?;

    info!("=== CAN LED Controller v{} ===", env!("CARGO_PKG_VERSION"));

    run(config).await.context("Controller stopped with an error")?;

    Ok(())
}

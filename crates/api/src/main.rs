//! Hazard Alert Core - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Hazard Alert Core v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting alert escalation engine...");

    let config = AppConfig::load()?;
    run_server(config).await?;

    Ok(())
}

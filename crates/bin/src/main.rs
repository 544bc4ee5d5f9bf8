//! Microbial growth simulation server binary.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Microbial growth server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Listen: {}:{}", config.server.bind, config.server.port);
    info!("  Arena: {}x{}", config.arena.width, config.arena.height);
    info!("  Tick rate: {} Hz", config.server.tick_rate);
    if let Some(seed) = config.server.seed {
        info!("  Seed: {}", seed);
    }

    server::run(config).await?;

    Ok(())
}

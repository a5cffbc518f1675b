//! Networm - game server binary.

use tracing::{info, warn};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first; it carries the default log level
    let config = server::Config::load(CONFIG_PATH)?;

    // Initialize logging
    tracing_subscriber::fmt().with_env_filter(config.log.env_filter()).init();

    info!("Networm Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration");
    info!("  Bind: {}:{}", config.server.bind, config.server.port);
    info!("  World: {}x{}", config.world.width, config.world.height);
    info!(
        "  Tick: {}ms, broadcast: {}ms",
        config.server.tick_interval_ms, config.server.broadcast_interval_ms
    );

    let server = server::Server::bind(config).await?;
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                shutdown.shutdown();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await
}

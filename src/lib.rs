pub mod cache;
pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Edge service module
mod utils;

use modules::logger;
use tracing::{error, info, warn};

/// Load config, start the edge server and run until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config = modules::config::load_app_config()?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = logger::init_logger(&config.log_dir);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        upstream = %config.proxy.upstream_base(),
        "Starting directus edge"
    );
    if config.proxy.revalidate_secret.is_none() {
        warn!("REVALIDATE_SECRET is not set; every revalidation request will be rejected");
    }

    let proxy_config = config.proxy;
    let state = proxy::AppState::new(proxy_config.clone());

    let (server, server_handle) = proxy::AxumServer::start(&proxy_config, state.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start Axum server: {}", e))?;

    if proxy_config.prerender_on_start {
        tokio::spawn(async move {
            let rendered = proxy::render::prerender_static_pages(&state).await;
            info!(rendered, "Prerender finished");
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server.stop();
    if let Err(e) = server_handle.await {
        error!("Server task ended abnormally: {}", e);
    }
    Ok(())
}

//! Folio HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use folio_runner::logging::init_logging;
use folio_runner::{AppConfig, AppContext};
use folio_server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();
    init_logging("warn,folio_server=info,folio_runner=info,folio_core=info,tower_http=info");

    let config_path = std::env::var_os("FOLIO_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let cors_origins = config.server.cors_origins.clone();

    let ctx = tokio::task::spawn_blocking(move || AppContext::build(config))
        .await
        .context("startup task panicked")?
        .context("failed to build services")?;
    let app = router(AppState::from_context(&ctx), &cors_origins);

    tracing::info!("folio-server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

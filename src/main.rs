use std::net::SocketAddr;

use scribble::config::{ConfigError, ServerConfig};
use scribble::routes;
use scribble::state::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let addr = SocketAddr::new(config.bind_addr, config.port);
    tracing::info!(
        sync = ?config.sync_strategy,
        discard_undone_on_draw = config.log_policy.discard_undone_on_draw,
        static_dir = ?config.static_dir,
        "config loaded"
    );

    let app = routes::app(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(%addr, "scribble listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}

use std::sync::Arc;
use tic_tac_toe_server::app_state::AppState;
use tic_tac_toe_server::cleanup::cleanup_inactive_spaces;
use tic_tac_toe_server::config::ServerConfig;
use tic_tac_toe_server::{serve, UPDATE_CHANNEL_CAPACITY};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let app_state = Arc::new(AppState::new(tx));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Property store is running on {}", listener.local_addr()?);

    tokio::spawn(cleanup_inactive_spaces(
        Arc::clone(&app_state),
        config.space_ttl,
        config.cleanup_interval,
    ));

    if let Err(e) = serve(listener, app_state).await {
        error!("❌ Server error: {}", e);
        return Err(e);
    }
    Ok(())
}

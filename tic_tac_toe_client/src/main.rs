use std::sync::Arc;
use tic_tac_toe_client::config::ClientSettings;
use tic_tac_toe_client::renderer::LogRenderer;
use tic_tac_toe_client::sync::{InputEvent, SyncController, WsPropertyStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_CONNECT_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = ClientSettings::from_env();
    info!(
        "🔗 Connecting to {} (space {}, key {})",
        settings.store_url,
        settings.space,
        settings.game.storage_key()
    );

    let store = WsPropertyStore::connect_with_retry(
        &settings.store_url,
        &settings.space,
        MAX_CONNECT_ATTEMPTS,
    )
    .await?;

    let mut controller = SyncController::new(&settings.game, Arc::new(store), LogRenderer);
    controller.on_init();

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx, settings.game.hide_ui));

    controller.run(rx).await;
    Ok(())
}

async fn read_commands(tx: mpsc::Sender<InputEvent>, hide_ui: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if hide_ui {
        info!("Enter `<row> <col>` to play.");
    } else {
        info!("Enter `<row> <col>` to play or `reset` to start over.");
    }

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_command(&line, hide_ui) {
                Some(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                None => warn!("⚠️ Unrecognized command: {}", line.trim()),
            },
            Ok(None) => break,
            Err(e) => {
                error!("❌ Failed to read input: {}", e);
                break;
            }
        }
    }
}

/// `reset` is only accepted when the reset control is shown.
fn parse_command(line: &str, hide_ui: bool) -> Option<InputEvent> {
    let mut parts = line.split_whitespace();
    match (parts.next()?, parts.next(), parts.next()) {
        ("reset", None, None) if !hide_ui => Some(InputEvent::ResetClicked),
        (row, Some(col), None) => Some(InputEvent::CellClicked {
            row: row.parse().ok()?,
            col: col.parse().ok()?,
        }),
        _ => None,
    }
}

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info};

use crate::app_state::AppState;
use crate::store::message::ServerMessage;
use crate::store::models::{Scope, Space};

pub async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}

pub async fn send_error(socket: &mut WebSocket, message: &str) -> Result<()> {
    send_message(
        socket,
        &ServerMessage::Error {
            message: message.to_string(),
        },
    )
    .await
}

/// Registers the socket as a watcher of `space_id` (leaving `previous`, if
/// any) and sends it the full snapshot.
pub async fn handle_join_space(
    space_id: &str,
    previous: Option<&str>,
    state: &Arc<AppState>,
    socket: &mut WebSocket,
) -> Result<()> {
    info!("📥 Received JOIN_SPACE request - Space: {}", space_id);

    let snapshot = {
        let mut spaces = state.spaces.write().await;
        if let Some(old) = previous.and_then(|p| spaces.get_mut(p)) {
            old.watchers = old.watchers.saturating_sub(1);
        }

        let space = spaces.entry(space_id.to_string()).or_insert_with(|| {
            info!("🆕 Creating new space with ID: {}", space_id);
            Space::default()
        });
        space.watchers += 1;
        space.last_activity = SystemTime::now();
        space.snapshot(space_id)
    };

    send_message(socket, &snapshot).await?;
    info!("✅ Socket joined space {}", space_id);
    Ok(())
}

/// Upserts `props` and announces the change to every watcher of the space,
/// the writer included.
pub async fn handle_set_props(
    space_id: &str,
    scope: Scope,
    props: HashMap<String, String>,
    joined: Option<&str>,
    state: &Arc<AppState>,
    socket: &mut WebSocket,
) -> Result<()> {
    if joined != Some(space_id) {
        error!("❌ SET_PROPS rejected: socket has not joined space {}", space_id);
        return send_error(socket, "Join the space before writing to it").await;
    }
    if props.is_empty() {
        debug!("SET_PROPS for {} carried no properties.", space_id);
        return Ok(());
    }

    let mut spaces = state.spaces.write().await;
    let space = spaces.entry(space_id.to_string()).or_default();
    let changes = space.upsert(scope, props);

    info!(
        "✅ {} {:?} properties written in space {}",
        changes.len(),
        scope,
        space_id
    );

    // Sent while the lock is held so notifications keep the write order.
    let _ = state.tx.send((
        space_id.to_string(),
        ServerMessage::StateChanged {
            space: space_id.to_string(),
            scope,
            changes,
        },
    ));

    Ok(())
}

pub async fn send_snapshot(
    space_id: &str,
    state: &Arc<AppState>,
    socket: &mut WebSocket,
) -> Result<()> {
    let snapshot = {
        let spaces = state.spaces.read().await;
        spaces
            .get(space_id)
            .map(|space| space.snapshot(space_id))
            .unwrap_or_else(|| Space::default().snapshot(space_id))
    };
    send_message(socket, &snapshot).await
}

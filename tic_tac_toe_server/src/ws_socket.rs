use crate::app_state::AppState;
use crate::store::handlers::{handle_join_space, handle_set_props, send_message, send_snapshot};
use crate::store::message::ClientMessage;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[axum::debug_handler]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl axum::response::IntoResponse {
    info!("🔗 WebSocket connection attempt received!");

    ws.on_upgrade(move |socket| async move {
        let conn_id = Uuid::new_v4();
        info!("✅ WebSocket upgrade successful. Connection {}", conn_id);
        if let Err(e) = handle_socket(socket, state, conn_id).await {
            error!("❌ WebSocket processing failed for {}: {}", conn_id, e);
        }
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, conn_id: Uuid) -> Result<()> {
    let mut rx = state.tx.subscribe();
    let mut joined: Option<String> = None;

    let result = async {
        loop {
            tokio::select! {
                incoming = socket.recv() => {
                    let Some(Ok(msg)) = incoming else {
                        info!("Connection {} ended.", conn_id);
                        break;
                    };

                    match msg {
                        Message::Text(text) => {
                            debug!("📩 {} sent: {}", conn_id, text.as_str());

                            let parsed: ClientMessage = match serde_json::from_str(text.as_str()) {
                                Ok(parsed) => parsed,
                                Err(e) => {
                                    error!("❌ Failed to parse message from {}: {}", conn_id, e);
                                    continue;
                                }
                            };

                            match parsed {
                                ClientMessage::JoinSpace { space } => {
                                    let previous = joined.as_deref();
                                    handle_join_space(&space, previous, &state, &mut socket).await?;
                                    joined = Some(space);
                                }
                                ClientMessage::SetProps { space, scope, props } => {
                                    let current = joined.as_deref();
                                    handle_set_props(
                                        &space, scope, props, current, &state, &mut socket,
                                    )
                                    .await?;
                                }
                            }
                        }
                        Message::Ping(data) => {
                            socket.send(Message::Pong(data)).await?;
                        }
                        Message::Close(reason) => {
                            info!("❌ WebSocket {} closed: {:?}", conn_id, reason);
                            break;
                        }
                        _ => warn!("⚠️ Unexpected WebSocket message from {}.", conn_id),
                    }
                }

                update = rx.recv() => match update {
                    Ok((space_id, message)) => {
                        if joined.as_deref() == Some(space_id.as_str()) {
                            send_message(&mut socket, &message).await?;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ {} missed {} updates; resending snapshot.", conn_id, skipped);
                        if let Some(space_id) = joined.as_deref() {
                            send_snapshot(space_id, &state, &mut socket).await?;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if let Some(space_id) = joined.as_deref() {
        state.leave(space_id).await;
    }
    info!("Connection {} cleaned up.", conn_id);
    result
}

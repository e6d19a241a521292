use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use tungstenite::Message;

use super::protocol::{ClientMessage, ServerMessage};
use super::store::{PropertyChange, PropertyStore, Scope, SpaceState, CHANGE_CHANNEL_CAPACITY};
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Property store backed by the relay server.
///
/// The local snapshot only changes when the relay announces a change, so a
/// value written here becomes visible to `get` together with its echo.
pub struct WsPropertyStore {
    space: String,
    snapshot: Arc<RwLock<SpaceState>>,
    socket_write: Mutex<WsWrite>,
    tx: broadcast::Sender<PropertyChange>,
    listener: JoinHandle<()>,
}

impl WsPropertyStore {
    pub async fn connect(url: &str, space: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        let (mut write, mut read) = stream.split();

        let join = ClientMessage::JoinSpace {
            space: space.to_string(),
        };
        write
            .send(Message::Text(serde_json::to_string(&join)?.into()))
            .await?;

        let initial = tokio::time::timeout(JOIN_TIMEOUT, wait_for_snapshot(&mut read, space))
            .await
            .map_err(|_| Error::Timeout("space snapshot"))??;

        info!(
            "✅ Joined space {} ({} public, {} protected properties).",
            space,
            initial.public.len(),
            initial.protected.len()
        );

        let snapshot = Arc::new(RwLock::new(initial));
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let listener = tokio::spawn(listen_for_messages(
            read,
            space.to_string(),
            Arc::clone(&snapshot),
            tx.clone(),
        ));

        Ok(WsPropertyStore {
            space: space.to_string(),
            snapshot,
            socket_write: Mutex::new(write),
            tx,
            listener,
        })
    }

    pub async fn connect_with_retry(url: &str, space: &str, max_attempts: u32) -> Result<Self> {
        let mut attempt = 1;
        loop {
            match Self::connect(url, space).await {
                Ok(store) => return Ok(store),
                Err(e) if attempt < max_attempts => {
                    error!("❌ Connection attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("❌ Reached max connection attempts.");
                    return Err(e);
                }
            }
        }
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub async fn set_scoped(&self, scope: Scope, key: &str, value: String) -> Result<()> {
        let request = ClientMessage::SetProps {
            space: self.space.clone(),
            scope,
            props: HashMap::from([(key.to_string(), value)]),
        };
        let text = serde_json::to_string(&request)?;

        self.socket_write
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await?;
        debug!("📤 SET_PROPS sent for {}", key);
        Ok(())
    }
}

impl Drop for WsPropertyStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl PropertyStore for WsPropertyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(key)
            .map(str::to_string)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_scoped(Scope::Public, key, value).await
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyChange> {
        self.tx.subscribe()
    }
}

async fn wait_for_snapshot(read: &mut WsRead, space: &str) -> Result<SpaceState> {
    while let Some(message) = read.next().await {
        let Message::Text(text) = message? else {
            continue;
        };
        match serde_json::from_str::<ServerMessage>(text.as_str()) {
            Ok(ServerMessage::SpaceState {
                space: joined,
                public,
                protected,
            }) if joined == space => return Ok(SpaceState { public, protected }),
            Ok(ServerMessage::Error { message }) => return Err(Error::Store(message)),
            Ok(other) => debug!("Ignoring {:?} before join completed.", other),
            Err(e) => error!("❌ Failed to parse store message: {}", e),
        }
    }
    Err(Error::Store(
        "connection closed before the space snapshot arrived".to_string(),
    ))
}

async fn listen_for_messages(
    mut read: WsRead,
    space: String,
    snapshot: Arc<RwLock<SpaceState>>,
    tx: broadcast::Sender<PropertyChange>,
) {
    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(reason)) => {
                info!("WebSocket closed: {:?}", reason);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                error!("❌ WebSocket read failed: {}", e);
                break;
            }
        };

        let parsed: ServerMessage = match serde_json::from_str(text.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("❌ Failed to parse store message: {}", e);
                continue;
            }
        };

        match parsed {
            ServerMessage::StateChanged {
                space: changed,
                scope,
                changes,
            } if changed == space => {
                {
                    let mut state = snapshot.write().unwrap_or_else(PoisonError::into_inner);
                    let props = state.scope_mut(scope);
                    for change in &changes {
                        props.insert(change.property.clone(), change.value.clone());
                    }
                }
                for change in changes {
                    let _ = tx.send(PropertyChange {
                        scope,
                        property: change.property,
                    });
                }
            }
            ServerMessage::SpaceState {
                space: joined,
                public,
                protected,
            } if joined == space => {
                let fresh = SpaceState { public, protected };
                let keys: Vec<(Scope, String)> = fresh
                    .public
                    .keys()
                    .map(|k| (Scope::Public, k.clone()))
                    .chain(fresh.protected.keys().map(|k| (Scope::Protected, k.clone())))
                    .collect();
                *snapshot.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                for (scope, property) in keys {
                    let _ = tx.send(PropertyChange { scope, property });
                }
            }
            ServerMessage::Error { message } => error!("❌ Store error: {}", message),
            other => debug!("Ignoring message for another space: {:?}", other),
        }
    }

    warn!("❌ Store connection for space {} lost.", space);
}

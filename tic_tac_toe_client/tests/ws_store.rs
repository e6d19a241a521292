//! `WsPropertyStore` against a scripted relay socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tic_tac_toe_client::sync::{PropertyStore, Scope, WsPropertyStore};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Accepts one client, answers its join with an empty snapshot and, once the
/// client writes anything, replaces the snapshot wholesale.
async fn start_scripted_relay() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = accept_async(stream).await?;

        let mut frames = 0;
        while let Some(message) = ws.next().await {
            let Message::Text(text) = message? else {
                continue;
            };
            let request: Value = serde_json::from_str(text.as_str())?;
            let reply = if frames == 0 {
                json!({ "type": "SPACE_STATE", "space": "hall", "public": {}, "protected": {} })
            } else {
                json!({
                    "type": "SPACE_STATE",
                    "space": "hall",
                    "public": { "board": "fresh" },
                    "protected": { "owner": "relay" }
                })
            };
            frames += 1;
            tracing::debug!("scripted relay got {}", request["type"]);
            ws.send(Message::Text(reply.to_string().into())).await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    Ok(format!("ws://{}", addr))
}

#[tokio::test]
async fn fresh_snapshot_replaces_state_and_notifies() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    let url = start_scripted_relay().await?;
    let store = WsPropertyStore::connect(&url, "hall").await?;
    assert_eq!(store.get("board"), None);

    let mut changes = store.subscribe();
    store.set("cue", "1".to_string()).await?;

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let change = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await??;
        seen.push((change.scope, change.property));
    }
    seen.sort_by(|a, b| a.1.cmp(&b.1));

    assert_eq!(
        seen,
        vec![
            (Scope::Public, "board".to_string()),
            (Scope::Protected, "owner".to_string()),
        ]
    );
    assert_eq!(store.get("board").as_deref(), Some("fresh"));
    assert_eq!(store.get("owner").as_deref(), Some("relay"));
    // The write itself was never echoed, so it stays invisible.
    assert_eq!(store.get("cue"), None);
    Ok(())
}

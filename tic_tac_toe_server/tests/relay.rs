//! Socket-level tests for the property store relay.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tic_tac_toe_server::app_state::AppState;
use tic_tac_toe_server::{serve, UPDATE_CHANNEL_CAPACITY};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> anyhow::Result<(String, Arc<AppState>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let state = Arc::new(AppState::new(tx));
    tokio::spawn(serve(listener, Arc::clone(&state)));
    Ok((format!("ws://{}/ws", addr), state))
}

async fn send(ws: &mut Client, value: Value) -> anyhow::Result<()> {
    ws.send(Message::Text(value.to_string().into())).await?;
    Ok(())
}

async fn recv_within(ws: &mut Client, wait: Duration) -> anyhow::Result<Option<Value>> {
    let next = async {
        while let Some(message) = ws.next().await {
            if let Message::Text(text) = message? {
                return Ok::<_, anyhow::Error>(Some(serde_json::from_str(text.as_str())?));
            }
        }
        Ok(None)
    };
    match tokio::time::timeout(wait, next).await {
        Ok(result) => result,
        Err(_) => Ok(None),
    }
}

async fn recv(ws: &mut Client) -> anyhow::Result<Value> {
    recv_within(ws, Duration::from_secs(2))
        .await?
        .ok_or_else(|| anyhow::anyhow!("no message received"))
}

async fn join(url: &str, space: &str) -> anyhow::Result<(Client, Value)> {
    let (mut ws, _) = connect_async(url).await?;
    send(&mut ws, json!({ "type": "JOIN_SPACE", "space": space })).await?;
    let snapshot = recv(&mut ws).await?;
    Ok((ws, snapshot))
}

#[tokio::test]
async fn writes_are_echoed_to_writer_and_peers_only_in_same_space() -> anyhow::Result<()> {
    let (url, _) = start_server().await?;
    let (mut writer, snapshot) = join(&url, "lobby").await?;
    let (mut peer, _) = join(&url, "lobby").await?;
    let (mut stranger, _) = join(&url, "elsewhere").await?;

    assert_eq!(
        snapshot,
        json!({ "type": "SPACE_STATE", "space": "lobby", "public": {}, "protected": {} })
    );

    send(
        &mut writer,
        json!({ "type": "SET_PROPS", "space": "lobby", "props": { "tictactoe_game_a": "{}" } }),
    )
    .await?;

    let expected = json!({
        "type": "STATE_CHANGED",
        "space": "lobby",
        "scope": "public",
        "changes": [{ "property": "tictactoe_game_a", "value": "{}" }]
    });
    assert_eq!(recv(&mut writer).await?, expected);
    assert_eq!(recv(&mut peer).await?, expected);
    assert_eq!(recv_within(&mut stranger, Duration::from_millis(200)).await?, None);
    Ok(())
}

#[tokio::test]
async fn late_joiner_receives_both_scopes() -> anyhow::Result<()> {
    let (url, _) = start_server().await?;
    let (mut first, _) = join(&url, "lobby").await?;

    send(
        &mut first,
        json!({ "type": "SET_PROPS", "space": "lobby", "props": { "a": "1" } }),
    )
    .await?;
    recv(&mut first).await?;
    send(
        &mut first,
        json!({
            "type": "SET_PROPS",
            "space": "lobby",
            "scope": "protected",
            "props": { "b": "2" }
        }),
    )
    .await?;
    recv(&mut first).await?;

    let (_late, snapshot) = join(&url, "lobby").await?;
    assert_eq!(snapshot["public"], json!({ "a": "1" }));
    assert_eq!(snapshot["protected"], json!({ "b": "2" }));
    Ok(())
}

#[tokio::test]
async fn writing_without_joining_is_rejected() -> anyhow::Result<()> {
    let (url, state) = start_server().await?;
    let (mut ws, _) = connect_async(url.as_str()).await?;

    send(
        &mut ws,
        json!({ "type": "SET_PROPS", "space": "lobby", "props": { "a": "1" } }),
    )
    .await?;

    let reply = recv(&mut ws).await?;
    assert_eq!(reply["type"], "ERROR");
    assert!(state.spaces.read().await.get("lobby").is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_frames_are_skipped() -> anyhow::Result<()> {
    let (url, _) = start_server().await?;
    let (mut ws, _) = join(&url, "lobby").await?;

    ws.send(Message::Text("{not json".into())).await?;
    send(
        &mut ws,
        json!({ "type": "SET_PROPS", "space": "lobby", "props": { "a": "1" } }),
    )
    .await?;

    assert_eq!(recv(&mut ws).await?["type"], "STATE_CHANGED");
    Ok(())
}

#[tokio::test]
async fn disconnect_releases_the_watch() -> anyhow::Result<()> {
    let (url, state) = start_server().await?;
    let (ws, _) = join(&url, "lobby").await?;
    assert_eq!(state.spaces.read().await["lobby"].watchers, 1);

    drop(ws);

    for _ in 0..50 {
        if state.spaces.read().await["lobby"].watchers == 0 {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("watcher count never dropped to zero");
}

//! Clients syncing through a real relay server on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use tic_tac_toe_client::config::GameConfig;
use tic_tac_toe_client::game::{Cell, GameState, Player};
use tic_tac_toe_client::renderer::Renderer;
use tic_tac_toe_client::sync::{MoveOutcome, PropertyStore, SyncController, WsPropertyStore};
use tic_tac_toe_server::app_state::AppState;
use tic_tac_toe_server::{serve, UPDATE_CHANNEL_CAPACITY};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

type Client = SyncController<WsPropertyStore, fn(&GameState)>;

fn ignore_refresh(_: &GameState) {}

async fn start_server() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    tokio::spawn(serve(listener, Arc::new(AppState::new(tx))));
    Ok(format!("ws://{}/ws", addr))
}

fn config(instance: &str) -> GameConfig {
    let mut config = GameConfig::for_page("https://space.example/hall");
    config.apply_query(&format!("instance={}", instance));
    config
}

async fn client(url: &str, instance: &str) -> anyhow::Result<Client> {
    let store = WsPropertyStore::connect(url, "hall").await?;
    let renderer: fn(&GameState) = ignore_refresh;
    Ok(SyncController::new(&config(instance), Arc::new(store), renderer))
}

/// Pumps store notifications until `done` holds or two seconds pass.
async fn settle<R: Renderer>(
    ctl: &mut SyncController<WsPropertyStore, R>,
    done: impl Fn(&SyncController<WsPropertyStore, R>) -> bool,
) -> anyhow::Result<()> {
    for _ in 0..100 {
        ctl.process_pending_changes();
        if done(ctl) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("controller never settled")
}

#[tokio::test]
async fn two_clients_play_through_the_relay() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let url = start_server().await?;
    let mut alice = client(&url, "board").await?;
    let mut bob = client(&url, "board").await?;

    assert_eq!(alice.handle_local_move(1, 1).await, MoveOutcome::Published);
    assert!(alice.is_input_locked());
    settle(&mut alice, |c| !c.is_input_locked()).await?;
    settle(&mut bob, |c| c.game().board()[1][1] == Cell::PlayerOne).await?;
    assert_eq!(bob.game().current_player(), Player::Two);

    assert_eq!(bob.handle_local_move(0, 0).await, MoveOutcome::Published);
    settle(&mut bob, |c| !c.is_input_locked()).await?;
    settle(&mut alice, |c| c.game().board()[0][0] == Cell::PlayerTwo).await?;

    // A client joining mid-game catches up without publishing.
    let mut carol = client(&url, "board").await?;
    carol.on_init();
    assert_eq!(carol.game().board(), alice.game().board());
    assert!(!carol.is_input_locked());

    carol.handle_reset().await;
    settle(&mut alice, |c| c.game().board()[1][1] == Cell::Empty).await?;
    settle(&mut bob, |c| c.game().board()[1][1] == Cell::Empty).await?;
    assert_eq!(alice.game().current_player(), Player::One);
    Ok(())
}

#[tokio::test]
async fn instances_do_not_collide() -> anyhow::Result<()> {
    let url = start_server().await?;
    let mut left = client(&url, "left").await?;
    let mut right = client(&url, "right").await?;

    left.handle_local_move(2, 2).await;
    settle(&mut left, |c| !c.is_input_locked()).await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    right.process_pending_changes();
    assert_eq!(right.game().board()[2][2], Cell::Empty);

    let store = WsPropertyStore::connect(&url, "hall").await?;
    assert!(store.get(left.storage_key()).is_some());
    assert!(store.get(right.storage_key()).is_none());
    Ok(())
}

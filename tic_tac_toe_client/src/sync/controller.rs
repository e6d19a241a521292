//! Bridge between local input, the local [`GameState`] and the shared store.
//!
//! A local move is published optimistically and input stays locked until the
//! next state notification for the game key is applied. Our own echo and a
//! peer's update look the same and both unlock.

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::store::{PropertyChange, PropertyStore};
use crate::config::GameConfig;
use crate::game::{wire, GameState, StateRecord};
use crate::renderer::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    CellClicked { row: usize, col: usize },
    ResetClicked,
}

/// What happened to a local move request. Never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Published,
    GameOver,
    InputLocked,
    Illegal,
}

pub struct SyncController<S, R> {
    game: GameState,
    input_locked: bool,
    key: String,
    store: Arc<S>,
    renderer: R,
    changes: broadcast::Receiver<PropertyChange>,
}

impl<S, R> SyncController<S, R>
where
    S: PropertyStore,
    R: Renderer,
{
    pub fn new(config: &GameConfig, store: Arc<S>, renderer: R) -> Self {
        let changes = store.subscribe();
        SyncController {
            game: GameState::new(),
            input_locked: false,
            key: config.storage_key(),
            store,
            renderer,
            changes,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Catches up with a game already in progress. Never publishes and never
    /// touches the input lock.
    pub fn on_init(&mut self) {
        let Some(payload) = self.store.get(&self.key) else {
            info!("No existing game under {}; starting fresh.", self.key);
            return;
        };

        match wire::decode(&payload) {
            Ok(record) => {
                info!("Loaded existing game from {}.", self.key);
                self.game.load_state(record);
                self.renderer.on_visual_refresh_needed(&self.game);
            }
            Err(e) => error!("Failed to parse existing state under {}: {}", self.key, e),
        }
    }

    pub async fn handle_local_move(&mut self, row: usize, col: usize) -> MoveOutcome {
        if self.game.winner().is_some() {
            debug!("Move ({}, {}) ignored: game is over.", row, col);
            return MoveOutcome::GameOver;
        }
        if self.input_locked {
            info!("Input locked (syncing); ignoring ({}, {}).", row, col);
            return MoveOutcome::InputLocked;
        }

        let Some(next) = self.game.simulate_play(row, col) else {
            return MoveOutcome::Illegal;
        };

        info!("Locking input and sending move ({}, {}).", row, col);
        self.input_locked = true;
        self.publish(&next).await;
        MoveOutcome::Published
    }

    /// Allowed even while input is locked.
    pub async fn handle_reset(&mut self) {
        info!("Reset requested for {}.", self.key);
        self.game.reset();
        let fresh = self.game.get_state();
        self.publish(&fresh).await;
    }

    /// Overwrites the game key with `record`. Failures are logged only.
    pub async fn publish(&self, record: &StateRecord) {
        let payload = match wire::encode(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode state: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, payload).await {
            error!("Failed to publish state under {}: {}", self.key, e);
        }
    }

    /// Applies a state payload from the store. Returns whether it was applied.
    ///
    /// A payload that fails to parse is dropped and the lock is left as it
    /// was, so a malformed update can leave input locked.
    pub fn on_remote_or_local_echo(&mut self, payload: &str) -> bool {
        match wire::decode(payload) {
            Ok(record) => {
                debug!("Received state change; loading and unlocking.");
                self.game.load_state(record);
                self.renderer.on_visual_refresh_needed(&self.game);
                self.input_locked = false;
                true
            }
            Err(e) => {
                error!("Dropping malformed state under {}: {}", self.key, e);
                false
            }
        }
    }

    pub fn handle_store_change(&mut self, change: &PropertyChange) {
        if change.property == self.key {
            self.reload_from_store();
        }
    }

    /// Handles every notification already queued without waiting.
    /// Returns the number of notifications seen.
    pub fn process_pending_changes(&mut self) -> usize {
        let mut seen = 0;
        loop {
            match self.changes.try_recv() {
                Ok(change) => {
                    seen += 1;
                    self.handle_store_change(&change);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Missed {} store notifications; re-reading state.", skipped);
                    self.reload_from_store();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
            }
        }
    }

    /// Handles input events and store notifications one at a time until
    /// either source closes.
    pub async fn run(&mut self, mut inputs: mpsc::Receiver<InputEvent>) {
        info!("Sync loop started for {}.", self.key);

        loop {
            tokio::select! {
                event = inputs.recv() => match event {
                    Some(InputEvent::CellClicked { row, col }) => {
                        self.handle_local_move(row, col).await;
                    }
                    Some(InputEvent::ResetClicked) => self.handle_reset().await,
                    None => {
                        self.process_pending_changes();
                        info!("Input closed; stopping sync loop.");
                        break;
                    }
                },
                change = self.changes.recv() => match change {
                    Ok(change) => self.handle_store_change(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} store notifications; re-reading state.", skipped);
                        self.reload_from_store();
                    }
                    Err(RecvError::Closed) => {
                        warn!("Store notifications closed; stopping sync loop.");
                        break;
                    }
                },
            }
        }
    }

    fn reload_from_store(&mut self) {
        match self.store.get(&self.key) {
            Some(payload) => {
                self.on_remote_or_local_echo(&payload);
            }
            None => debug!("Change for {} carried no value.", self.key),
        }
    }
}

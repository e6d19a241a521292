//! Synced tic-tac-toe client.
//!
//! Every participant runs the same [`sync::SyncController`] against a shared
//! property store. The store is the only channel between clients: moves are
//! published optimistically as full game records and applied when the store
//! announces them back.

pub mod config;
pub mod error;
pub mod game;
pub mod renderer;
pub mod sync;

pub use error::{Error, Result};

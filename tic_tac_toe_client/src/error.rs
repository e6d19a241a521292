//! Error types for the sync client.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed state payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid cell value {value} at ({row}, {col})")]
    InvalidCell { row: usize, col: usize, value: u8 },

    #[error("invalid player {0} (expected 1 or 2)")]
    InvalidPlayer(u8),

    #[error("invalid winner '{0}' (expected null, 1, 2 or \"draw\")")]
    InvalidWinner(String),

    #[error("property store error: {0}")]
    Store(String),

    #[error("websocket error: {0}")]
    Connection(#[from] tungstenite::Error),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

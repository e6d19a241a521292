//! JSON representation of a game as stored under the shared property key.
//!
//! ```json
//! { "board": [[0,0,0],[0,1,0],[0,0,0]], "currentPlayer": 2, "winner": null, "lastModified": 1700000000000 }
//! ```
//!
//! Cells are `0` (empty), `1` (player one) or `2` (player two). `winner` is
//! `null`, `1`, `2` or `"draw"`.

use serde::{Deserialize, Serialize};

use super::models::{Board, Cell, Player, StateRecord, Winner, BOARD_SIZE};
use crate::error::{Error, Result};

pub const DRAW_LABEL: &str = "draw";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireState {
    pub board: [[u8; BOARD_SIZE]; BOARD_SIZE],
    pub current_player: u8,
    pub winner: Option<WireWinner>,
    // Some peers publish a freshly reset game without a timestamp.
    #[serde(default)]
    pub last_modified: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireWinner {
    Mark(u8),
    Label(String),
}

fn cell_to_wire(cell: Cell) -> u8 {
    match cell {
        Cell::Empty => 0,
        Cell::PlayerOne => 1,
        Cell::PlayerTwo => 2,
    }
}

fn player_to_wire(player: Player) -> u8 {
    match player {
        Player::One => 1,
        Player::Two => 2,
    }
}

fn player_from_wire(value: u8) -> Result<Player> {
    match value {
        1 => Ok(Player::One),
        2 => Ok(Player::Two),
        other => Err(Error::InvalidPlayer(other)),
    }
}

impl From<&StateRecord> for WireState {
    fn from(record: &StateRecord) -> Self {
        WireState {
            board: record.board.map(|row| row.map(cell_to_wire)),
            current_player: player_to_wire(record.current_player),
            winner: record.winner.map(|winner| match winner {
                Winner::Player(player) => WireWinner::Mark(player_to_wire(player)),
                Winner::Draw => WireWinner::Label(DRAW_LABEL.to_string()),
            }),
            last_modified: record.last_modified,
        }
    }
}

impl TryFrom<WireState> for StateRecord {
    type Error = Error;

    fn try_from(wire: WireState) -> Result<Self> {
        let mut board: Board = Default::default();
        for (row, cells) in wire.board.iter().enumerate() {
            for (col, &value) in cells.iter().enumerate() {
                board[row][col] = match value {
                    0 => Cell::Empty,
                    1 => Cell::PlayerOne,
                    2 => Cell::PlayerTwo,
                    value => return Err(Error::InvalidCell { row, col, value }),
                };
            }
        }

        let winner = match wire.winner {
            None => None,
            Some(WireWinner::Mark(mark)) => Some(Winner::Player(
                player_from_wire(mark).map_err(|_| Error::InvalidWinner(mark.to_string()))?,
            )),
            Some(WireWinner::Label(label)) if label == DRAW_LABEL => Some(Winner::Draw),
            Some(WireWinner::Label(label)) => return Err(Error::InvalidWinner(label)),
        };

        Ok(StateRecord {
            board,
            current_player: player_from_wire(wire.current_player)?,
            winner,
            last_modified: wire.last_modified,
        })
    }
}

pub fn encode(record: &StateRecord) -> Result<String> {
    Ok(serde_json::to_string(&WireState::from(record))?)
}

pub fn decode(payload: &str) -> Result<StateRecord> {
    let wire: WireState = serde_json::from_str(payload)?;
    wire.try_into()
}

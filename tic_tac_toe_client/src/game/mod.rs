pub mod models;
pub mod wire;

pub use models::{
    Board, Cell, CellView, Coord, GameState, Line, Player, StateRecord, Winner, BOARD_SIZE,
    WINNING_LINES,
};

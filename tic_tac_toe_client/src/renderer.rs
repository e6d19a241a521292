//! Seam to the scene renderer.
//!
//! The renderer only visualizes what the controller decides. Input flows the
//! other way as [`InputEvent`](crate::sync::InputEvent)s.

use tracing::info;

use crate::game::{CellView, GameState, Player, Winner, BOARD_SIZE};

pub trait Renderer: Send {
    fn on_visual_refresh_needed(&mut self, game: &GameState);
}

impl<F> Renderer for F
where
    F: FnMut(&GameState) + Send,
{
    fn on_visual_refresh_needed(&mut self, game: &GameState) {
        self(game)
    }
}

/// Writes the board to the log. Used by the headless client.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn on_visual_refresh_needed(&mut self, game: &GameState) {
        for line in board_lines(game) {
            info!("{}", line);
        }

        match game.winner() {
            Some(Winner::Player(player)) => info!("🏆 Player {:?} wins!", player),
            Some(Winner::Draw) => info!("It's a draw!"),
            None if game.is_game_over() => info!("Board is full."),
            None => info!("🕐 Player {:?}'s turn", game.current_player()),
        }
    }
}

/// One text row per board row. Winning cells are shown in brackets.
pub fn board_lines(game: &GameState) -> Vec<String> {
    (0..BOARD_SIZE)
        .map(|row| {
            (0..BOARD_SIZE)
                .map(|col| match game.cell_view(row, col) {
                    CellView::Empty => " . ",
                    CellView::PlayerOne => " X ",
                    CellView::PlayerTwo => " O ",
                    CellView::Winning(Player::One) => "[X]",
                    CellView::Winning(Player::Two) => "[O]",
                })
                .collect::<String>()
        })
        .collect()
}

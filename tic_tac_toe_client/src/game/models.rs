use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const BOARD_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::PlayerOne => Some(Player::One),
            Cell::PlayerTwo => Some(Player::Two),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn next(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn to_cell(self) -> Cell {
        match self {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Player(Player),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Coord { row, col }
    }
}

pub type Line = [Coord; 3];

pub type Board = [[Cell; BOARD_SIZE]; BOARD_SIZE];

/// The eight lines in scan order: rows, then columns, then the two diagonals.
/// When several lines are complete at once the first one here is reported.
pub const WINNING_LINES: [Line; 8] = [
    [Coord::new(0, 0), Coord::new(0, 1), Coord::new(0, 2)],
    [Coord::new(1, 0), Coord::new(1, 1), Coord::new(1, 2)],
    [Coord::new(2, 0), Coord::new(2, 1), Coord::new(2, 2)],
    [Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0)],
    [Coord::new(0, 1), Coord::new(1, 1), Coord::new(2, 1)],
    [Coord::new(0, 2), Coord::new(1, 2), Coord::new(2, 2)],
    [Coord::new(0, 0), Coord::new(1, 1), Coord::new(2, 2)],
    [Coord::new(0, 2), Coord::new(1, 1), Coord::new(2, 0)],
];

pub fn empty_board() -> Board {
    [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE]
}

/// Returns `(player_one, player_two)` mark counts.
pub fn piece_counts(board: &Board) -> (usize, usize) {
    board
        .iter()
        .flatten()
        .fold((0, 0), |(one, two), cell| match cell {
            Cell::PlayerOne => (one + 1, two),
            Cell::PlayerTwo => (one, two + 1),
            Cell::Empty => (one, two),
        })
}

fn find_winning_line(board: &Board) -> Option<Line> {
    WINNING_LINES.iter().copied().find(|[a, b, c]| {
        let first = board[a.row][a.col];
        first != Cell::Empty && first == board[b.row][b.col] && first == board[c.row][c.col]
    })
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Snapshot of a game as it travels to and from the shared store.
/// The winning line is not part of it; it is recomputed on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub board: Board,
    pub current_player: Player,
    pub winner: Option<Winner>,
    pub last_modified: u64,
}

/// What a renderer should show in a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    Empty,
    PlayerOne,
    PlayerTwo,
    /// Part of the winning line; highlighted instead of the player colour.
    Winning(Player),
}

#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    current_player: Player,
    winner: Option<Winner>,
    winning_line: Option<Line>,
    last_modified: u64,
    game_over: bool,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            board: empty_board(),
            current_player: Player::One,
            winner: None,
            winning_line: None,
            last_modified: now_millis(),
            game_over: false,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = GameState::default();
        debug!("Game reset. Player {:?} to move.", self.current_player);
    }

    /// Replaces the whole state with an externally supplied record.
    ///
    /// The record is trusted: boards that could not arise from legal play
    /// are loaded as they are.
    pub fn load_state(&mut self, record: StateRecord) {
        self.board = record.board;
        self.current_player = record.current_player;
        self.winner = record.winner;
        self.last_modified = record.last_modified;
        self.winning_line = None;

        match self.winner {
            Some(Winner::Player(_)) => {
                self.check_win();
                self.game_over = true;
            }
            Some(Winner::Draw) => self.game_over = true,
            None => self.game_over = self.check_draw(),
        }

        let (one, two) = piece_counts(&self.board);
        if one != two && one != two + 1 {
            warn!(
                "Loaded board has unreachable piece counts: one={}, two={}",
                one, two
            );
        }

        debug!(
            "State loaded: current={:?}, winner={:?}, game_over={}",
            self.current_player, self.winner, self.game_over
        );
    }

    pub fn get_state(&self) -> StateRecord {
        StateRecord {
            board: self.board,
            current_player: self.current_player,
            winner: self.winner,
            last_modified: self.last_modified,
        }
    }

    /// Computes the record that would result from the current player marking
    /// `(row, col)`, without touching `self`. Returns `None` for a move that
    /// is not legal right now.
    pub fn simulate_play(&self, row: usize, col: usize) -> Option<StateRecord> {
        if self.game_over {
            debug!("Move rejected: Game is already over.");
            return None;
        }
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            debug!("Move rejected: ({}, {}) is out of bounds.", row, col);
            return None;
        }
        if self.board[row][col] != Cell::Empty {
            debug!("Move rejected: ({}, {}) is already taken.", row, col);
            return None;
        }

        let mut candidate = GameState {
            board: self.board,
            current_player: self.current_player,
            winner: None,
            winning_line: None,
            last_modified: self.last_modified,
            game_over: false,
        };
        candidate.board[row][col] = self.current_player.to_cell();

        let winner = if candidate.check_win() {
            Some(Winner::Player(self.current_player))
        } else if candidate.check_draw() {
            Some(Winner::Draw)
        } else {
            None
        };

        let current_player = if winner.is_some() {
            self.current_player
        } else {
            self.current_player.next()
        };

        Some(StateRecord {
            board: candidate.board,
            current_player,
            winner,
            last_modified: now_millis(),
        })
    }

    /// Records the first complete line as the winning line. Leaves the
    /// winning line untouched when there is none.
    pub fn check_win(&mut self) -> bool {
        match find_winning_line(&self.board) {
            Some(line) => {
                self.winning_line = Some(line);
                true
            }
            None => false,
        }
    }

    pub fn check_draw(&self) -> bool {
        self.board
            .iter()
            .all(|row| row.iter().all(|&cell| cell != Cell::Empty))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn winning_line(&self) -> Option<&Line> {
        self.winning_line.as_ref()
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Coordinates off the board read as empty.
    pub fn cell_view(&self, row: usize, col: usize) -> CellView {
        let Some(&cell) = self.board.get(row).and_then(|r| r.get(col)) else {
            return CellView::Empty;
        };
        let on_line = self
            .winning_line
            .is_some_and(|line| line.contains(&Coord::new(row, col)));

        match (cell.player(), on_line) {
            (Some(player), true) => CellView::Winning(player),
            (Some(Player::One), false) => CellView::PlayerOne,
            (Some(Player::Two), false) => CellView::PlayerTwo,
            (None, _) => CellView::Empty,
        }
    }
}

//! Board representation for Connect-Four

pub mod bitboard;
pub mod board;


// Re-exports
pub use board::Board;

/// Standard board width (columns)
pub const WIDTH: usize = 7;
/// Standard board height (rows)
pub const HEIGHT: usize = 6;

/// The standard 7x6 board.
pub type Position = Board<WIDTH, HEIGHT>;

/// The two sides. `First` drops the first stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    First,
    Second,
}

impl Player {
    /// Get the other side
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    /// Symbol used when printing a board
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Player::First => 'X',
            Player::Second => 'O',
        }
    }
}

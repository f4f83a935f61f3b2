//! Bitboard position with O(1) move application

use std::fmt;
use std::str::FromStr;

use super::bitboard::{self, alignment, winning_cells};
use super::Player;
use crate::error::{IllegalMoveError, PositionParseError};

/// A Connect-Four position on a `W` x `H` board.
///
/// Two bitboards describe the stones: `current` holds the stones of the side
/// to move and `mask` holds every stone. Player identity is never stored, it
/// follows from the parity of `moves`. `current + mask` is therefore a unique
/// key for the cell contents and side to move.
///
/// The layout needs `W * (H + 1)` bits, so boards larger than 64 of those are
/// rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board<const W: usize, const H: usize> {
    pub(crate) current: u64,
    pub(crate) mask: u64,
    moves: usize,
}

impl<const W: usize, const H: usize> Board<W, H> {
    pub const WIDTH: usize = W;
    pub const HEIGHT: usize = H;
    /// Number of playable cells
    pub const CELLS: usize = W * H;
    /// Lowest score a position can have (lost to the opponent's 4th stone)
    pub const MIN_SCORE: i32 = -((W * H) as i32) / 2 + 3;
    /// Highest score a position can have (won with the own 4th stone)
    pub const MAX_SCORE: i32 = ((W * H) as i32 + 1) / 2 - 3;

    const VALID: () = assert!(
        W >= 1 && H >= 1 && W * (H + 1) <= 64,
        "board does not fit in a 64-bit bitboard"
    );

    pub(crate) const BOTTOM: u64 = bitboard::bottom_mask(W, H);
    pub(crate) const BOARD: u64 = bitboard::board_mask(W, H);

    /// Empty board, first player to move.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID;
        Self {
            current: 0,
            mask: 0,
            moves: 0,
        }
    }

    /// Build a position from a sequence of 1-based column digits, e.g. `"4453"`.
    ///
    /// Fails on the first character that is not a column digit or that names a
    /// move which cannot be played, including any move after the game is won.
    pub fn from_moves(seq: &str) -> Result<Self, PositionParseError> {
        let mut board = Self::new();
        for (index, ch) in seq.chars().enumerate() {
            let col = match ch.to_digit(10) {
                Some(d) if d >= 1 => d as usize - 1,
                _ => return Err(PositionParseError::InvalidCharacter { index, ch }),
            };
            board = board
                .play(col)
                .map_err(|source| PositionParseError::IllegalMove { index, source })?;
        }
        Ok(board)
    }

    /// Number of stones on the board
    #[inline]
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Side to move
    #[inline]
    pub fn player_to_move(&self) -> Player {
        if self.moves % 2 == 0 {
            Player::First
        } else {
            Player::Second
        }
    }

    /// Number of stones in column `col` (0 for an out-of-range column)
    #[inline]
    pub fn height(&self, col: usize) -> usize {
        if col >= W {
            return 0;
        }
        (self.mask & bitboard::column_mask(H, col)).count_ones() as usize
    }

    /// Owner of the cell at `col`, `row` (row 0 is the bottom).
    pub fn cell(&self, col: usize, row: usize) -> Option<Player> {
        if col >= W || row >= H {
            return None;
        }
        let bit = 1u64 << (col * (H + 1) + row);
        if self.mask & bit == 0 {
            None
        } else if self.current & bit != 0 {
            Some(self.player_to_move())
        } else {
            Some(self.player_to_move().opponent())
        }
    }

    /// Check if a stone can be dropped in `col`.
    ///
    /// False for out-of-range columns and full columns. Room in the column is
    /// not enough on its own: once either side has four in a row the game is
    /// over and no column is legal, matching [`play`](Self::play) returning
    /// [`IllegalMoveError::GameOver`].
    #[inline]
    pub fn is_legal(&self, col: usize) -> bool {
        col < W && self.can_play(col) && !self.is_won()
    }

    /// Return the position after dropping a stone in `col`.
    pub fn play(&self, col: usize) -> Result<Self, IllegalMoveError> {
        if col >= W {
            return Err(IllegalMoveError::InvalidColumn(col));
        }
        if self.is_won() {
            return Err(IllegalMoveError::GameOver);
        }
        if !self.can_play(col) {
            return Err(IllegalMoveError::ColumnFull(col));
        }
        let mut next = *self;
        next.play_bit(self.column_move(col));
        Ok(next)
    }

    /// Check if dropping a stone in `col` makes four in a row for the side to move.
    ///
    /// Pure mask test, the successor is never built.
    #[inline]
    pub fn is_winning_move(&self, col: usize) -> bool {
        col < W
            && !self.is_won()
            && self.winning_position() & self.possible() & bitboard::column_mask(H, col) != 0
    }

    /// Check if the side that just moved has four in a row.
    #[inline]
    pub fn is_won(&self) -> bool {
        alignment(self.current ^ self.mask, H)
    }

    /// Board full and nobody has four in a row.
    #[inline]
    pub fn is_draw(&self) -> bool {
        self.moves == Self::CELLS && !self.is_won()
    }

    /// Check if the side to move has a winning move available.
    #[inline]
    pub fn can_win_next(&self) -> bool {
        self.winning_position() & self.possible() != 0
    }

    /// Moves (as a bitmask of destination cells) that do not let the opponent
    /// win on the next ply.
    ///
    /// Returns 0 when every move loses, which includes the case of two
    /// opponent threats. Must not be called when the side to move can win
    /// immediately.
    pub fn possible_non_losing_moves(&self) -> u64 {
        debug_assert!(!self.can_win_next());
        let mut possible = self.possible();
        let opponent_win = self.opponent_winning_position();
        let forced = possible & opponent_win;
        if forced != 0 {
            if forced & (forced - 1) != 0 {
                // two threats to block at once
                return 0;
            }
            possible = forced;
        }
        // never play directly below an opponent winning cell
        possible & !(opponent_win >> 1)
    }

    /// Number of winning cells the side to move owns after playing `mv`.
    #[inline]
    pub fn move_score(&self, mv: u64) -> u32 {
        winning_cells(self.current | mv, self.mask, W, H).count_ones()
    }

    /// Unique key of the cell contents and side to move.
    #[inline]
    pub fn key(&self) -> u64 {
        self.current + self.mask
    }

    /// Left-right reflection of the position.
    pub fn mirror(&self) -> Self {
        let column = bitboard::column_bits(H);
        let mut current = 0;
        let mut mask = 0;
        for col in 0..W {
            let from = col * (H + 1);
            let to = (W - 1 - col) * (H + 1);
            current |= ((self.current >> from) & column) << to;
            mask |= ((self.mask >> from) & column) << to;
        }
        Self {
            current,
            mask,
            moves: self.moves,
        }
    }

    /// Key shared by a position and its mirror image.
    #[inline]
    pub fn mirror_key(&self) -> u64 {
        self.key().min(self.mirror().key())
    }

    /// Cells the side to move can play into, one per non-full column.
    #[inline]
    pub(crate) fn possible(&self) -> u64 {
        self.mask.wrapping_add(Self::BOTTOM) & Self::BOARD
    }

    /// Destination cell of a move in `col` (0 if the column is full).
    #[inline]
    pub(crate) fn column_move(&self, col: usize) -> u64 {
        self.possible() & bitboard::column_mask(H, col)
    }

    #[inline]
    fn can_play(&self, col: usize) -> bool {
        self.mask & bitboard::top_mask_col(H, col) == 0
    }

    #[inline]
    fn winning_position(&self) -> u64 {
        winning_cells(self.current, self.mask, W, H)
    }

    #[inline]
    fn opponent_winning_position(&self) -> u64 {
        winning_cells(self.current ^ self.mask, self.mask, W, H)
    }

    /// Drop a stone on the cell `mv` (one bit of [`possible`](Self::possible)).
    #[inline]
    pub(crate) fn play_bit(&mut self, mv: u64) {
        self.current ^= self.mask;
        self.mask |= mv;
        self.moves += 1;
    }

    /// Take back the stone at `mv`, the last one played.
    #[inline]
    pub(crate) fn undo_bit(&mut self, mv: u64) {
        self.mask ^= mv;
        self.current ^= self.mask;
        self.moves -= 1;
    }
}

impl<const W: usize, const H: usize> Default for Board<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> FromStr for Board<W, H> {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_moves(s.trim())
    }
}

impl<const W: usize, const H: usize> fmt::Display for Board<W, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..H).rev() {
            for col in 0..W {
                let ch = self.cell(col, row).map_or('.', Player::symbol);
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

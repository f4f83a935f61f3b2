//! Move ordering
//!
//! Columns are tried center-out, and within that static order by how many
//! winning cells the move leaves the mover with. Good ordering matters far
//! more than anything else for alpha-beta pruning on this game.

use crate::board::bitboard::column_mask;
use crate::board::Board;

/// Columns from the center outwards: 3, 2, 4, 1, 5, 0, 6 on seven columns.
pub const fn column_order<const W: usize>() -> [usize; W] {
    let mut order = [0usize; W];
    let mut i = 0;
    while i < W {
        let half = W as isize / 2;
        let step = (i as isize + 1) / 2;
        let col = if i % 2 == 0 { half + step } else { half - step };
        order[i] = col as usize;
        i += 1;
    }
    order
}

/// Fixed-capacity insertion sorter over at most `W` moves.
///
/// Moves come out highest score first. Among equal scores the move added
/// last comes out first, so adding columns in reverse [`column_order`] keeps
/// the center preference as the tie-break. No allocation.
pub struct MoveSorter<const W: usize> {
    entries: [(u64, u32); W],
    size: usize,
}

impl<const W: usize> MoveSorter<W> {
    pub fn new() -> Self {
        Self {
            entries: [(0, 0); W],
            size: 0,
        }
    }

    /// Add a move bitmask with its score.
    #[inline]
    pub fn add(&mut self, mv: u64, score: u32) {
        debug_assert!(self.size < W);
        let mut pos = self.size;
        self.size += 1;
        while pos > 0 && self.entries[pos - 1].1 > score {
            self.entries[pos] = self.entries[pos - 1];
            pos -= 1;
        }
        self.entries[pos] = (mv, score);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl<const W: usize> Default for MoveSorter<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> Iterator for MoveSorter<W> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.size == 0 {
            return None;
        }
        self.size -= 1;
        Some(self.entries[self.size].0)
    }
}

/// Sort the moves in `candidates` (one bit per destination cell) best first.
#[inline]
pub(crate) fn sort_moves<const W: usize, const H: usize>(
    board: &Board<W, H>,
    candidates: u64,
) -> MoveSorter<W> {
    let mut sorter = MoveSorter::new();
    let order = column_order::<W>();
    for &col in order.iter().rev() {
        let mv = candidates & column_mask(H, col);
        if mv != 0 {
            sorter.add(mv, board.move_score(mv));
        }
    }
    sorter
}

/// Legal columns of `board` in search order, best first.
///
/// Deterministic: the same position always yields the same order.
///
/// ```
/// use connect4::{ordered_moves, Position};
///
/// let moves = ordered_moves(&Position::new());
/// assert_eq!(moves, vec![3, 2, 4, 1, 5, 0, 6]);
/// ```
pub fn ordered_moves<const W: usize, const H: usize>(board: &Board<W, H>) -> Vec<usize> {
    if board.is_won() {
        return Vec::new();
    }
    sort_moves(board, board.possible())
        .map(|mv| mv.trailing_zeros() as usize / (H + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    #[test]
    fn test_column_order() {
        assert_eq!(column_order::<7>(), [3, 2, 4, 1, 5, 0, 6]);
        assert_eq!(column_order::<4>(), [2, 1, 3, 0]);
        assert_eq!(column_order::<1>(), [0]);
    }

    #[test]
    fn test_sorter_highest_score_first() {
        let mut sorter = MoveSorter::<4>::new();
        sorter.add(1, 2);
        sorter.add(2, 5);
        sorter.add(4, 0);
        assert_eq!(sorter.len(), 3);
        assert_eq!(sorter.collect::<Vec<_>>(), vec![2, 1, 4]);
    }

    #[test]
    fn test_sorter_ties_pop_last_added_first() {
        let mut sorter = MoveSorter::<3>::new();
        sorter.add(1, 1);
        sorter.add(2, 1);
        sorter.add(4, 1);
        assert_eq!(sorter.collect::<Vec<_>>(), vec![4, 2, 1]);
    }

    #[test]
    fn test_empty_sorter() {
        let mut sorter = MoveSorter::<7>::default();
        assert!(sorter.is_empty());
        assert_eq!(sorter.next(), None);
    }

    #[test]
    fn test_ordered_moves_prefers_threats() {
        // first player has two stacked in the rightmost column
        let pos = Position::from_moves("7171").unwrap();
        let moves = ordered_moves(&pos);
        // a third stone creates a winning cell, nothing else does
        assert_eq!(moves, vec![6, 3, 2, 4, 1, 5, 0]);
    }

    #[test]
    fn test_ordered_moves_skips_full_columns() {
        let pos = Position::from_moves("444444").unwrap();
        let moves = ordered_moves(&pos);
        assert_eq!(moves, vec![2, 4, 1, 5, 0, 6]);
    }

    #[test]
    fn test_ordered_moves_is_deterministic() {
        let pos = Position::from_moves("4455").unwrap();
        assert_eq!(ordered_moves(&pos), ordered_moves(&pos));
    }

    #[test]
    fn test_ordered_moves_after_win() {
        let pos = Position::from_moves("1212121").unwrap();
        assert!(ordered_moves(&pos).is_empty());
    }
}

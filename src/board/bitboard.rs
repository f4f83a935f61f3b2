//! Bitboard mask arithmetic for column-major Connect-Four boards
//!
//! A board of `width` columns and `height` rows is stored in a single `u64`,
//! `height + 1` bits per column, bottom cell first. The extra bit on top of
//! every column is a sentinel that is never set, so shifting a stone pattern
//! sideways can never wrap a run from the top of one column into the bottom of
//! the next.
//!
//! ```text
//!   .  .  .  .  .  .  .     <- sentinel row
//!   5 12 19 26 33 40 47
//!   4 11 18 25 32 39 46
//!   3 10 17 24 31 38 45
//!   2  9 16 23 30 37 44
//!   1  8 15 22 29 36 43
//!   0  7 14 21 28 35 42
//! ```
//!
//! Every function here is `const` so the per-dimension masks can be computed
//! once as associated constants of [`Board`](super::Board).

/// Right shift that yields 0 instead of overflowing for shifts of 64 or more.
#[inline]
pub const fn shr(bits: u64, n: usize) -> u64 {
    if n >= 64 {
        0
    } else {
        bits >> n
    }
}

/// Left shift that yields 0 instead of overflowing for shifts of 64 or more.
#[inline]
pub const fn shl(bits: u64, n: usize) -> u64 {
    if n >= 64 {
        0
    } else {
        bits << n
    }
}

/// One bit at the bottom cell of every column.
pub const fn bottom_mask(width: usize, height: usize) -> u64 {
    let mut mask = 0u64;
    let mut col = 0;
    while col < width {
        mask |= 1u64 << (col * (height + 1));
        col += 1;
    }
    mask
}

/// Every playable cell (sentinel row excluded).
pub const fn board_mask(width: usize, height: usize) -> u64 {
    bottom_mask(width, height) * column_bits(height)
}

/// The `height` low bits, i.e. one full column at column 0.
pub const fn column_bits(height: usize) -> u64 {
    shl(1, height).wrapping_sub(1)
}

/// All cells of column `col`.
#[inline]
pub const fn column_mask(height: usize, col: usize) -> u64 {
    column_bits(height) << (col * (height + 1))
}

/// Bottom cell of column `col`.
#[inline]
pub const fn bottom_mask_col(height: usize, col: usize) -> u64 {
    1u64 << (col * (height + 1))
}

/// Top playable cell of column `col`.
#[inline]
pub const fn top_mask_col(height: usize, col: usize) -> u64 {
    1u64 << (height - 1 + col * (height + 1))
}

/// True if `stones` contains four aligned cells in any direction.
#[inline]
pub const fn alignment(stones: u64, height: usize) -> bool {
    // horizontal, diagonal '\', diagonal '/', vertical
    let shifts = [height + 1, height, height + 2, 1];
    let mut i = 0;
    while i < shifts.len() {
        let s = shifts[i];
        let pairs = stones & shr(stones, s);
        if pairs & shr(pairs, 2 * s) != 0 {
            return true;
        }
        i += 1;
    }
    false
}

/// Empty cells that would complete four in a row for the owner of `stones`.
///
/// The result is restricted to empty cells of the board, but does not check
/// whether a cell is currently reachable (its column may not be filled up to
/// it yet).
#[inline]
pub const fn winning_cells(stones: u64, occupied: u64, width: usize, height: usize) -> u64 {
    // vertical: three stones directly below
    let mut cells = shl(stones, 1) & shl(stones, 2) & shl(stones, 3);

    let shifts = [height + 1, height, height + 2];
    let mut i = 0;
    while i < shifts.len() {
        let s = shifts[i];
        let mut p = shl(stones, s) & shl(stones, 2 * s);
        cells |= p & shl(stones, 3 * s);
        cells |= p & shr(stones, s);
        p = shr(stones, s) & shr(stones, 2 * s);
        cells |= p & shl(stones, s);
        cells |= p & shr(stones, 3 * s);
        i += 1;
    }

    cells & (board_mask(width, height) ^ occupied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_masks() {
        assert_eq!(bottom_mask(7, 6), 0x408_1020_4081);
        assert_eq!(column_mask(6, 0), 0b11_1111);
        assert_eq!(column_mask(6, 1), 0b11_1111 << 7);
        assert_eq!(top_mask_col(6, 0), 1 << 5);
        assert_eq!(bottom_mask_col(6, 6), 1 << 42);
        assert_eq!(board_mask(7, 6).count_ones(), 42);
    }

    #[test]
    fn test_sentinel_row_is_empty() {
        let board = board_mask(7, 6);
        for col in 0..7 {
            assert_eq!(board & (1u64 << (6 + col * 7)), 0);
        }
    }

    #[test]
    fn test_shifts_saturate() {
        assert_eq!(shr(u64::MAX, 64), 0);
        assert_eq!(shl(u64::MAX, 80), 0);
        assert_eq!(shr(0b1000, 3), 1);
    }

    #[test]
    fn test_alignment_directions() {
        // vertical in column 0
        assert!(alignment(0b1111, 6));
        // horizontal on the bottom row
        let row = bottom_mask(4, 6);
        assert!(alignment(row, 6));
        // only three
        assert!(!alignment(0b0111, 6));
        // diagonal '/': (0,0) (1,1) (2,2) (3,3)
        let diag = 1 | (1 << 8) | (1 << 16) | (1 << 24);
        assert!(alignment(diag, 6));
        // diagonal '\': (0,3) (1,2) (2,1) (3,0)
        let anti = (1 << 3) | (1 << 9) | (1 << 15) | (1 << 21);
        assert!(alignment(anti, 6));
    }

    #[test]
    fn test_no_wrap_between_columns() {
        // top three of column 0 plus bottom of column 1 are consecutive bit
        // indices only because of the sentinel gap; they must not align
        let stones = (1 << 3) | (1 << 4) | (1 << 5) | (1 << 7);
        assert!(!alignment(stones, 6));
    }

    #[test]
    fn test_winning_cells_vertical_and_horizontal() {
        let stones = 0b111;
        let cells = winning_cells(stones, stones, 7, 6);
        assert_eq!(cells, 0b1000);

        // bottom row columns 0,1,2 -> column 3 bottom wins
        let row = 1 | (1 << 7) | (1 << 14);
        let cells = winning_cells(row, row, 7, 6);
        assert_eq!(cells, 1 << 21);
    }

    #[test]
    fn test_winning_cells_excludes_occupied() {
        let row = 1 | (1 << 7) | (1 << 14);
        let occupied = row | (1 << 21);
        assert_eq!(winning_cells(row, occupied, 7, 6), 0);
    }
}

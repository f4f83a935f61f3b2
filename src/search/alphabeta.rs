//! Score-bounded negamax with alpha-beta pruning and null-window narrowing
//!
//! Scores follow one convention throughout: for a position with `m` stones
//! on a board of `CELLS` cells, winning with the stone of ply `p` (counting
//! from 1 for the first stone ever dropped) scores `(CELLS + 2 - p) / 2`,
//! losing to the opponent's stone of ply `q` scores `-(CELLS + 2 - q) / 2`,
//! and a draw scores 0. Faster wins and slower losses are worth more.
//!
//! A [`Worker`] owns a private copy of the position and walks the tree with
//! push/undo on it. Workers share the transposition table and the stop flag
//! through an `Arc<SharedState>`, so several of them can search different
//! root moves at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::board::Board;

use super::ordering::sort_moves;
use super::{EntryType, TranspositionTable};

/// Nodes between deadline checks
const TIME_CHECK_MASK: u64 = 4095;

/// Search statistics for diagnostics and tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Positions visited
    pub nodes: u64,
    /// Total TT probes
    pub tt_probes: u64,
    /// TT probes that found an entry for the position
    pub tt_hits: u64,
    /// Total beta cutoffs (fail-high)
    pub beta_cutoffs: u64,
    /// Beta cutoffs on the first move tried (measures move ordering quality)
    pub first_move_cutoffs: u64,
}

impl SearchStats {
    /// First-move cutoff rate in percent
    pub fn first_move_rate(&self) -> f64 {
        if self.beta_cutoffs == 0 {
            0.0
        } else {
            self.first_move_cutoffs as f64 / self.beta_cutoffs as f64 * 100.0
        }
    }

    /// TT hit rate in percent
    pub fn tt_hit_rate(&self) -> f64 {
        if self.tt_probes == 0 {
            0.0
        } else {
            self.tt_hits as f64 / self.tt_probes as f64 * 100.0
        }
    }

    /// Merge another stats into this one (for combining worker stats)
    pub fn merge(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.tt_probes += other.tt_probes;
        self.tt_hits += other.tt_hits;
        self.beta_cutoffs += other.beta_cutoffs;
        self.first_move_cutoffs += other.first_move_cutoffs;
    }
}

/// Cloneable handle that asks a running query to stop.
///
/// The query in progress returns as aborted. Every query clears the flag when
/// it starts, so a stop requested while no query runs has no effect.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the current query to stop.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check if a stop was requested.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

// =============================================================================
// SharedState: thread-safe state shared across all workers
// =============================================================================

/// State shared between all search workers.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) tt: TranspositionTable,
    /// Global stop signal, set by a `StopHandle` or by a worker past its deadline.
    pub(crate) stop: StopHandle,
}

impl SharedState {
    pub(crate) fn new(tt: TranspositionTable) -> Self {
        Self {
            tt,
            stop: StopHandle::new(),
        }
    }
}

/// Value of positions that need no search: already lost, winnable in one
/// move, or full.
pub(crate) fn immediate_value<const W: usize, const H: usize>(board: &Board<W, H>) -> Option<i32> {
    let cells = Board::<W, H>::CELLS as i32;
    let moves = board.moves() as i32;
    if board.is_won() {
        Some(-(cells + 2 - moves) / 2)
    } else if board.can_win_next() {
        Some((cells + 1 - moves) / 2)
    } else if board.moves() == Board::<W, H>::CELLS {
        Some(0)
    } else {
        None
    }
}

// =============================================================================
// Worker: per-thread search state
// =============================================================================

/// Per-thread search worker.
///
/// `board` is the workspace the recursion mutates with `play_bit` and
/// `undo_bit`; it is restored to the searched position whenever a search
/// call returns.
pub(crate) struct Worker<const W: usize, const H: usize> {
    shared: Arc<SharedState>,
    board: Board<W, H>,
    deadline: Option<Instant>,
    pub(crate) stats: SearchStats,
}

impl<const W: usize, const H: usize> Worker<W, H> {
    pub(crate) fn new(shared: Arc<SharedState>, deadline: Option<Instant>) -> Self {
        Self {
            shared,
            board: Board::new(),
            deadline,
            stats: SearchStats::default(),
        }
    }

    /// Check if search should stop (deadline or global stop signal).
    #[inline]
    pub(crate) fn is_stopped(&self) -> bool {
        self.shared.stop.is_stopped()
    }

    /// Check the deadline and raise the global stop if it passed.
    #[inline]
    fn check_time(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.shared.stop.stop();
                return true;
            }
        }
        false
    }

    /// Exact score of `board`, or `None` if the search was stopped.
    ///
    /// With `weak` only the sign is computed and returned (-1, 0 or 1).
    pub(crate) fn solve(&mut self, board: &Board<W, H>, weak: bool) -> Option<i32> {
        if let Some(value) = immediate_value(board) {
            return Some(if weak { value.signum() } else { value });
        }

        let cells = Board::<W, H>::CELLS as i32;
        let moves = board.moves() as i32;
        let (mut min, mut max) = if weak {
            (-1, 1)
        } else {
            (-(cells - moves) / 2, (cells + 1 - moves) / 2)
        };

        self.board = *board;
        // narrow [min, max] with null-window probes until it closes
        while min < max {
            let mut med = min + (max - min) / 2;
            // bias the probe towards 0
            if med <= 0 && min / 2 < med {
                med = min / 2;
            } else if med >= 0 && max / 2 > med {
                med = max / 2;
            }
            let r = self.negamax(med, med + 1);
            if self.is_stopped() {
                return None;
            }
            debug!("narrowing [{min}, {max}] probe {med} -> {r}");
            if r <= med {
                max = r;
            } else {
                min = r;
            }
        }

        Some(if weak { min.signum() } else { min })
    }

    /// Check if the value of `board` is at most `bound`.
    ///
    /// `None` if the search was stopped.
    pub(crate) fn value_at_most(&mut self, board: &Board<W, H>, bound: i32) -> Option<bool> {
        if let Some(value) = immediate_value(board) {
            return Some(value <= bound);
        }
        self.board = *board;
        let r = self.negamax(bound, bound + 1);
        if self.is_stopped() {
            return None;
        }
        Some(r <= bound)
    }

    /// Check if the value of `board` is at least `bound`.
    pub(crate) fn value_at_least(&mut self, board: &Board<W, H>, bound: i32) -> Option<bool> {
        self.value_at_most(board, bound - 1).map(|below| !below)
    }

    /// Negamax with alpha-beta pruning over the workspace board.
    ///
    /// The result `r` is exact inside `(alpha, beta)`; `r <= alpha` means the
    /// value is at most `r` and `r >= beta` means it is at least `r`. The side
    /// to move must not have an immediate win. Returns 0 once stopped; the
    /// caller has to check [`is_stopped`](Self::is_stopped) before trusting
    /// the result.
    fn negamax(&mut self, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        debug_assert!(!self.board.can_win_next());

        self.stats.nodes += 1;
        if self.stats.nodes & TIME_CHECK_MASK == 0 && self.check_time() {
            return 0;
        }

        let cells = Board::<W, H>::CELLS;
        let moves = self.board.moves();

        let next = self.board.possible_non_losing_moves();
        if next == 0 {
            // every move lets the opponent win with the next stone
            return -((cells - moves) as i32) / 2;
        }
        if moves + 2 >= cells {
            // no stone left that could make four
            return 0;
        }

        // we cannot win before our next stone and the opponent cannot win
        // before theirs after that
        let min = -((cells - 2 - moves) as i32) / 2;
        if alpha < min {
            alpha = min;
            if alpha >= beta {
                return alpha;
            }
        }
        let mut max = ((cells - 1 - moves) as i32) / 2;

        let key = self.board.key();
        self.stats.tt_probes += 1;
        if let Some(entry) = self.shared.tt.probe(key) {
            self.stats.tt_hits += 1;
            match entry.entry_type {
                EntryType::Exact => return entry.score,
                EntryType::LowerBound => {
                    if entry.score > alpha {
                        alpha = entry.score;
                        if alpha >= beta {
                            return alpha;
                        }
                    }
                }
                EntryType::UpperBound => {
                    if entry.score < max {
                        max = entry.score;
                    }
                }
            }
        }

        if beta > max {
            beta = max;
            if alpha >= beta {
                return beta;
            }
        }

        let start_alpha = alpha;
        let moves_sorted = sort_moves(&self.board, next);
        for (i, mv) in moves_sorted.enumerate() {
            self.board.play_bit(mv);
            let score = -self.negamax(-beta, -alpha);
            self.board.undo_bit(mv);

            if self.is_stopped() {
                return 0;
            }

            if score >= beta {
                self.stats.beta_cutoffs += 1;
                if i == 0 {
                    self.stats.first_move_cutoffs += 1;
                }
                self.shared.tt.store(key, score, EntryType::LowerBound);
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        let entry_type = if alpha > start_alpha {
            EntryType::Exact
        } else {
            EntryType::UpperBound
        };
        self.shared.tt.store(key, alpha, entry_type);
        alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    fn worker<const W: usize, const H: usize>() -> Worker<W, H> {
        let shared = Arc::new(SharedState::new(TranspositionTable::with_slots(1 << 16)));
        Worker::new(shared, None)
    }

    #[test]
    fn test_immediate_values() {
        // second player lost to a vertical four on ply 7
        let lost = Position::from_moves("1212121").unwrap();
        assert_eq!(immediate_value(&lost), Some(-(44 - 7) / 2));

        let can_win = Position::from_moves("121212").unwrap();
        assert_eq!(immediate_value(&can_win), Some((43 - 6) / 2));

        assert_eq!(immediate_value(&Position::new()), None);
    }

    #[test]
    fn test_null_window_tests_bracket_solved_score() {
        let pos = Board::<5, 4>::from_moves("3").unwrap();
        let mut w = worker::<5, 4>();
        let score = w.solve(&pos, false).unwrap();
        assert!((Board::<5, 4>::MIN_SCORE..=Board::<5, 4>::MAX_SCORE).contains(&score));
        assert_eq!(w.value_at_most(&pos, score), Some(true));
        assert_eq!(w.value_at_least(&pos, score), Some(true));
        assert_eq!(w.value_at_least(&pos, score + 1), Some(false));
        assert_eq!(w.value_at_most(&pos, score - 1), Some(false));
    }

    #[test]
    fn test_solve_double_threat_is_lost() {
        // second player faces two bottom-row threats
        let pos = Position::from_moves("33445").unwrap();
        let mut w = worker::<7, 6>();
        // first player wins with their 4th stone, ply 7
        assert_eq!(w.solve(&pos, false), Some(-(44 - 7) / 2));
        assert_eq!(w.solve(&pos, true), Some(-1));
    }

    #[test]
    fn test_workspace_restored() {
        let pos = Board::<4, 4>::from_moves("2233").unwrap();
        let mut w = worker::<4, 4>();
        assert!(w.value_at_most(&pos, 0).is_some());
        assert_eq!(w.board, pos);
    }

    #[test]
    fn test_stopped_worker_returns_none() {
        let mut w = worker::<7, 6>();
        w.shared.stop.stop();
        assert_eq!(w.solve(&Position::new(), false), None);
        assert_eq!(w.value_at_most(&Position::new(), 0), None);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = SearchStats {
            nodes: 10,
            tt_probes: 4,
            tt_hits: 1,
            beta_cutoffs: 2,
            first_move_cutoffs: 1,
        };
        let b = SearchStats {
            nodes: 5,
            tt_probes: 4,
            tt_hits: 3,
            beta_cutoffs: 2,
            first_move_cutoffs: 2,
        };
        a.merge(&b);
        assert_eq!(a.nodes, 15);
        assert_eq!(a.tt_hits, 4);
        assert_eq!(a.first_move_rate(), 75.0);
        assert_eq!(a.tt_hit_rate(), 50.0);
    }
}

//! Query interface of the solver
//!
//! [`Solver`] owns the transposition table (kept warm across queries) and an
//! optional shared opening book, and answers three kinds of query:
//!
//! 1. [`Solver::solve`]: exact score, outcome and a best move
//! 2. [`Solver::analyze`]: the score of every column, split across threads
//! 3. [`Solver::search_horizon`]: is there a forced result within N plies
//!
//! A solve goes through these steps:
//!
//! 1. **Terminal / immediate win**: answered without search
//! 2. **Opening book**: an exact hit skips the search
//! 3. **Null-window narrowing**: negamax probes until the score interval closes
//! 4. **Best move**: first column, in move-ordering priority, proven to reach
//!    the score
//!
//! # Example
//!
//! ```
//! use connect4::{Outcome, Position, Solver};
//!
//! let mut solver: Solver = Solver::new(8);
//! // first player has three stacked in column 1
//! let pos = Position::from_moves("121212").unwrap();
//!
//! let solution = solver.solve(&pos).into_solution().unwrap();
//! assert_eq!(solution.outcome, Outcome::Win);
//! assert_eq!(solution.best_move, Some(0));
//! assert_eq!(solution.plies_to_end, Some(1));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::board::Board;
use crate::book::OpeningBook;
use crate::error::SearchAborted;
use crate::search::alphabeta::{SharedState, Worker};
use crate::search::{ordered_moves, SearchStats, StopHandle, TTStats, TranspositionTable};

/// Transposition table size used by [`Solver::default`]
pub const DEFAULT_TT_SIZE_MB: usize = 64;

/// Game-theoretic result for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Outcome of a score: positive wins, zero draws, negative loses.
    pub fn from_score(score: i32) -> Self {
        match score.signum() {
            1 => Outcome::Win,
            0 => Outcome::Draw,
            _ => Outcome::Loss,
        }
    }
}

/// Result of a completed solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Exact score, or only its sign (-1, 0, 1) in weak mode
    pub score: i32,
    pub outcome: Outcome,
    /// Column (0-based) reaching `score`; `None` when the game is over
    pub best_move: Option<usize>,
    /// Plies until the deciding stone, or until the board is full for a
    /// draw; `None` in weak mode
    pub plies_to_end: Option<usize>,
    /// Nodes searched
    pub nodes: u64,
    /// The score came from the opening book
    pub from_book: bool,
}

/// Result of a solve query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Solved(Solution),
    /// Stopped by a [`StopHandle`] or the time budget
    Aborted,
}

impl SearchOutcome {
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, SearchOutcome::Aborted)
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            SearchOutcome::Aborted => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            SearchOutcome::Aborted => None,
        }
    }
}

/// Result of a depth-limited query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizonOutcome {
    /// The side to move forces a win with a stone at most `plies` from now
    Win { plies: usize },
    /// The opponent forces a win with a stone at most `plies` from now
    Loss { plies: usize },
    /// Nothing forced within the horizon
    Unresolved,
}

/// Plies from a position with `moves` stones to the end of the game when
/// both sides play to `score`.
pub fn plies_to_end<const W: usize, const H: usize>(score: i32, moves: usize) -> usize {
    let cells = Board::<W, H>::CELLS as i32;
    let moves_i = moves as i32;
    let last_ply = if score > 0 {
        // our stones land on plies moves+1, moves+3, ...
        let p = cells + 2 - 2 * score;
        if (p - moves_i) % 2 == 1 {
            p
        } else {
            p - 1
        }
    } else if score < 0 {
        let q = cells + 2 + 2 * score;
        if (q - moves_i) % 2 == 0 {
            q
        } else {
            q - 1
        }
    } else {
        cells
    };
    (last_ply - moves_i).max(0) as usize
}

/// Book score of `board`, reduced to its sign in weak mode.
fn book_value<const W: usize, const H: usize>(
    book: Option<&OpeningBook<W, H>>,
    weak: bool,
    board: &Board<W, H>,
) -> Option<i32> {
    let score = book?.get(board)?;
    Some(if weak { score.signum() } else { score })
}

/// Score of playing legal column `col`, from the mover's point of view.
///
/// `None` if the search was stopped.
fn column_value<const W: usize, const H: usize>(
    worker: &mut Worker<W, H>,
    book: Option<&OpeningBook<W, H>>,
    weak: bool,
    board: &Board<W, H>,
    col: usize,
) -> Option<i32> {
    if board.is_winning_move(col) {
        let score = (Board::<W, H>::CELLS as i32 + 1 - board.moves() as i32) / 2;
        return Some(if weak { score.signum() } else { score });
    }
    let mut child = *board;
    child.play_bit(board.column_move(col));
    let value = match book_value(book, weak, &child) {
        Some(value) => value,
        None => worker.solve(&child, weak)?,
    };
    Some(-value)
}

/// Connect-Four solver.
///
/// Generic over the board size; `Solver` alone is the standard 7x6 solver.
/// The table persists across queries, so related positions get faster.
/// For an unrelated batch of positions call [`clear_tt`](Self::clear_tt).
pub struct Solver<const W: usize = 7, const H: usize = 6> {
    shared: Arc<SharedState>,
    book: Option<Arc<OpeningBook<W, H>>>,
    weak: bool,
    threads: usize,
    time_budget: Option<Duration>,
    last_stats: SearchStats,
}

impl<const W: usize, const H: usize> Solver<W, H> {
    /// Create a single-threaded solver with a `tt_size_mb` megabyte table.
    #[must_use]
    pub fn new(tt_size_mb: usize) -> Self {
        Self::with_threads(tt_size_mb, 1)
    }

    /// Create a solver that analyzes root moves on `threads` threads.
    #[must_use]
    pub fn with_threads(tt_size_mb: usize, threads: usize) -> Self {
        Self {
            shared: Arc::new(SharedState::new(TranspositionTable::new(tt_size_mb))),
            book: None,
            weak: false,
            threads: threads.max(1),
            time_budget: None,
            last_stats: SearchStats::default(),
        }
    }

    /// Use `book` at the root of every query (or no book with `None`).
    pub fn set_book(&mut self, book: Option<Arc<OpeningBook<W, H>>>) {
        self.book = book;
    }

    pub fn book(&self) -> Option<&OpeningBook<W, H>> {
        self.book.as_deref()
    }

    /// Only compute win / draw / loss instead of the exact score.
    pub fn set_weak(&mut self, weak: bool) {
        self.weak = weak;
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Default budget for [`solve`](Self::solve), [`analyze`](Self::analyze)
    /// and [`search_horizon`](Self::search_horizon).
    pub fn set_time_budget(&mut self, budget: Option<Duration>) {
        self.time_budget = budget;
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    /// Handle that aborts the running query from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.shared.stop.clone()
    }

    /// Statistics of the most recent query
    pub fn last_stats(&self) -> &SearchStats {
        &self.last_stats
    }

    /// Get statistics about the transposition table.
    #[must_use]
    pub fn tt_stats(&self) -> TTStats {
        self.shared.tt.stats()
    }

    /// Clear the transposition table.
    pub fn clear_tt(&self) {
        self.shared.tt.clear();
    }

    /// Solve `board` within the configured time budget, if any.
    pub fn solve(&mut self, board: &Board<W, H>) -> SearchOutcome {
        self.run_solve(board, self.time_budget)
    }

    /// Solve `board`, giving up once `budget` has elapsed.
    pub fn solve_with_budget(&mut self, board: &Board<W, H>, budget: Duration) -> SearchOutcome {
        self.run_solve(board, Some(budget))
    }

    fn deadline(budget: Option<Duration>) -> Option<Instant> {
        budget.map(|budget| Instant::now() + budget)
    }

    /// Drop any stop left over from before this query.
    fn begin(&self) {
        self.shared.stop.reset();
    }

    fn finish(&mut self, stats: SearchStats) {
        self.last_stats = stats;
    }

    fn run_solve(&mut self, board: &Board<W, H>, budget: Option<Duration>) -> SearchOutcome {
        self.begin();
        let start = Instant::now();
        let mut worker = Worker::new(Arc::clone(&self.shared), Self::deadline(budget));
        let outcome = self.solve_with_worker(&mut worker, board);
        let stats = worker.stats.clone();

        match &outcome {
            SearchOutcome::Solved(solution) => debug!(
                "solved {} stones: score {} best {:?} nodes {} book {} in {:?}",
                board.moves(),
                solution.score,
                solution.best_move,
                solution.nodes,
                solution.from_book,
                start.elapsed()
            ),
            SearchOutcome::Aborted => warn!(
                "solve aborted after {} nodes in {:?}",
                stats.nodes,
                start.elapsed()
            ),
        }

        self.finish(stats);
        outcome
    }

    fn solve_with_worker(&self, worker: &mut Worker<W, H>, board: &Board<W, H>) -> SearchOutcome {
        let book = self.book.as_deref();
        let (score, from_book) = match book_value(book, self.weak, board) {
            Some(score) => (score, true),
            None => match worker.solve(board, self.weak) {
                Some(score) => (score, false),
                None => return SearchOutcome::Aborted,
            },
        };

        let best_move = match self.best_move(worker, board, score) {
            Some(best_move) => best_move,
            None => return SearchOutcome::Aborted,
        };

        SearchOutcome::Solved(Solution {
            score,
            outcome: Outcome::from_score(score),
            best_move,
            plies_to_end: if self.weak {
                None
            } else {
                Some(plies_to_end::<W, H>(score, board.moves()))
            },
            nodes: worker.stats.nodes,
            from_book,
        })
    }

    /// First column in ordering priority whose successor is worth at most
    /// `-score` to the opponent. Outer `None` if the search was stopped.
    fn best_move(
        &self,
        worker: &mut Worker<W, H>,
        board: &Board<W, H>,
        score: i32,
    ) -> Option<Option<usize>> {
        let order = ordered_moves(board);
        if order.is_empty() {
            return Some(None);
        }
        if board.can_win_next() {
            return Some(order.into_iter().find(|&col| board.is_winning_move(col)));
        }
        if self.weak && score < 0 {
            // every move loses
            return Some(order.first().copied());
        }

        let book = self.book.as_deref();
        let bound = -score;
        for &col in &order {
            let mut child = *board;
            child.play_bit(board.column_move(col));
            let reaches = match book_value(book, self.weak, &child) {
                Some(value) => value <= bound,
                None => worker.value_at_most(&child, bound)?,
            };
            if reaches {
                return Some(Some(col));
            }
        }
        Some(order.first().copied())
    }

    /// Score of every column from the side to move's point of view.
    ///
    /// `None` for columns that cannot be played. Root moves are spread over
    /// [`threads`](Self::threads) workers sharing the table.
    pub fn analyze(&mut self, board: &Board<W, H>) -> Result<Vec<Option<i32>>, SearchAborted> {
        self.begin();
        let start = Instant::now();
        let deadline = Self::deadline(self.time_budget);
        let columns: Vec<usize> = (0..W).filter(|&col| board.is_legal(col)).collect();
        let threads = self.threads.min(columns.len()).max(1);

        let mut stats = SearchStats::default();
        let mut values: Vec<(usize, i32)> = Vec::with_capacity(columns.len());

        if threads == 1 {
            let mut worker = Worker::new(Arc::clone(&self.shared), deadline);
            for &col in &columns {
                match column_value(&mut worker, self.book.as_deref(), self.weak, board, col) {
                    Some(value) => values.push((col, value)),
                    None => break,
                }
            }
            stats.merge(&worker.stats);
        } else {
            let columns = Arc::new(columns.clone());
            let next = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let shared = Arc::clone(&self.shared);
                    let book = self.book.clone();
                    let columns = Arc::clone(&columns);
                    let next = Arc::clone(&next);
                    let weak = self.weak;
                    let board = *board;

                    std::thread::spawn(move || {
                        let mut worker = Worker::new(shared, deadline);
                        let mut found = Vec::new();
                        loop {
                            let idx = next.fetch_add(1, Ordering::Relaxed);
                            let Some(&col) = columns.get(idx) else {
                                break;
                            };
                            match column_value(&mut worker, book.as_deref(), weak, &board, col) {
                                Some(value) => found.push((col, value)),
                                None => break,
                            }
                        }
                        (found, worker.stats)
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok((found, worker_stats)) => {
                        values.extend(found);
                        stats.merge(&worker_stats);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        }

        let aborted = self.shared.stop.is_stopped();
        debug!(
            "analyzed {} columns on {threads} threads: {} nodes in {:?}",
            columns.len(),
            stats.nodes,
            start.elapsed()
        );
        self.finish(stats);
        if aborted {
            warn!("analysis aborted after {:?}", start.elapsed());
            return Err(SearchAborted);
        }

        let mut scores = vec![None; W];
        for (col, value) in values {
            scores[col] = Some(value);
        }
        Ok(scores)
    }

    /// Look for a forced result at most `max_plies` plies ahead.
    ///
    /// Iterative deepening over the horizon `d = 1..=max_plies`: odd `d` asks
    /// whether the side to move wins with a stone within `d` plies, even `d`
    /// whether it loses to one. Each test is a single null-window search, and
    /// the first proven result is returned, so the reported distance is the
    /// shortest forced one.
    pub fn search_horizon(
        &mut self,
        board: &Board<W, H>,
        max_plies: usize,
    ) -> Result<HorizonOutcome, SearchAborted> {
        self.begin();
        let start = Instant::now();
        let mut worker = Worker::new(Arc::clone(&self.shared), Self::deadline(self.time_budget));
        let result = Self::horizon_with_worker(&mut worker, board, max_plies);
        debug!(
            "horizon {max_plies}: {result:?} after {} nodes in {:?}",
            worker.stats.nodes,
            start.elapsed()
        );
        self.finish(worker.stats);
        result
    }

    fn horizon_with_worker(
        worker: &mut Worker<W, H>,
        board: &Board<W, H>,
        max_plies: usize,
    ) -> Result<HorizonOutcome, SearchAborted> {
        if board.is_won() {
            return Ok(HorizonOutcome::Loss { plies: 0 });
        }
        if board.can_win_next() && max_plies >= 1 {
            return Ok(HorizonOutcome::Win { plies: 1 });
        }
        if board.can_win_next() || board.moves() == Board::<W, H>::CELLS {
            return Ok(HorizonOutcome::Unresolved);
        }

        let cells = Board::<W, H>::CELLS;
        let moves = board.moves();
        for depth in 1..=max_plies.min(cells - moves) {
            // score of a result decided by the stone of ply moves + depth
            let threshold = ((cells + 2 - moves - depth) / 2) as i32;
            if depth % 2 == 1 {
                if worker.value_at_least(board, threshold).ok_or(SearchAborted)? {
                    return Ok(HorizonOutcome::Win { plies: depth });
                }
            } else if worker.value_at_most(board, -threshold).ok_or(SearchAborted)? {
                return Ok(HorizonOutcome::Loss { plies: depth });
            }
        }
        Ok(HorizonOutcome::Unresolved)
    }
}

impl<const W: usize, const H: usize> Default for Solver<W, H> {
    fn default() -> Self {
        Self::new(DEFAULT_TT_SIZE_MB)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::board::Position;

    const FULL_DRAW_7X6: &str = "544344544335353325562262622167111117777676";

    /// Plain memoised minimax over the whole game tree.
    fn reference<const W: usize, const H: usize>(
        board: &Board<W, H>,
        memo: &mut HashMap<u64, i32>,
    ) -> i32 {
        let cells = Board::<W, H>::CELLS as i32;
        if board.is_won() {
            return -(cells + 2 - board.moves() as i32) / 2;
        }
        if board.moves() == Board::<W, H>::CELLS {
            return 0;
        }
        if let Some(&score) = memo.get(&board.key()) {
            return score;
        }
        let best = (0..W)
            .filter_map(|col| board.play(col).ok())
            .map(|child| -reference(&child, memo))
            .max()
            .unwrap();
        memo.insert(board.key(), best);
        best
    }

    fn solved<const W: usize, const H: usize>(
        solver: &mut Solver<W, H>,
        board: &Board<W, H>,
    ) -> Solution {
        solver.solve(board).into_solution().expect("query aborted")
    }

    /// Every position reachable with at most `depth` stones.
    fn positions_up_to<const W: usize, const H: usize>(depth: usize) -> Vec<Board<W, H>> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![Board::<W, H>::new()];
        let mut out = Vec::new();
        while let Some(pos) = stack.pop() {
            if !seen.insert(pos.key()) {
                continue;
            }
            out.push(pos);
            if pos.moves() < depth {
                stack.extend((0..W).filter_map(|col| pos.play(col).ok()));
            }
        }
        out
    }

    #[test]
    fn test_outcome_from_score() {
        assert_eq!(Outcome::from_score(3), Outcome::Win);
        assert_eq!(Outcome::from_score(0), Outcome::Draw);
        assert_eq!(Outcome::from_score(-1), Outcome::Loss);
    }

    #[test]
    fn test_plies_to_end() {
        // immediate win with ply 7
        assert_eq!(plies_to_end::<7, 6>((43 - 6) / 2, 6), 1);
        // already lost to ply 7
        assert_eq!(plies_to_end::<7, 6>(-(44 - 7) / 2, 7), 0);
        // lost to the opponent's next stone
        assert_eq!(plies_to_end::<7, 6>(-(42 - 5) / 2, 5), 2);
        // first player wins with the 41st stone
        assert_eq!(plies_to_end::<7, 6>(1, 0), 41);
        assert_eq!(plies_to_end::<7, 6>(0, 10), 32);
    }

    #[test]
    fn test_matches_reference_4x4() {
        let mut solver = Solver::<4, 4>::new(4);
        let mut memo = HashMap::new();
        for pos in positions_up_to::<4, 4>(16) {
            let expected = reference(&pos, &mut memo);
            let solution = solved(&mut solver, &pos);
            assert_eq!(solution.score, expected, "{pos:?}");
            assert_eq!(solution.outcome, Outcome::from_score(expected));

            // the best move really reaches the score
            if let Some(col) = solution.best_move {
                let child = pos.play(col).unwrap();
                assert_eq!(-reference(&child, &mut memo), expected, "{pos:?} col {col}");
            } else {
                assert!(pos.is_won() || pos.moves() == 16);
            }
        }
    }

    #[test]
    fn test_matches_reference_5x4_openings() {
        let mut solver = Solver::<5, 4>::new(8);
        let mut memo = HashMap::new();
        for seq in ["33", "31", "313", "2244", "1234", "3333"] {
            let pos = Board::<5, 4>::from_moves(seq).unwrap();
            let expected = reference(&pos, &mut memo);
            let solution = solved(&mut solver, &pos);
            assert_eq!(solution.score, expected, "{seq}");
            let col = solution.best_move.unwrap();
            let child = pos.play(col).unwrap();
            assert_eq!(-reference(&child, &mut memo), expected, "{seq} col {col}");
        }
    }

    #[test]
    fn test_weak_matches_reference_sign() {
        let mut solver = Solver::<4, 4>::new(4);
        solver.set_weak(true);
        let mut memo = HashMap::new();
        for pos in positions_up_to::<4, 4>(6) {
            let expected = reference(&pos, &mut memo).signum();
            let solution = solved(&mut solver, &pos);
            assert_eq!(solution.score, expected, "{pos:?}");
            assert_eq!(solution.plies_to_end, None);
            if expected >= 0 {
                let child = pos.play(solution.best_move.unwrap()).unwrap();
                assert_eq!(-reference(&child, &mut memo).signum(), expected);
            }
        }
    }

    #[test]
    fn test_mirror_symmetry() {
        // separate tables so neither side reuses the other's results
        let mut left = Solver::<4, 4>::new(2);
        let mut right = Solver::<4, 4>::new(2);
        for pos in positions_up_to::<4, 4>(10) {
            let a = solved(&mut left, &pos);
            let b = solved(&mut right, &pos.mirror());
            assert_eq!(a.score, b.score, "{pos:?}");
            assert_eq!(a.plies_to_end, b.plies_to_end, "{pos:?}");
            assert_eq!(a.best_move.is_some(), b.best_move.is_some());
        }
    }

    #[test]
    fn test_mirror_symmetry_5x4() {
        let mut solver = Solver::<5, 4>::new(8);
        for seq in ["1", "12", "154", "2213", "11225"] {
            let pos = Board::<5, 4>::from_moves(seq).unwrap();
            let a = solved(&mut solver, &pos);
            let b = solved(&mut solver, &pos.mirror());
            assert_eq!(a.score, b.score, "{seq}");
            assert_eq!(a.plies_to_end, b.plies_to_end);
        }
    }

    #[test]
    fn test_idempotent_on_warm_table() {
        let mut solver = Solver::<5, 4>::new(8);
        let pos = Board::<5, 4>::from_moves("32").unwrap();
        let first = solved(&mut solver, &pos);
        let second = solved(&mut solver, &pos);
        assert_eq!(first.score, second.score);
        assert_eq!(first.best_move, second.best_move);
    }

    #[test]
    fn test_full_board_is_draw() {
        let mut solver: Solver = Solver::new(1);
        let pos = Position::from_moves(FULL_DRAW_7X6).unwrap();
        let solution = solved(&mut solver, &pos);
        assert_eq!(solution.score, 0);
        assert_eq!(solution.outcome, Outcome::Draw);
        assert_eq!(solution.best_move, None);
        assert_eq!(solution.plies_to_end, Some(0));
    }

    #[test]
    fn test_won_position_is_lost_for_side_to_move() {
        let mut solver: Solver = Solver::new(1);
        let pos = Position::from_moves("1212121").unwrap();
        let solution = solved(&mut solver, &pos);
        assert_eq!(solution.outcome, Outcome::Loss);
        assert_eq!(solution.best_move, None);
        assert_eq!(solution.plies_to_end, Some(0));
    }

    #[test]
    fn test_one_move_wins() {
        let mut solver: Solver = Solver::new(8);
        // vertical, horizontal, diagonal '/', diagonal '\'
        for (seq, col) in [
            ("121212", 0),
            ("172737", 3),
            ("1223733444", 3),
            ("7665155444", 3),
        ] {
            let pos = Position::from_moves(seq).unwrap();
            let solution = solved(&mut solver, &pos);
            assert_eq!(solution.best_move, Some(col), "{seq}");
            assert_eq!(solution.score, (43 - seq.len() as i32) / 2, "{seq}");
            assert_eq!(solution.plies_to_end, Some(1));
            assert_eq!(solution.nodes, 0);
        }
    }

    #[test]
    fn test_double_threat_is_lost() {
        let mut solver: Solver = Solver::new(8);
        let pos = Position::from_moves("33445").unwrap();
        let solution = solved(&mut solver, &pos);
        assert_eq!(solution.outcome, Outcome::Loss);
        assert_eq!(solution.score, -(42 - 5) / 2);
        assert_eq!(solution.plies_to_end, Some(2));
        assert!(solution.best_move.is_some());
    }

    #[test]
    fn test_budget_abort_leaves_table_usable() {
        let mut solver: Solver = Solver::new(16);
        let outcome = solver.solve_with_budget(&Position::new(), Duration::from_millis(1));
        assert!(outcome.is_aborted());
        assert!(outcome.solution().is_none());

        let pos = Position::from_moves("33445").unwrap();
        let solution = solved(&mut solver, &pos);
        assert_eq!(solution.score, -(42 - 5) / 2);
    }

    #[test]
    fn test_stop_between_queries_is_ignored() {
        let mut solver = Solver::<4, 4>::new(4);
        let mut memo = HashMap::new();

        let first = Board::<4, 4>::from_moves("12").unwrap();
        assert_eq!(solved(&mut solver, &first).score, reference(&first, &mut memo));

        // nothing is running, so the next query starts clean
        solver.stop_handle().stop();
        let next = Board::<4, 4>::from_moves("1").unwrap();
        assert_eq!(solved(&mut solver, &next).score, reference(&next, &mut memo));

        solver.stop_handle().stop();
        assert!(solver.analyze(&next).is_ok());
        solver.stop_handle().stop();
        assert!(solver.search_horizon(&next, 3).is_ok());
    }

    #[test]
    fn test_stop_handle_aborts_running_query() {
        let mut solver: Solver = Solver::new(16);
        // upper bound in case the stop lands before the query starts
        solver.set_time_budget(Some(Duration::from_secs(5)));
        let handle = solver.stop_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.stop();
        });
        assert!(solver.solve(&Position::new()).is_aborted());
        stopper.join().unwrap();

        // the table is still usable
        let pos = Position::from_moves("33445").unwrap();
        assert_eq!(solved(&mut solver, &pos).score, -(42 - 5) / 2);
    }

    #[test]
    fn test_analyze_matches_reference() {
        let mut memo = HashMap::new();
        for threads in [1, 3] {
            let mut solver = Solver::<4, 4>::with_threads(4, threads);
            for seq in ["", "2", "1122", "22223"] {
                let pos = Board::<4, 4>::from_moves(seq).unwrap();
                let scores = solver.analyze(&pos).unwrap();
                assert_eq!(scores.len(), 4);
                for (col, score) in scores.into_iter().enumerate() {
                    let expected = pos.play(col).ok().map(|child| -reference(&child, &mut memo));
                    assert_eq!(score, expected, "{seq} col {col} threads {threads}");
                }
            }
            assert!(solver.last_stats().nodes > 0);
        }
    }

    #[test]
    fn test_analyze_aborted() {
        let mut solver: Solver = Solver::with_threads(8, 2);
        solver.set_time_budget(Some(Duration::from_millis(1)));
        assert_eq!(solver.analyze(&Position::new()), Err(SearchAborted));
    }

    #[test]
    fn test_search_horizon() {
        let mut solver: Solver = Solver::new(16);

        let win_now = Position::from_moves("121212").unwrap();
        assert_eq!(
            solver.search_horizon(&win_now, 5),
            Ok(HorizonOutcome::Win { plies: 1 })
        );

        // the next stone makes an open three on the bottom row
        let win_in_three = Position::from_moves("4455").unwrap();
        assert_eq!(
            solver.search_horizon(&win_in_three, 5),
            Ok(HorizonOutcome::Win { plies: 3 })
        );
        assert_eq!(
            solver.search_horizon(&win_in_three, 2),
            Ok(HorizonOutcome::Unresolved)
        );

        let lost = Position::from_moves("33445").unwrap();
        assert_eq!(
            solver.search_horizon(&lost, 4),
            Ok(HorizonOutcome::Loss { plies: 2 })
        );

        assert_eq!(
            solver.search_horizon(&Position::new(), 4),
            Ok(HorizonOutcome::Unresolved)
        );
    }

    #[test]
    fn test_book_hit_skips_search() {
        let mut solver = Solver::<4, 4>::new(4);
        let book = OpeningBook::generate(2, &mut solver).unwrap();
        assert_eq!(book.len(), 11);

        let mut memo = HashMap::new();
        let mut fresh = Solver::<4, 4>::new(4);
        fresh.set_book(Some(Arc::new(book)));

        let empty = Board::<4, 4>::new();
        let solution = solved(&mut fresh, &empty);
        assert!(solution.from_book);
        assert_eq!(solution.score, reference(&empty, &mut memo));
        // children are in the book too
        assert_eq!(solution.nodes, 0);

        let deep = Board::<4, 4>::from_moves("123").unwrap();
        let solution = solved(&mut fresh, &deep);
        assert!(!solution.from_book);
        assert_eq!(solution.score, reference(&deep, &mut memo));
    }

    #[test]
    fn test_tt_stats_after_search() {
        let mut solver = Solver::<5, 4>::new(1);
        solved(&mut solver, &Board::<5, 4>::new());
        assert!(solver.tt_stats().used > 0);
        solver.clear_tt();
        assert_eq!(solver.tt_stats().used, 0);
    }

    #[test]
    #[ignore = "solves the full 7x6 board; run with --release -- --ignored"]
    fn test_empty_board_first_player_wins() {
        let mut solver: Solver = Solver::new(256);
        let solution = solved(&mut solver, &Position::new());
        assert_eq!(solution.score, 1);
        assert_eq!(solution.best_move, Some(3));
        assert_eq!(solution.plies_to_end, Some(41));
    }
}

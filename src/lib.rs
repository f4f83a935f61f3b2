//! Connect-Four solver
//!
//! A perfect-play solver for Connect Four on any board of up to 64 cells
//! including the sentinel row (7x6 by default):
//! - Bitboard positions with pure-mask win detection
//! - Score-bounded negamax with alpha-beta pruning
//! - Null-window narrowing of the score interval at the root
//! - Lock-free transposition table shared across threads
//! - Optional precomputed opening book
//!
//! # Architecture
//!
//! - [`board`]: Position representation with bitboards
//! - [`search`]: Transposition table, move ordering, negamax
//! - [`book`]: Opening book file format and generation
//! - [`engine`]: The [`Solver`] query interface
//! - [`config`]: TOML settings for building a solver
//!
//! # Quick Start
//!
//! ```
//! use connect4::{Outcome, Position, Solver};
//!
//! // small table keeps the doc test fast
//! let mut solver: Solver = Solver::new(16);
//!
//! // second player faces two threats on the bottom row
//! let pos: Position = "33445".parse().unwrap();
//!
//! let solution = solver.solve(&pos).into_solution().unwrap();
//! assert_eq!(solution.outcome, Outcome::Loss);
//! assert_eq!(solution.plies_to_end, Some(2));
//! ```
//!
//! # Scores
//!
//! Scores are from the side to move's point of view. Winning with the
//! stone of ply `p` scores `(CELLS + 2 - p) / 2`, losing to the opponent's
//! stone of ply `q` scores `-(CELLS + 2 - q) / 2`, and a draw scores 0.
//! The empty 7x6 board scores +1.

pub mod board;
pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod search;

// Re-export commonly used types for convenience
pub use board::{Board, Player, Position, HEIGHT, WIDTH};
pub use book::OpeningBook;
pub use config::SolverConfig;
pub use engine::{HorizonOutcome, Outcome, SearchOutcome, Solution, Solver};
pub use error::{BookLoadError, ConfigError, IllegalMoveError, PositionParseError, SearchAborted};
pub use search::{ordered_moves, SearchStats, StopHandle};

//! Search module for the solver
//!
//! Contains:
//! - Transposition table shared by every search thread
//! - Move ordering (center-out, refined by threats created)
//! - Score-bounded negamax and the null-window narrowing driver

pub mod alphabeta;
pub mod ordering;
pub mod tt;

pub use alphabeta::{SearchStats, StopHandle};
pub use ordering::{column_order, ordered_moves, MoveSorter};
pub use tt::{EntryType, TTEntry, TTStats, TranspositionTable};

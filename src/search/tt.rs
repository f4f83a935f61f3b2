//! Transposition table for caching search results
//!
//! The table stores bounded scores indexed by [`Board::key`](crate::Board::key),
//! so positions reached through different move orders share one entry.
//!
//! # Example
//!
//! ```
//! use connect4::search::{EntryType, TranspositionTable};
//!
//! let tt = TranspositionTable::new(1); // 1 MB
//!
//! tt.store(0x1234, 3, EntryType::LowerBound);
//!
//! if let Some(entry) = tt.probe(0x1234) {
//!     assert_eq!(entry.score, 3);
//!     assert_eq!(entry.entry_type, EntryType::LowerBound);
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes per slot: two `AtomicU64`.
const SLOT_SIZE: usize = 16;

/// How a stored score relates to the true value of the position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Exact score - the search completed inside its window
    Exact,
    /// Lower bound - true score >= stored value (beta cutoff)
    LowerBound,
    /// Upper bound - true score <= stored value (alpha fail-low)
    UpperBound,
}

/// A usable entry returned by [`TranspositionTable::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub score: i32,
    pub entry_type: EntryType,
}

/// Approximate table occupancy
#[derive(Debug, Clone, Copy)]
pub struct TTStats {
    /// Total slots
    pub size: usize,
    /// Occupied slots (sampled estimate on large tables)
    pub used: usize,
    /// Usage percentage
    pub usage_percent: u8,
}

/// Pack score and bound into a u64.
///
/// Layout:
/// ```text
/// bits [0..7]  score (i8 -> u8: +128 offset)
/// bits [8..9]  entry_type (1=Exact, 2=LB, 3=UB)
/// ```
/// The type code is never 0, so a packed entry is never 0 and an all-zero
/// slot is always empty, even for key 0 (the empty board).
fn pack_entry(score: i32, entry_type: EntryType) -> u64 {
    debug_assert!((i8::MIN as i32..=i8::MAX as i32).contains(&score));
    let s = (score as i8 as u8) as u64;
    let t = match entry_type {
        EntryType::Exact => 1u64,
        EntryType::LowerBound => 2u64,
        EntryType::UpperBound => 3u64,
    };
    s | (t << 8)
}

fn unpack_entry(data: u64) -> TTEntry {
    let score = (data & 0xFF) as u8 as i8 as i32;
    let entry_type = match (data >> 8) & 0x3 {
        1 => EntryType::Exact,
        2 => EntryType::LowerBound,
        _ => EntryType::UpperBound,
    };
    TTEntry { score, entry_type }
}

/// Smallest prime >= `n` (and >= 2).
fn next_prime(n: usize) -> usize {
    fn is_prime(n: usize) -> bool {
        if n < 2 {
            return false;
        }
        let mut d = 2;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 1;
        }
        true
    }
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Lock-free, direct-mapped transposition table.
///
/// Uses the XOR trick (Hyatt 1994): each slot stores `(key ^ data, data)`.
/// On probe, validity is checked via `stored ^ data == key`. Torn reads
/// (partial writes from concurrent threads) fail that check and are treated
/// as misses, so one table can be shared by every search thread through an
/// `Arc` with all methods taking `&self`.
///
/// Replacement is unconditional: a store always overwrites its slot. Solver
/// keys are exact position encodings and the slot count is prime, so entries
/// for nearby positions spread well and the newest result is usually the most
/// useful one.
pub struct TranspositionTable {
    keys: Vec<AtomicU64>,
    data: Vec<AtomicU64>,
    size: usize,
}

impl TranspositionTable {
    /// Create a table using about `size_mb` megabytes.
    ///
    /// The slot count is the smallest prime >= `size_mb MiB / 16 bytes`.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        Self::with_slots((size_mb * 1024 * 1024) / SLOT_SIZE)
    }

    /// Create a table with at least `slots` slots (rounded up to a prime).
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        let size = next_prime(slots);
        let keys = (0..size).map(|_| AtomicU64::new(0)).collect();
        let data = (0..size).map(|_| AtomicU64::new(0)).collect();
        Self { keys, data, size }
    }

    /// Number of slots
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key % self.size as u64) as usize
    }

    /// Look up a position. A different position in the slot is a miss.
    #[must_use]
    #[inline]
    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        let idx = self.index(key);
        let stored = self.keys[idx].load(Ordering::Relaxed);
        let raw_data = self.data[idx].load(Ordering::Relaxed);

        if raw_data == 0 || stored ^ raw_data != key {
            return None;
        }
        Some(unpack_entry(raw_data))
    }

    /// Store a result, overwriting whatever the slot held.
    #[inline]
    pub fn store(&self, key: u64, score: i32, entry_type: EntryType) {
        let idx = self.index(key);
        let packed = pack_entry(score, entry_type);
        // data first, then key: a reader racing this write sees a mismatch
        self.data[idx].store(packed, Ordering::Relaxed);
        self.keys[idx].store(key ^ packed, Ordering::Relaxed);
    }

    /// Clear all entries.
    pub fn clear(&self) {
        for i in 0..self.size {
            self.keys[i].store(0, Ordering::Relaxed);
            self.data[i].store(0, Ordering::Relaxed);
        }
    }

    /// Get statistics about table usage.
    ///
    /// Approximate under concurrent access.
    #[must_use]
    pub fn stats(&self) -> TTStats {
        // sample every 64th slot on big tables
        let step = if self.size > 65536 { 64 } else { 1 };
        let mut used = 0usize;
        let mut sampled = 0usize;
        let mut i = 0;
        while i < self.size {
            sampled += 1;
            if self.data[i].load(Ordering::Relaxed) != 0 {
                used += 1;
            }
            i += step;
        }
        let estimated_used = if step > 1 {
            used * self.size / sampled
        } else {
            used
        };
        TTStats {
            size: self.size,
            used: estimated_used,
            usage_percent: (estimated_used as f64 / self.size as f64 * 100.0) as u8,
        }
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("size", &self.size)
            .finish()
    }
}

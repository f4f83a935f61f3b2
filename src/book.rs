//! Precomputed opening book
//!
//! The book maps [`Board::mirror_key`] to the exact score of every
//! undecided position up to a fixed number of stones. It is only consulted
//! at the root of a query.
//!
//! File layout (all integers little-endian):
//!
//! ```text
//! magic    4 bytes  "C4BK"
//! version  u8       1
//! width    u8
//! height   u8
//! depth    u8       deepest stone count stored
//! count    u32
//! records  count x (key: u64, score: i8), strictly ascending by key
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{info, warn};

use crate::board::Board;
use crate::engine::{SearchOutcome, Solver};
use crate::error::{BookLoadError, SearchAborted};

const MAGIC: &[u8; 4] = b"C4BK";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 12;
const RECORD_LEN: usize = 9;

/// Read-only table of exact scores for shallow positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningBook<const W: usize = 7, const H: usize = 6> {
    depth: usize,
    entries: Vec<(u64, i8)>,
}

impl<const W: usize, const H: usize> OpeningBook<W, H> {
    /// A book that never hits.
    pub fn empty() -> Self {
        Self {
            depth: 0,
            entries: Vec::new(),
        }
    }

    /// Build a book from `(mirror_key, score)` pairs. Later duplicates win.
    pub fn from_entries(depth: usize, entries: impl IntoIterator<Item = (u64, i8)>) -> Self {
        let mut entries: Vec<(u64, i8)> = entries.into_iter().collect();
        // stable sort keeps insertion order among equal keys
        entries.sort_by_key(|&(key, _)| key);
        entries.reverse();
        entries.dedup_by_key(|&mut (key, _)| key);
        entries.reverse();
        Self { depth, entries }
    }

    /// Deepest stone count covered
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of stored positions
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact score of `board`, if stored.
    ///
    /// Positions with more stones than the book depth always miss.
    pub fn get(&self, board: &Board<W, H>) -> Option<i32> {
        if board.moves() > self.depth {
            return None;
        }
        let key = board.mirror_key();
        self.entries
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|idx| self.entries[idx].1 as i32)
    }

    /// Load a book file.
    pub fn load(path: &Path) -> Result<Self, BookLoadError> {
        let file = File::open(path)?;
        let book = Self::read_from(BufReader::new(file))?;
        info!(
            "loaded opening book {}: {} positions, depth {}",
            path.display(),
            book.len(),
            book.depth
        );
        Ok(book)
    }

    /// Load a book file, logging and swallowing any failure.
    pub fn load_or_warn(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(book) => Some(book),
            Err(e) => {
                warn!("opening book {} not used: {e}", path.display());
                None
            }
        }
    }

    /// Parse a book from any reader.
    pub fn read_from(mut reader: impl Read) -> Result<Self, BookLoadError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(BookLoadError::BadMagic);
        }
        if bytes.len() < HEADER_LEN {
            return Err(BookLoadError::TruncatedHeader {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        let version = bytes[4];
        if version != VERSION {
            return Err(BookLoadError::UnsupportedVersion(version));
        }
        let (width, height) = (bytes[5] as usize, bytes[6] as usize);
        if width != W || height != H {
            return Err(BookLoadError::DimensionMismatch {
                width: W,
                height: H,
                found_width: width,
                found_height: height,
            });
        }
        let depth = bytes[7];
        if depth as usize > W * H {
            return Err(BookLoadError::BadDepth(depth));
        }
        let count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

        let body = &bytes[HEADER_LEN..];
        let found = body.len() / RECORD_LEN;
        if found < count {
            return Err(BookLoadError::Truncated {
                expected: count,
                found,
            });
        }
        let extra = body.len() - count * RECORD_LEN;
        if extra > 0 {
            return Err(BookLoadError::TrailingBytes(extra));
        }

        let score_limit = ((W * H + 1) / 2) as i32;
        let mut entries = Vec::with_capacity(count);
        for (index, record) in body.chunks_exact(RECORD_LEN).enumerate() {
            let mut key_bytes = [0u8; 8];
            key_bytes.copy_from_slice(&record[..8]);
            let key = u64::from_le_bytes(key_bytes);
            let score = record[8] as i8;

            if let Some(&(prev, _)) = entries.last() {
                if key <= prev {
                    return Err(BookLoadError::UnsortedKeys(index));
                }
            }
            if (score as i32).abs() > score_limit {
                return Err(BookLoadError::ScoreOutOfRange { index, score });
            }
            entries.push((key, score));
        }

        Ok(Self {
            depth: depth as usize,
            entries,
        })
    }

    /// Serialise to any writer.
    pub fn write_to(&self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION, W as u8, H as u8, self.depth as u8])?;
        writer.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for &(key, score) in &self.entries {
            writer.write_all(&key.to_le_bytes())?;
            writer.write_all(&[score as u8])?;
        }
        writer.flush()
    }

    /// Write the book to `path`.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Solve every distinct undecided position with at most `depth` stones.
    ///
    /// Mirror images are stored once. Positions that are already won or that
    /// the side to move wins immediately are left out, the solver answers
    /// those without searching.
    pub fn generate(depth: usize, solver: &mut Solver<W, H>) -> Result<Self, SearchAborted> {
        let depth = depth.min(W * H);
        let weak = solver.is_weak();
        solver.set_weak(false);
        let result = Self::collect(depth, solver);
        solver.set_weak(weak);

        let entries = result?;
        info!("generated opening book: {} positions, depth {depth}", entries.len());
        Ok(Self::from_entries(depth, entries))
    }

    fn collect(depth: usize, solver: &mut Solver<W, H>) -> Result<Vec<(u64, i8)>, SearchAborted> {
        let mut seen = HashSet::new();
        let mut stack = vec![Board::<W, H>::new()];
        let mut entries = Vec::new();
        seen.insert(Board::<W, H>::new().mirror_key());

        while let Some(pos) = stack.pop() {
            if pos.is_won() {
                continue;
            }
            if !pos.can_win_next() && pos.moves() < W * H {
                match solver.solve(&pos) {
                    SearchOutcome::Solved(solution) => {
                        entries.push((pos.mirror_key(), solution.score as i8));
                    }
                    SearchOutcome::Aborted => return Err(SearchAborted),
                }
            }
            if pos.moves() < depth {
                for col in 0..W {
                    if let Ok(next) = pos.play(col) {
                        if seen.insert(next.mirror_key()) {
                            stack.push(next);
                        }
                    }
                }
            }
        }
        Ok(entries)
    }
}

impl<const W: usize, const H: usize> Default for OpeningBook<W, H> {
    fn default() -> Self {
        Self::empty()
    }
}

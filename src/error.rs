use std::path::PathBuf;

/// A move that cannot be played on the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMoveError {
    #[error("column {0} is outside the board")]
    InvalidColumn(usize),

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("the game is already decided")]
    GameOver,
}

/// Errors from parsing a move sequence such as `"4453"`.
///
/// `index` is the 0-based position of the offending character.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionParseError {
    #[error("invalid character {ch:?} at index {index}")]
    InvalidCharacter { index: usize, ch: char },

    #[error("illegal move at index {index}: {source}")]
    IllegalMove {
        index: usize,
        source: IllegalMoveError,
    },
}

/// Errors that can occur when loading an opening book.
#[derive(Debug, thiserror::Error)]
pub enum BookLoadError {
    #[error("I/O error reading book: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an opening book (bad magic bytes)")]
    BadMagic,

    #[error("unsupported book version {0}")]
    UnsupportedVersion(u8),

    #[error("book is for a {found_width}x{found_height} board, expected {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("book depth {0} exceeds the number of cells")]
    BadDepth(u8),

    #[error("book header truncated: expected {expected} bytes, found {found}")]
    TruncatedHeader { expected: usize, found: usize },

    #[error("book truncated: expected {expected} records, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    #[error("record {0} is not strictly ascending")]
    UnsortedKeys(usize),

    #[error("record {index} has out-of-range score {score}")]
    ScoreOutOfRange { index: usize, score: i8 },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// The query was stopped before it produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("search aborted")]
pub struct SearchAborted;

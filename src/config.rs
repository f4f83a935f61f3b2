use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::book::OpeningBook;
use crate::engine::{Solver, DEFAULT_TT_SIZE_MB};
use crate::error::ConfigError;

/// Largest accepted table, in megabytes
const MAX_TT_SIZE_MB: usize = 64 * 1024;

/// Solver settings, loadable from TOML.
///
/// Every field is optional in the file; missing ones take their default.
///
/// ```toml
/// tt_size_mb = 256
/// threads = 4
/// weak = false
/// time_budget_ms = 10000
/// book_path = "7x6.book"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Transposition table size in megabytes
    pub tt_size_mb: usize,
    /// Worker threads for per-column analysis
    pub threads: usize,
    /// Only compute win / draw / loss
    pub weak: bool,
    /// Per-query time budget; no limit when absent
    pub time_budget_ms: Option<u64>,
    /// Opening book to load at startup
    pub book_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tt_size_mb: DEFAULT_TT_SIZE_MB,
            threads: 1,
            weak: false,
            time_budget_ms: None,
            book_path: None,
        }
    }
}

impl SolverConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: SolverConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tt_size_mb == 0 {
            return Err(ConfigError::Validation("tt_size_mb must be > 0".into()));
        }
        if self.tt_size_mb > MAX_TT_SIZE_MB {
            return Err(ConfigError::Validation(format!(
                "tt_size_mb must be <= {MAX_TT_SIZE_MB}"
            )));
        }
        if self.threads == 0 {
            return Err(ConfigError::Validation("threads must be >= 1".into()));
        }
        if self.time_budget_ms == Some(0) {
            return Err(ConfigError::Validation(
                "time_budget_ms must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// Time budget as a `Duration`
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&SolverConfig::default())
    }

    /// Build a solver from these settings.
    ///
    /// A book that fails to load is logged and skipped.
    pub fn build_solver<const W: usize, const H: usize>(&self) -> Solver<W, H> {
        let mut solver = Solver::with_threads(self.tt_size_mb, self.threads);
        solver.set_weak(self.weak);
        solver.set_time_budget(self.time_budget());
        if let Some(path) = &self.book_path {
            solver.set_book(OpeningBook::load_or_warn(path).map(Arc::new));
        }
        solver
    }
}

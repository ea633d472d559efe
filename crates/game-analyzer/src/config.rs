//! Configuration file loading for the analyzer.
//!
//! Settings live in `analyzer.toml`. Every field has a default, so a missing
//! file or an empty one yields a usable configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chess_analysis::{AnalysisConfig, EngineOptions, GameStore, JsonDirStore, SqliteStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::source::DEFAULT_USER_AGENT;

/// File name of the SQLite database inside the store directory.
pub const SQLITE_FILE: &str = "analysis.sqlite3";

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Backend used to persist analyses.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// One JSON file per game.
    #[default]
    Json,
    /// A single SQLite database.
    Sqlite,
}

/// The `[store]` table.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Storage backend. Defaults to `json`.
    #[serde(default)]
    pub kind: StoreKind,
    /// Directory holding the records (or the SQLite file).
    /// Defaults to `./chess_analysis`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./chess_analysis")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// Opens the configured store, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or database cannot be opened.
    pub fn open(&self) -> Result<Arc<dyn GameStore>, StoreError> {
        debug!(kind = ?self.kind, path = %self.path.display(), "opening store");
        match self.kind {
            StoreKind::Json => Ok(Arc::new(JsonDirStore::open(&self.path)?)),
            StoreKind::Sqlite => {
                std::fs::create_dir_all(&self.path)?;
                Ok(Arc::new(SqliteStore::open(self.path.join(SQLITE_FILE))?))
            }
        }
    }
}

/// Main analyzer configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Engine executable. Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub engine_path: String,
    /// Engine `Threads` option. Defaults to 1.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Engine `Hash` option in megabytes; engine default when absent.
    #[serde(default)]
    pub hash_mb: Option<u32>,
    /// Search depth per position. Defaults to 25.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Ranked lines per position. Defaults to 3.
    #[serde(default = "default_lines")]
    pub lines: u32,
    /// Upper bound for one evaluation, in seconds. Defaults to 120.
    #[serde(default = "default_eval_timeout_secs")]
    pub eval_timeout_secs: u64,
    /// Games analysed in parallel, one engine each. Defaults to 1.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Reference opening database in PGN. Defaults to "eco.pgn".
    #[serde(default = "default_eco_path")]
    pub eco_path: PathBuf,
    /// Most recent games to fetch. Defaults to 1000.
    #[serde(default = "default_max_games")]
    pub max_games: usize,
    /// `User-Agent` header sent to chess.com.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Where analyses are stored.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_threads() -> u32 {
    1
}

fn default_depth() -> u32 {
    AnalysisConfig::default().depth
}

fn default_lines() -> u32 {
    AnalysisConfig::default().lines
}

fn default_eval_timeout_secs() -> u64 {
    120
}

fn default_workers() -> usize {
    1
}

fn default_eco_path() -> PathBuf {
    PathBuf::from("eco.pgn")
}

fn default_max_games() -> usize {
    1000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            threads: default_threads(),
            hash_mb: None,
            depth: default_depth(),
            lines: default_lines(),
            eval_timeout_secs: default_eval_timeout_secs(),
            workers: default_workers(),
            eco_path: default_eco_path(),
            max_games: default_max_games(),
            user_agent: default_user_agent(),
            store: StoreConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Loads the configuration at `path`, or the defaults if the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            debug!(path = %path.display(), "loaded config");
            Ok(toml::from_str(&content)?)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Returns the default path of the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("analyzer.toml")
    }

    /// Engine settings derived from this configuration.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            args: Vec::new(),
            threads: self.threads,
            hash_mb: self.hash_mb,
            timeout: Duration::from_secs(self.eval_timeout_secs),
        }
    }

    /// Per-game analysis settings derived from this configuration.
    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            depth: self.depth,
            lines: self.lines,
        }
    }
}

//! Command-line front end for the analysis pipeline.
//!
//! - [`config`] - `analyzer.toml` loading
//! - [`source`] - Fetching a player's games from chess.com
//! - [`report`] - Plain-text rendering of batch results and statistics

pub mod config;
pub mod report;
pub mod source;

pub use config::{AnalyzerConfig, ConfigError, StoreConfig, StoreKind};
pub use source::{ChessComSource, GameSource, SourceError};

//! Engine-driven game analysis.
//!
//! This crate replays a player's games, asks a UCI engine for the best lines
//! after every move, tags each position with its opening, persists one
//! record per game, and aggregates the stored records into win/loss
//! statistics.
//!
//! # Overview
//!
//! - [`EngineSession`] - One live UCI engine process
//! - [`analyze_game`] / [`analyze_and_persist`] - Per-game pipeline
//! - [`analyze_batch`] - Several games over a pool of engine workers
//! - [`GameStore`] - Persistence, with [`JsonDirStore`] and [`SqliteStore`]
//! - [`aggregate`] - Opening and color statistics for one player
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{analyze_and_persist, AnalysisConfig, EngineOptions, EngineSession, JsonDirStore};
//!
//! let engine = EngineSession::open("stockfish", &EngineOptions::default()).await?;
//! let store = JsonDirStore::open("./chess_analysis")?;
//! let outcome = analyze_and_persist(&game, &book, &engine, &store, &AnalysisConfig::default()).await;
//! engine.close().await;
//! ```

pub mod analyzer;
pub mod batch;
pub mod endgame;
pub mod engine;
pub mod evaluation;
pub mod record;
pub mod store;
pub mod summary;

pub use analyzer::{analyze_and_persist, analyze_game, AnalysisConfig, AnalysisError, Outcome};
pub use batch::{analyze_batch, BatchConfig, BatchReport};
pub use endgame::first_endgame_ply;
pub use engine::{EngineError, EngineOptions, EngineSession, SearchPosition};
pub use evaluation::Evaluation;
pub use record::{Color, EvaluationLine, GameAnalysis, GameRecord, MoveAnalysis, PlayerResult};
pub use store::{GameStore, JsonDirStore, SqliteStore, StoreError};
pub use summary::{aggregate, AggregateStats, ColorWins, OpeningOutcome};

//! Per-game analysis.
//!
//! This module turns one [`GameRecord`] into a [`GameAnalysis`]: the PGN is
//! replayed in full first, then every ply is sent to the engine in order and
//! the resulting position is classified against the opening book.

use chess_openings::{Mainline, OpeningBook};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, EngineSession, SearchPosition};
use crate::record::{GameAnalysis, GameRecord, MoveAnalysis};
use crate::store::{GameStore, StoreError};

/// Errors that can occur during game analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The game's moves could not be parsed or replayed.
    #[error("malformed game: {0}")]
    MalformedGame(String),
    /// The engine failed; its session must not be reused.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(#[from] EngineError),
    /// The store could not be read or written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Configuration for game analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Search depth for every position.
    pub depth: u32,
    /// Number of ranked lines requested per position.
    pub lines: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { depth: 25, lines: 3 }
    }
}

/// Result of [`analyze_and_persist`].
#[derive(Debug)]
pub enum Outcome {
    /// The game was analysed and stored.
    Analyzed,
    /// A record for the game already existed; nothing was done.
    SkippedExisting,
    /// Analysis failed; nothing was stored.
    Failed(AnalysisError),
}

/// Analyses a complete game.
///
/// The whole mainline is replayed before the engine is consulted, so a game
/// with an unparsable or illegal move costs no engine time. Positions are
/// then evaluated strictly in game order.
///
/// # Errors
///
/// - `AnalysisError::MalformedGame` if the PGN cannot be read or a move is illegal
/// - `AnalysisError::EngineUnavailable` if any evaluation fails
pub async fn analyze_game(
    game: &GameRecord,
    book: &OpeningBook,
    engine: &EngineSession,
    config: &AnalysisConfig,
) -> Result<GameAnalysis, AnalysisError> {
    let mainline = Mainline::parse(&game.pgn)
        .map_err(|e| AnalysisError::MalformedGame(e.to_string()))?
        .ok_or_else(|| AnalysisError::MalformedGame("no game in PGN".to_string()))?;
    let plies = mainline
        .replay()
        .map_err(|e| AnalysisError::MalformedGame(e.to_string()))?;

    engine.new_game().await?;

    let mut history: Vec<String> = Vec::with_capacity(plies.len());
    let mut moves = Vec::with_capacity(plies.len());
    for ply in &plies {
        history.push(ply.uci.clone());
        let variations = engine
            .evaluate(
                &SearchPosition::startpos(history.clone()),
                config.depth,
                config.lines,
            )
            .await?;
        let opening = book.lookup(&ply.fingerprint()).cloned();
        debug!(
            game = %game.id,
            ply = ply.number,
            mv = %ply.uci,
            lines = variations.len(),
            opening = opening.as_ref().map(|o| o.name.as_str()),
            "evaluated ply"
        );
        moves.push(MoveAnalysis {
            uci: ply.uci.clone(),
            variations,
            opening,
        });
    }

    Ok(GameAnalysis {
        game: game.clone(),
        moves,
    })
}

/// Analyses a game and stores the result, unless the store already holds a
/// record for it.
///
/// Existing records are never recomputed or overwritten, and a failed
/// analysis stores nothing.
pub async fn analyze_and_persist(
    game: &GameRecord,
    book: &OpeningBook,
    engine: &EngineSession,
    store: &dyn GameStore,
    config: &AnalysisConfig,
) -> Outcome {
    match store.exists(&game.id) {
        Ok(true) => {
            info!(game = %game.id, "already analysed, skipping");
            return Outcome::SkippedExisting;
        }
        Ok(false) => {}
        Err(e) => return failed(game, e.into()),
    }

    let analysis = match analyze_game(game, book, engine, config).await {
        Ok(analysis) => analysis,
        Err(e) => return failed(game, e),
    };

    match store.put(&analysis) {
        Ok(()) => {
            info!(game = %game.id, plies = analysis.moves.len(), "analysed");
            Outcome::Analyzed
        }
        Err(e) => failed(game, e.into()),
    }
}

fn failed(game: &GameRecord, error: AnalysisError) -> Outcome {
    warn!(game = %game.id, error = %error, "analysis failed");
    Outcome::Failed(error)
}

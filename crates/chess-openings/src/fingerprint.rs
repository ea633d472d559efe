//! Canonical position keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::fen::{Epd, Fen};
use shakmaty::{CastlingMode, Chess, EnPassantMode};
use thiserror::Error;

/// Errors that can occur when building a fingerprint from FEN text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// The text is not valid FEN.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    /// The FEN parses but does not describe a legal standard chess position.
    #[error("illegal position: {0}")]
    IllegalPosition(String),
}

/// Canonical encoding of a position: piece placement, side to move, castling
/// rights and en passant square.
///
/// This is the EPD form of the position. The halfmove clock and fullmove
/// number are not part of it, so the same position reached by different move
/// orders produces the same fingerprint. The en passant square is only
/// included when an en passant capture is actually legal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a position.
    pub fn of(position: &Chess) -> Self {
        Self(Epd::from_position(position, EnPassantMode::Legal).to_string())
    }

    /// Fingerprint of the standard starting position.
    pub fn startpos() -> Self {
        Self::of(&Chess::default())
    }

    /// Parses a full FEN string and fingerprints the position it describes.
    pub fn from_fen(fen: &str) -> Result<Self, FingerprintError> {
        let fen: Fen = fen
            .trim()
            .parse()
            .map_err(|e| FingerprintError::InvalidFen(format!("{}", e)))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| FingerprintError::IllegalPosition(e.to_string()))?;
        Ok(Self::of(&position))
    }

    /// The fingerprint text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

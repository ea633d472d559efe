//! Game and analysis records.
//!
//! [`GameRecord`] is what a game source hands over; [`GameAnalysis`] is what
//! the pipeline persists. The persisted JSON form is
//!
//! ```text
//! {id, end_time, time_control, time_class, pgn,
//!  white: {username, rating, result, accuracy},
//!  black: {...},
//!  moves: [{move, variations: [{depth, eval, mate, pv}], opening}]}
//! ```
//!
//! where exactly one of `eval` and `mate` is non-null on every variation.

use std::fmt;

use chess_openings::OpeningEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::Evaluation;

/// Player color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// The player with the white pieces.
    White,
    /// The player with the black pieces.
    Black,
}

impl Color {
    /// Lowercase name, as used in persisted records and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    /// Account name on the game site.
    pub username: String,
    /// Rating at the time of the game.
    pub rating: u32,
    /// Result tag for this side ("win", "checkmated", "resigned", "timeout", ...).
    pub result: String,
    /// Accuracy score, when the site computed one.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl PlayerResult {
    /// Returns true if this side won the game.
    #[must_use]
    pub fn won(&self) -> bool {
        self.result == "win"
    }
}

/// A completed game as fetched from a game source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique game id.
    pub id: String,
    /// End of the game, seconds since the Unix epoch.
    pub end_time: i64,
    /// Time control, e.g. "180+2".
    pub time_control: String,
    /// Time class, e.g. "blitz".
    pub time_class: String,
    /// PGN of the game.
    pub pgn: String,
    /// The white player.
    pub white: PlayerResult,
    /// The black player.
    pub black: PlayerResult,
}

impl GameRecord {
    /// The side for `color`.
    #[must_use]
    pub fn player(&self, color: Color) -> &PlayerResult {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// The color `username` played, compared ASCII case-insensitively.
    /// `None` if the user did not play in this game.
    #[must_use]
    pub fn color_of(&self, username: &str) -> Option<Color> {
        if self.white.username.eq_ignore_ascii_case(username) {
            Some(Color::White)
        } else if self.black.username.eq_ignore_ascii_case(username) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Returns true if `username` played and won this game.
    #[must_use]
    pub fn won_by(&self, username: &str) -> bool {
        self.color_of(username)
            .is_some_and(|color| self.player(color).won())
    }
}

/// A persisted evaluation line with both or neither of `eval` and `mate` set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("evaluation line at depth {depth} must have exactly one of eval and mate")]
pub struct InvalidEvaluationLine {
    /// Depth of the offending line.
    pub depth: u32,
}

/// One ranked line reported by the engine for a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvaluationLine", into = "RawEvaluationLine")]
pub struct EvaluationLine {
    /// Depth searched.
    pub depth: u32,
    /// Score from the side to move's perspective.
    pub evaluation: Evaluation,
    /// Principal variation in UCI notation.
    pub pv: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RawEvaluationLine {
    depth: u32,
    #[serde(default)]
    eval: Option<i32>,
    #[serde(default)]
    mate: Option<i32>,
    #[serde(default)]
    pv: Option<Vec<String>>,
}

impl TryFrom<RawEvaluationLine> for EvaluationLine {
    type Error = InvalidEvaluationLine;

    fn try_from(raw: RawEvaluationLine) -> Result<Self, Self::Error> {
        let evaluation = Evaluation::from_parts(raw.eval, raw.mate)
            .ok_or(InvalidEvaluationLine { depth: raw.depth })?;
        Ok(Self {
            depth: raw.depth,
            evaluation,
            pv: raw.pv.unwrap_or_default(),
        })
    }
}

impl From<EvaluationLine> for RawEvaluationLine {
    fn from(line: EvaluationLine) -> Self {
        Self {
            depth: line.depth,
            eval: line.evaluation.centipawns(),
            mate: line.evaluation.mate(),
            pv: Some(line.pv),
        }
    }
}

/// Analysis of one played move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    /// The move played, in UCI notation.
    #[serde(rename = "move")]
    pub uci: String,
    /// Engine lines for the position after the move, best first.
    pub variations: Vec<EvaluationLine>,
    /// The opening the position after the move belongs to, if any.
    #[serde(default)]
    pub opening: Option<OpeningEntry>,
}

/// A game together with the per-move analysis of every ply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAnalysis {
    /// The analysed game.
    #[serde(flatten)]
    pub game: GameRecord,
    /// One entry per ply, in game order.
    pub moves: Vec<MoveAnalysis>,
}

impl GameAnalysis {
    /// The game id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.game.id
    }

    /// The openings reached in this game, in order of first appearance,
    /// without repeats.
    #[must_use]
    pub fn openings(&self) -> Vec<&OpeningEntry> {
        let mut seen: Vec<&OpeningEntry> = Vec::new();
        for opening in self.moves.iter().filter_map(|m| m.opening.as_ref()) {
            if !seen.contains(&opening) {
                seen.push(opening);
            }
        }
        seen
    }
}

//! Endgame detection over a persisted move list.
//!
//! A position counts as an endgame once both sides hold at most
//! [`ENDGAME_MATERIAL`] points of material, kings excluded.

use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, Position, Role};
use thiserror::Error;

/// Material threshold, per side, at or below which a position is an endgame.
pub const ENDGAME_MATERIAL: u32 = 13;

/// A persisted move that does not replay.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ply {ply} ({uci}) cannot be replayed")]
pub struct UciReplayError {
    /// 1-based ply index.
    pub ply: usize,
    /// The move as stored.
    pub uci: String,
}

fn role_value(role: Role) -> u32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

/// Material points of `color` in `position`.
pub fn material(position: &Chess, color: Color) -> u32 {
    let board = position.board();
    board
        .occupied()
        .into_iter()
        .filter_map(|square| board.piece_at(square))
        .filter(|piece| piece.color == color)
        .map(|piece| role_value(piece.role))
        .sum()
}

/// Returns true if both sides are at or below the endgame threshold.
pub fn is_endgame(position: &Chess) -> bool {
    material(position, Color::White) <= ENDGAME_MATERIAL
        && material(position, Color::Black) <= ENDGAME_MATERIAL
}

/// Replays `moves` (UCI notation) from the start position and returns the
/// 1-based ply after which the game first became an endgame.
///
/// # Errors
///
/// Returns an error if a move is malformed or illegal.
pub fn first_endgame_ply<S: AsRef<str>>(moves: &[S]) -> Result<Option<usize>, UciReplayError> {
    let mut position = Chess::default();
    for (index, text) in moves.iter().enumerate() {
        let text = text.as_ref();
        let error = || UciReplayError {
            ply: index + 1,
            uci: text.to_string(),
        };
        let uci: UciMove = text.parse().map_err(|_| error())?;
        let m = uci.to_move(&position).map_err(|_| error())?;
        position.play_unchecked(m);
        if is_endgame(&position) {
            return Ok(Some(index + 1));
        }
    }
    Ok(None)
}

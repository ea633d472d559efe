//! Win/loss statistics over the persisted analyses of one player.
//!
//! Statistics are a pure fold over the stored records and are recomputed
//! from scratch on every run.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::endgame::first_endgame_ply;
use crate::record::{Color, GameAnalysis};
use crate::store::{GameStore, StoreError};

/// Games won and lost by the player with one opening label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpeningOutcome {
    /// Games won.
    pub won: u32,
    /// Games not won (losses and draws).
    pub lost: u32,
}

impl OpeningOutcome {
    /// Games played with this label.
    #[must_use]
    pub fn games(&self) -> u32 {
        self.won + self.lost
    }
}

/// Wins by the color the player had.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColorWins {
    /// Wins with the white pieces.
    pub white: u32,
    /// Wins with the black pieces.
    pub black: u32,
}

/// Aggregated statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Opening label ("name" or "name - variation") to outcome.
    pub outcome_by_opening: BTreeMap<String, OpeningOutcome>,
    /// Wins by color.
    pub win_by_color: ColorWins,
    /// Every stored game, whether or not the player took part.
    pub total_games: u32,
    /// Games of the player that reached an endgame.
    pub endgames_reached: u32,
    /// Of those, games the player won.
    pub endgames_won: u32,
}

impl AggregateStats {
    /// Folds `games` into statistics for `username`.
    pub fn from_games<'a, I>(games: I, username: &str) -> Self
    where
        I: IntoIterator<Item = &'a GameAnalysis>,
    {
        let mut stats = Self::default();
        for game in games {
            stats.add_game(game, username);
        }
        stats
    }

    /// Adds one game.
    ///
    /// Each distinct label of the game is counted once. A game with a
    /// variation counts towards both the base name and the
    /// "name - variation" label.
    pub fn add_game(&mut self, game: &GameAnalysis, username: &str) {
        let color = game.game.color_of(username);
        let won = game.game.won_by(username);

        let labels: BTreeSet<String> = game
            .openings()
            .into_iter()
            .flat_map(|opening| opening.labels())
            .collect();
        for label in labels {
            let outcome = self.outcome_by_opening.entry(label).or_default();
            if won {
                outcome.won += 1;
            } else {
                outcome.lost += 1;
            }
        }

        if won {
            match color {
                Some(Color::White) => self.win_by_color.white += 1,
                Some(Color::Black) => self.win_by_color.black += 1,
                None => {}
            }
        }

        if color.is_some() {
            let moves: Vec<&str> = game.moves.iter().map(|m| m.uci.as_str()).collect();
            match first_endgame_ply(&moves) {
                Ok(Some(_)) => {
                    self.endgames_reached += 1;
                    if won {
                        self.endgames_won += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(game = %game.id(), error = %e, "no endgame data"),
            }
        }

        self.total_games += 1;
    }

    /// Opening labels with their outcomes, most played first; ties by label.
    #[must_use]
    pub fn openings_by_games(&self) -> Vec<(&str, OpeningOutcome)> {
        let mut openings: Vec<(&str, OpeningOutcome)> = self
            .outcome_by_opening
            .iter()
            .map(|(label, outcome)| (label.as_str(), *outcome))
            .collect();
        openings.sort_by(|a, b| b.1.games().cmp(&a.1.games()).then(a.0.cmp(b.0)));
        openings
    }
}

/// Aggregates every record in `store` for `username`.
///
/// # Errors
///
/// Returns an error only if the store cannot be read.
pub fn aggregate(store: &dyn GameStore, username: &str) -> Result<AggregateStats, StoreError> {
    let games = store.list_all()?;
    let stats = AggregateStats::from_games(&games, username);
    debug!(
        username,
        games = stats.total_games,
        openings = stats.outcome_by_opening.len(),
        "aggregated"
    );
    Ok(stats)
}

//! Game sources.
//!
//! [`GameSource`] is the seam between the analysis pipeline and wherever a
//! player's games come from. [`ChessComSource`] reads them from the public
//! chess.com API: the list of monthly archives first, then each archive,
//! newest month first, until enough games are collected.

use async_trait::async_trait;
use chess_analysis::{GameRecord, PlayerResult};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Public chess.com API root.
pub const CHESS_COM_API: &str = "https://api.chess.com/pub";

/// chess.com rejects requests without a browser-like user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.5938.132 Safari/537.36";

/// Errors raised while fetching games.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider could not be reached or returned something unusable.
    #[error("game source unavailable: {0}")]
    SourceUnavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::SourceUnavailable(e.to_string())
    }
}

/// Somewhere a player's completed games can be fetched from.
#[async_trait]
pub trait GameSource: Send + Sync {
    /// Returns up to `max_games` of `username`'s games, most recent first.
    async fn fetch_games(
        &self,
        username: &str,
        max_games: usize,
    ) -> Result<Vec<GameRecord>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct ArchiveList {
    archives: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MonthlyArchive {
    games: Vec<ApiGame>,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    #[serde(default)]
    uuid: String,
    end_time: i64,
    #[serde(default)]
    time_control: String,
    #[serde(default)]
    time_class: String,
    #[serde(default)]
    pgn: Option<String>,
    white: ApiPlayer,
    black: ApiPlayer,
    #[serde(default)]
    accuracies: Option<Accuracies>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayer {
    username: String,
    #[serde(default)]
    rating: u32,
    result: String,
}

#[derive(Debug, Deserialize, Default)]
struct Accuracies {
    white: Option<f64>,
    black: Option<f64>,
}

impl ApiGame {
    /// `None` for games without moves (aborted) or without an id.
    fn into_record(self) -> Option<GameRecord> {
        let pgn = self.pgn.filter(|pgn| !pgn.trim().is_empty())?;
        if self.uuid.is_empty() {
            return None;
        }
        let accuracies = self.accuracies.unwrap_or_default();
        Some(GameRecord {
            id: self.uuid,
            end_time: self.end_time,
            time_control: self.time_control,
            time_class: self.time_class,
            pgn,
            white: self.white.into_player(accuracies.white),
            black: self.black.into_player(accuracies.black),
        })
    }
}

impl ApiPlayer {
    fn into_player(self, accuracy: Option<f64>) -> PlayerResult {
        PlayerResult {
            username: self.username,
            rating: self.rating,
            result: self.result,
            accuracy,
        }
    }
}

/// Parses one monthly archive into records, most recent first.
fn parse_archive(body: &str) -> Result<Vec<GameRecord>, SourceError> {
    let archive: MonthlyArchive = serde_json::from_str(body)
        .map_err(|e| SourceError::SourceUnavailable(format!("malformed archive: {e}")))?;
    let total = archive.games.len();
    let mut games: Vec<GameRecord> = archive
        .games
        .into_iter()
        .filter_map(ApiGame::into_record)
        .collect();
    if games.len() < total {
        debug!(skipped = total - games.len(), "skipped games without moves");
    }
    games.sort_by(|a, b| b.end_time.cmp(&a.end_time));
    Ok(games)
}

/// Reads games from the public chess.com API.
#[derive(Debug, Clone)]
pub struct ChessComSource {
    client: Client,
    base_url: String,
}

impl ChessComSource {
    /// Creates a source that identifies itself with `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SourceUnavailable`] if the user agent is not a
    /// valid header value or the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(user_agent)
                .map_err(|e| SourceError::SourceUnavailable(format!("invalid user agent: {e}")))?,
        );
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: CHESS_COM_API.to_string(),
        })
    }

    /// Points the source at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "{url} returned {status}"
            )));
        }
        Ok(response.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::SourceUnavailable(format!("malformed response from {url}: {e}")))
    }
}

#[async_trait]
impl GameSource for ChessComSource {
    async fn fetch_games(
        &self,
        username: &str,
        max_games: usize,
    ) -> Result<Vec<GameRecord>, SourceError> {
        if max_games == 0 {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/player/{}/games/archives",
            self.base_url,
            username.to_lowercase()
        );
        let archives: ArchiveList = self.get_json(&url).await?;

        let mut games = Vec::new();
        for archive in archives.archives.iter().rev() {
            let body = self.get_text(archive).await?;
            let month = parse_archive(&body)?;
            debug!(archive = %archive, games = month.len(), "fetched archive");
            games.extend(month);
            if games.len() >= max_games {
                break;
            }
        }
        games.truncate(max_games);

        info!(username, games = games.len(), "fetched games");
        Ok(games)
    }
}

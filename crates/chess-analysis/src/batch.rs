//! Batch analysis over a pool of engine workers.
//!
//! Games are pulled from a shared queue by `workers` independent tasks. Each
//! task owns at most one [`EngineSession`], opened lazily when it first meets
//! a game that actually needs analysis, and replaced after an engine failure.

use std::collections::VecDeque;
use std::sync::Arc;

use chess_openings::OpeningBook;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::analyzer::{analyze_and_persist, AnalysisConfig, AnalysisError, Outcome};
use crate::engine::{EngineError, EngineOptions, EngineSession};
use crate::record::GameRecord;
use crate::store::GameStore;

/// Settings for [`analyze_batch`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Engine executable.
    pub engine_path: String,
    /// Options each engine is opened with.
    pub engine: EngineOptions,
    /// Per-game analysis settings.
    pub analysis: AnalysisConfig,
    /// Number of parallel workers, each with its own engine process.
    pub workers: usize,
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Games analysed and stored.
    pub analyzed: usize,
    /// Games skipped because a record already existed.
    pub skipped: usize,
    /// Games that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    /// Total number of games handled.
    #[must_use]
    pub fn total(&self) -> usize {
        self.analyzed + self.skipped + self.failed.len()
    }

    fn record(&mut self, game: &GameRecord, outcome: Outcome) {
        match outcome {
            Outcome::Analyzed => self.analyzed += 1,
            Outcome::SkippedExisting => self.skipped += 1,
            Outcome::Failed(e) => self.failed.push((game.id.clone(), e.to_string())),
        }
    }

    fn merge(&mut self, other: BatchReport) {
        self.analyzed += other.analyzed;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

type Queue = Arc<Mutex<VecDeque<(usize, GameRecord)>>>;

/// Analyses every game, `config.workers` at a time.
///
/// One game's failure never aborts the batch. Failed games are reported in
/// input order.
pub async fn analyze_batch(
    games: Vec<GameRecord>,
    book: Arc<OpeningBook>,
    store: Arc<dyn GameStore>,
    config: BatchConfig,
) -> BatchReport {
    let total = games.len();
    let workers = config.workers.clamp(1, total.max(1));
    let queue: Queue = Arc::new(Mutex::new(games.into_iter().enumerate().collect()));
    let config = Arc::new(config);

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let book = Arc::clone(&book);
        let store = Arc::clone(&store);
        let config = Arc::clone(&config);
        handles.push(tokio::spawn(async move {
            run_worker(worker, total, queue, book, store, config).await
        }));
    }

    let mut indexed_failures = Vec::new();
    let mut report = BatchReport::default();
    for handle in handles {
        match handle.await {
            Ok((partial, failures)) => {
                report.merge(partial);
                indexed_failures.extend(failures);
            }
            Err(e) => warn!(error = %e, "analysis worker panicked"),
        }
    }
    indexed_failures.sort_by_key(|(index, _)| *index);
    report.failed = indexed_failures.into_iter().map(|(_, f)| f).collect();

    info!(
        analyzed = report.analyzed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "batch complete"
    );
    report
}

async fn run_worker(
    worker: usize,
    total: usize,
    queue: Queue,
    book: Arc<OpeningBook>,
    store: Arc<dyn GameStore>,
    config: Arc<BatchConfig>,
) -> (BatchReport, Vec<(usize, (String, String))>) {
    let mut report = BatchReport::default();
    let mut failures = Vec::new();
    let mut session: Option<EngineSession> = None;

    loop {
        let Some((index, game)) = queue.lock().await.pop_front() else {
            break;
        };
        info!(worker, game = %game.id, "[{}/{}] analysing", index + 1, total);

        let outcome = process(&game, &mut session, &book, store.as_ref(), &config).await;
        let engine_failed = matches!(outcome, Outcome::Failed(AnalysisError::EngineUnavailable(_)));

        match outcome {
            Outcome::Failed(e) => failures.push((index, (game.id.clone(), e.to_string()))),
            other => report.record(&game, other),
        }

        if engine_failed {
            if let Some(engine) = session.take() {
                engine.close().await;
            }
        }
    }

    if let Some(engine) = session.take() {
        engine.close().await;
    }
    (report, failures)
}

async fn process(
    game: &GameRecord,
    session: &mut Option<EngineSession>,
    book: &OpeningBook,
    store: &dyn GameStore,
    config: &BatchConfig,
) -> Outcome {
    // Skipped games never start an engine.
    match store.exists(&game.id) {
        Ok(true) => return Outcome::SkippedExisting,
        Ok(false) => {}
        Err(e) => return Outcome::Failed(e.into()),
    }

    if session.is_none() {
        match EngineSession::open(&config.engine_path, &config.engine).await {
            Ok(engine) => *session = Some(engine),
            Err(e) => {
                warn!(game = %game.id, error = %e, "failed to open engine");
                return Outcome::Failed(e.into());
            }
        }
    }
    let Some(engine) = session.as_ref() else {
        return Outcome::Failed(EngineError::Unusable.into());
    };

    analyze_and_persist(game, book, engine, store, &config.analysis).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{game, player};

    #[test]
    fn test_report_record_and_total() {
        let g = game("g1", player("alice", "win"), player("bob", "resigned"));
        let mut report = BatchReport::default();
        report.record(&g, Outcome::Analyzed);
        report.record(&g, Outcome::SkippedExisting);
        report.record(
            &g,
            Outcome::Failed(AnalysisError::MalformedGame("bad move".to_string())),
        );
        assert_eq!(report.analyzed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.failed,
            vec![("g1".to_string(), "malformed game: bad move".to_string())]
        );
        assert_eq!(report.total(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = Arc::new(crate::store::SqliteStore::open(":memory:").unwrap());
        let config = BatchConfig {
            engine_path: "/nonexistent/engine".to_string(),
            engine: EngineOptions::default(),
            analysis: AnalysisConfig::default(),
            workers: 4,
        };
        let report = analyze_batch(vec![], Arc::new(OpeningBook::new()), store, config).await;
        assert_eq!(report, BatchReport::default());
    }

    #[tokio::test]
    async fn test_missing_engine_fails_each_game_without_aborting() {
        let store = Arc::new(crate::store::SqliteStore::open(":memory:").unwrap());
        let games = vec![
            game("g1", player("alice", "win"), player("bob", "resigned")),
            game("g2", player("alice", "win"), player("bob", "resigned")),
        ];
        let config = BatchConfig {
            engine_path: "/nonexistent/engine".to_string(),
            engine: EngineOptions::default(),
            analysis: AnalysisConfig::default(),
            workers: 2,
        };
        let report = analyze_batch(games, Arc::new(OpeningBook::new()), store, config).await;
        assert_eq!(report.analyzed, 0);
        let ids: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
        assert!(report.failed[0].1.starts_with("engine unavailable"));
    }
}

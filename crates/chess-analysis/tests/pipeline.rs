//! End-to-end analysis tests: PGN in, stored records out.

#![cfg(unix)]

mod common;

use std::sync::Arc;

use chess_analysis::{
    aggregate, analyze_and_persist, analyze_batch, analyze_game, AnalysisConfig, AnalysisError,
    BatchConfig, EngineSession, Evaluation, GameStore, JsonDirStore, Outcome, SqliteStore,
};
use chess_openings::{OpeningBook, OpeningEntry};
use common::{game, FakeEngine, CRASH, MATE_IN_THREE, REFERENCE_BOOK, SCANDINAVIAN_GAME, SHELL};

fn book() -> OpeningBook {
    OpeningBook::from_reader(REFERENCE_BOOK.as_bytes()).unwrap()
}

fn config() -> AnalysisConfig {
    AnalysisConfig { depth: 18, lines: 3 }
}

#[tokio::test]
async fn test_game_is_analysed_ply_by_ply() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();

    let analysis = analyze_game(&game("g1", SCANDINAVIAN_GAME), &book(), &engine, &config())
        .await
        .unwrap();

    let moves: Vec<&str> = analysis.moves.iter().map(|m| m.uci.as_str()).collect();
    assert_eq!(moves, vec!["e2e4", "d7d5", "e4d5", "d8d5"]);

    assert_eq!(
        analysis.moves[0].opening,
        Some(OpeningEntry::new("B00", "King's Pawn"))
    );
    assert_eq!(
        analysis.moves[1].opening,
        Some(OpeningEntry::new("B01", "Scandinavian Defense"))
    );
    assert_eq!(analysis.moves[2].opening, None);
    assert_eq!(analysis.moves[3].opening, None);

    for m in &analysis.moves {
        assert_eq!(m.variations.len(), 2);
        assert_eq!(m.variations[0].evaluation, Evaluation::Mate(3));
    }

    assert_eq!(fake.count("ucinewgame"), 1);
    assert_eq!(fake.count("go depth 18"), 4);
    assert!(fake
        .commands()
        .contains(&"position startpos moves e2e4 d7d5 e4d5 d8d5".to_string()));

    engine.close().await;
}

#[tokio::test]
async fn test_analyse_then_skip_existing() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let store = JsonDirStore::open(fake.dir().join("analysis")).unwrap();
    let record = game("g1", SCANDINAVIAN_GAME);

    let first = analyze_and_persist(&record, &book(), &engine, &store, &config()).await;
    assert!(matches!(first, Outcome::Analyzed));
    let stored = std::fs::read_to_string(fake.dir().join("analysis").join("g1.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(value["id"], "g1");
    assert_eq!(value["moves"][1]["move"], "d7d5");
    assert_eq!(value["moves"][1]["opening"]["eco"], "B01");
    assert_eq!(value["moves"][1]["opening"]["name"], "Scandinavian Defense");
    assert!(value["moves"][1]["opening"]["variation"].is_null());
    assert_eq!(value["moves"][0]["variations"][0]["mate"], 3);
    assert!(value["moves"][0]["variations"][0]["eval"].is_null());

    let searches = fake.count("go ");
    let second = analyze_and_persist(&record, &book(), &engine, &store, &config()).await;
    assert!(matches!(second, Outcome::SkippedExisting));
    assert_eq!(fake.count("go "), searches);
    assert_eq!(
        std::fs::read_to_string(fake.dir().join("analysis").join("g1.json")).unwrap(),
        stored
    );

    engine.close().await;
}

#[tokio::test]
async fn test_illegal_move_fails_before_engine_is_used() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let store = SqliteStore::open(":memory:").unwrap();
    let record = game("bad", "1. e4 e5 2. Ke3 *");

    let outcome = analyze_and_persist(&record, &book(), &engine, &store, &config()).await;
    match outcome {
        Outcome::Failed(AnalysisError::MalformedGame(reason)) => {
            assert!(reason.contains("Ke3"), "unexpected reason: {reason}");
        }
        other => panic!("Expected malformed game, got {other:?}"),
    }
    assert!(!store.exists("bad").unwrap());
    assert_eq!(fake.count("go "), 0);
    assert_eq!(fake.count("position"), 0);
    assert!(engine.is_usable());

    engine.close().await;
}

#[tokio::test]
async fn test_garbled_moves_fail_before_engine_is_used() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let store = SqliteStore::open(":memory:").unwrap();

    for (id, pgn, token) in [
        ("z", "1. e4 e5 2. Nf3 Nc6 3. Zz9 Zz9 4. Bb5 *", "Zz9"),
        ("e9", "1. e4 e5 2. Nf3 Nc6 3. e9 Kz0 4. Bb5 *", "e9"),
        ("word", "1. e4 e5 2. Nf3 Nc6 3. Bb5 hello *", "hello"),
    ] {
        let outcome = analyze_and_persist(&game(id, pgn), &book(), &engine, &store, &config()).await;
        match outcome {
            Outcome::Failed(AnalysisError::MalformedGame(reason)) => {
                assert!(reason.contains(token), "unexpected reason: {reason}");
            }
            other => panic!("Expected malformed game for {pgn}, got {other:?}"),
        }
        assert!(!store.exists(id).unwrap());
    }
    assert_eq!(fake.count("go "), 0);
    assert_eq!(fake.count("position"), 0);
    assert!(engine.is_usable());

    engine.close().await;
}

#[tokio::test]
async fn test_engine_crash_stores_nothing() {
    let fake = FakeEngine::new(CRASH);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let store = SqliteStore::open(":memory:").unwrap();

    let outcome = analyze_and_persist(
        &game("g1", SCANDINAVIAN_GAME),
        &book(),
        &engine,
        &store,
        &config(),
    )
    .await;

    assert!(matches!(
        outcome,
        Outcome::Failed(AnalysisError::EngineUnavailable(_))
    ));
    assert!(!store.exists("g1").unwrap());
    assert!(!engine.is_usable());

    engine.close().await;
}

#[tokio::test]
async fn test_batch_mixes_outcomes() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let store = Arc::new(SqliteStore::open(":memory:").unwrap());

    // Pre-populate one record.
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let existing = game("done", SCANDINAVIAN_GAME);
    let outcome = analyze_and_persist(&existing, &book(), &engine, store.as_ref(), &config()).await;
    assert!(matches!(outcome, Outcome::Analyzed));
    engine.close().await;

    let games = vec![
        game("bad", "1. e4 e5 2. Ke3 *"),
        existing,
        game("new", "1. d4 d5 2. c4 *"),
    ];
    let batch = BatchConfig {
        engine_path: SHELL.to_string(),
        engine: fake.options(),
        analysis: config(),
        workers: 2,
    };
    let report = analyze_batch(games, Arc::new(book()), store.clone(), batch).await;

    assert_eq!(report.analyzed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad");
    assert!(report.failed[0].1.starts_with("malformed game"));
    assert_eq!(report.total(), 3);

    let mut ids: Vec<String> = store.list_all().unwrap().into_iter().map(|a| a.game.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["done", "new"]);
}

#[tokio::test]
async fn test_batch_replaces_crashed_engine() {
    let fake = FakeEngine::crash_once();
    let store = Arc::new(SqliteStore::open(":memory:").unwrap());
    let games = vec![game("g1", SCANDINAVIAN_GAME), game("g2", SCANDINAVIAN_GAME)];
    let batch = BatchConfig {
        engine_path: SHELL.to_string(),
        engine: fake.options(),
        analysis: config(),
        workers: 1,
    };

    let report = analyze_batch(games, Arc::new(book()), store.clone(), batch).await;

    assert_eq!(report.analyzed, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "g1");
    assert!(report.failed[0].1.starts_with("engine unavailable"));
    assert!(store.exists("g2").unwrap());
    assert!(!store.exists("g1").unwrap());
    let handshakes = fake.commands().iter().filter(|c| *c == "uci").count();
    assert_eq!(handshakes, 2);
}

#[tokio::test]
async fn test_summary_over_analysed_games() {
    let fake = FakeEngine::new(MATE_IN_THREE);
    let engine = EngineSession::open(SHELL, &fake.options()).await.unwrap();
    let store = SqliteStore::open(":memory:").unwrap();

    let won = game("w", SCANDINAVIAN_GAME);
    let mut lost = game("l", "1. e4 e5 *");
    lost.white.result = "resigned".to_string();
    lost.black.result = "win".to_string();
    for record in [&won, &lost] {
        let outcome = analyze_and_persist(record, &book(), &engine, &store, &config()).await;
        assert!(matches!(outcome, Outcome::Analyzed));
    }
    engine.close().await;

    let stats = aggregate(&store, "johnlocke999").unwrap();
    assert_eq!(stats.total_games, 2);
    assert_eq!(stats.win_by_color.white, 1);
    assert_eq!(stats.win_by_color.black, 0);
    assert_eq!(stats.outcome_by_opening["King's Pawn"].won, 1);
    assert_eq!(stats.outcome_by_opening["King's Pawn"].lost, 1);
    assert_eq!(stats.outcome_by_opening["Scandinavian Defense"].won, 1);
    assert_eq!(stats.outcome_by_opening["Scandinavian Defense"].lost, 0);
    assert_eq!(stats.endgames_reached, 0);
}

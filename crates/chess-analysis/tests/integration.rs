//! Integration tests against a real engine.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p chess-analysis --test integration -- --ignored`

use std::time::Duration;

use chess_analysis::{
    analyze_game, AnalysisConfig, EngineOptions, EngineSession, Evaluation, GameRecord,
    PlayerResult, SearchPosition,
};
use chess_openings::OpeningBook;

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn options() -> EngineOptions {
    EngineOptions {
        timeout: Duration::from_secs(30),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_basic_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let engine = EngineSession::open("stockfish", &options())
        .await
        .expect("Failed to open Stockfish");
    let name = engine.name();
    assert!(
        name.to_lowercase().contains("stockfish"),
        "Engine name should contain 'Stockfish', got: {}",
        name
    );

    let lines = engine
        .evaluate(&SearchPosition::startpos(vec![]), 10, 3)
        .await
        .expect("Failed to analyse starting position");
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert!(line.depth >= 10, "depth {} below 10", line.depth);
        assert!(!line.pv.is_empty());
    }

    engine.close().await;
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_finds_forced_mate() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let engine = EngineSession::open("stockfish", &options()).await.unwrap();
    // Scholar's mate is one move away.
    let position = SearchPosition::fen(
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
    );
    let lines = engine.evaluate(&position, 12, 1).await.unwrap();

    assert_eq!(lines[0].evaluation, Evaluation::Mate(1));
    assert_eq!(lines[0].pv.first().map(String::as_str), Some("h5f7"));

    engine.close().await;
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_checkmate_position_is_not_an_error() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let engine = EngineSession::open("stockfish", &options()).await.unwrap();
    let mated = SearchPosition::startpos(
        ["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
    );
    let lines = engine.evaluate(&mated, 10, 3).await.unwrap();

    assert!(lines.len() <= 1);
    assert!(engine.is_usable());

    engine.close().await;
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_scholars_mate_game_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let player = |username: &str, result: &str| PlayerResult {
        username: username.to_string(),
        rating: 1000,
        result: result.to_string(),
        accuracy: None,
    };
    let game = GameRecord {
        id: "scholar".to_string(),
        end_time: 1_700_000_000,
        time_control: "600".to_string(),
        time_class: "rapid".to_string(),
        pgn: "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0".to_string(),
        white: player("white", "win"),
        black: player("black", "checkmated"),
    };

    let engine = EngineSession::open("stockfish", &options()).await.unwrap();
    let config = AnalysisConfig { depth: 10, lines: 2 };
    let analysis = analyze_game(&game, &OpeningBook::new(), &engine, &config)
        .await
        .expect("Analysis should succeed");

    assert_eq!(analysis.moves.len(), 7);
    assert_eq!(analysis.moves[6].uci, "h5f7");
    // After 3...Nf6 white mates in one.
    assert_eq!(
        analysis.moves[5].variations[0].evaluation,
        Evaluation::Mate(1)
    );

    engine.close().await;
}

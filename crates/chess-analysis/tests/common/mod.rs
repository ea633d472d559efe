//! Scripted stand-in for a UCI engine.
//!
//! The engine is a POSIX shell script run by `/bin/sh`. It answers the
//! handshake, appends every command it receives to a log file, and runs a
//! caller-supplied snippet for each `go`.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chess_analysis::{EngineOptions, GameRecord, PlayerResult};
use tempfile::TempDir;

pub const SHELL: &str = "/bin/sh";

/// `go` handler reporting a mate in 3 as the best line and a centipawn
/// score as the second one, with a stale shallower report and a bound-only
/// report mixed in.
pub const MATE_IN_THREE: &str = r#"echo "info depth 24 seldepth 30 multipv 1 score cp 500 nodes 10 pv d1h5"
      echo "info depth 25 seldepth 30 multipv 1 score mate 3 nodes 1000 nps 1000 pv d1h5 g8f6 h5f7"
      echo "info depth 25 seldepth 28 multipv 2 score cp 250 lowerbound nodes 1000 pv f1c4"
      echo "info depth 25 seldepth 28 multipv 2 score cp 210 nodes 1000 pv f1c4 g8f6"
      echo "bestmove d1h5 ponder g8f6""#;

/// `go` handler that dies mid-search.
pub const CRASH: &str = "exit 1";

/// `go` handler that never answers.
pub const HANG: &str = "exec sleep 30";

pub struct FakeEngine {
    dir: TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl FakeEngine {
    pub fn new(on_go: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("engine.sh");
        let log = dir.path().join("commands.log");
        let body = format!(
            r#"DIR="{dir}"
while IFS= read -r line; do
  echo "$line" >> "{log}"
  case "$line" in
    uci)
      echo "id name FakeFish 1.0"
      echo "id author Test"
      echo "option name Threads type spin default 1 min 1 max 512"
      echo "uciok"
      ;;
    isready)
      echo "readyok"
      ;;
    go*)
      {on_go}
      ;;
    quit)
      exit 0
      ;;
  esac
done
"#,
            dir = dir.path().display(),
            log = log.display(),
            on_go = on_go,
        );
        fs::write(&script, body).expect("write script");
        Self { dir, script, log }
    }

    /// Crashes on the first `go` it ever receives, across restarts, then
    /// behaves like [`MATE_IN_THREE`].
    pub fn crash_once() -> Self {
        let on_go = format!(
            r#"if [ ! -f "$DIR/crashed" ]; then
        touch "$DIR/crashed"
        exit 1
      fi
      {MATE_IN_THREE}"#
        );
        Self::new(&on_go)
    }

    pub fn options(&self) -> EngineOptions {
        self.options_with_timeout(Duration::from_secs(10))
    }

    pub fn options_with_timeout(&self, timeout: Duration) -> EngineOptions {
        EngineOptions {
            args: vec![self.script.display().to_string()],
            threads: 2,
            hash_mb: Some(32),
            timeout,
        }
    }

    /// Every command the engine has received so far, across restarts.
    pub fn commands(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

pub fn player(username: &str, result: &str) -> PlayerResult {
    PlayerResult {
        username: username.to_string(),
        rating: 1200,
        result: result.to_string(),
        accuracy: Some(81.5),
    }
}

pub fn game(id: &str, pgn: &str) -> GameRecord {
    GameRecord {
        id: id.to_string(),
        end_time: 1_700_000_000,
        time_control: "600".to_string(),
        time_class: "rapid".to_string(),
        pgn: pgn.to_string(),
        white: player("JohnLocke999", "win"),
        black: player("opponent", "resigned"),
    }
}

pub const SCANDINAVIAN_GAME: &str = r#"[Event "Live Chess"]
[Site "Chess.com"]
[White "JohnLocke999"]
[Black "opponent"]
[Result "1-0"]

1. e4 {[%clk 0:09:58.1]} 1... d5 {[%clk 0:09:57.0]} 2. exd5 (2. e5 c5) 2... Qxd5 1-0
"#;

pub const REFERENCE_BOOK: &str = r#"[ECO "B00"]
[Opening "King's Pawn"]

1. e4 *

[ECO "B01"]
[Opening "Scandinavian Defense"]

1. e4 d5 *
"#;

//! UCI engine session for position analysis.
//!
//! An [`EngineSession`] owns one long-lived engine process. It performs the
//! UCI handshake on [`EngineSession::open`], answers one
//! [`EngineSession::evaluate`] at a time, and terminates the process on
//! [`EngineSession::close`] or when dropped.
//!
//! A session that fails (process exit, I/O error, timeout, or an evaluation
//! cancelled half-way) is marked unusable. Every later call fails with
//! [`EngineError::Unusable`]; the caller must close it and open a new one.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, info, trace, warn};
use uci::{Bound, EngineMessage, GoOptions, GuiCommand};

use crate::record::EvaluationLine;

/// Maximum number of lines to read before giving up on a handshake response.
pub const MAX_UCI_LINES: usize = 1000;

/// How long a closing engine gets to exit after `quit` before it is killed.
pub const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine executable was not found.
    #[error("Engine not found: {0}")]
    NotFound(String),
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[source] std::io::Error),
    /// Engine failed to complete the UCI handshake.
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
    /// Reading from or writing to the engine failed.
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine closed its output.
    #[error("Engine exited unexpectedly")]
    Exited,
    /// The engine did not answer in time.
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
    /// The session failed earlier or was closed.
    #[error("Engine session is no longer usable")]
    Unusable,
}

/// Settings applied when an engine is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Extra command-line arguments for the engine executable.
    pub args: Vec<String>,
    /// Value for the `Threads` option.
    pub threads: u32,
    /// Value for the `Hash` option in megabytes; engine default if `None`.
    pub hash_mb: Option<u32>,
    /// Upper bound for the handshake and for each evaluation.
    pub timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            threads: 1,
            hash_mb: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// A position to search: the start position or a FEN, followed by moves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPosition {
    /// Base position; `None` is the standard start position.
    pub fen: Option<String>,
    /// Moves in UCI notation played from the base position.
    pub moves: Vec<String>,
}

impl SearchPosition {
    /// The start position followed by `moves`.
    pub fn startpos(moves: Vec<String>) -> Self {
        Self { fen: None, moves }
    }

    /// A position given in FEN notation.
    pub fn fen(fen: impl Into<String>) -> Self {
        Self {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    fn command(&self) -> GuiCommand {
        GuiCommand::Position {
            fen: self.fen.clone(),
            moves: self.moves.clone(),
        }
    }
}

struct EngineIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    multipv: u32,
}

impl EngineIo {
    async fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let text = command.to_uci();
        debug!(command = %text, "engine <");
        self.stdin.write_all(text.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let line = self.lines.next_line().await?.ok_or(EngineError::Exited)?;
        trace!(line = %line, "engine >");
        Ok(line)
    }

    async fn handshake(&mut self, options: &EngineOptions) -> Result<String, EngineError> {
        self.send(&GuiCommand::Uci).await?;

        let mut name = None;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed("no uciok".to_string()));
            }
            lines_read += 1;
            match EngineMessage::parse(&self.read_line().await?) {
                EngineMessage::Id {
                    name: Some(engine_name),
                    ..
                } => name = Some(engine_name),
                EngineMessage::UciOk => break,
                _ => {}
            }
        }

        self.send(&GuiCommand::set_option("Threads", options.threads))
            .await?;
        if let Some(hash) = options.hash_mb {
            self.send(&GuiCommand::set_option("Hash", hash)).await?;
        }
        self.sync().await?;

        Ok(name.unwrap_or_else(|| "Unknown Engine".to_string()))
    }

    /// Sends `isready` and waits for `readyok`.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady).await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed("no readyok".to_string()));
            }
            lines_read += 1;
            if EngineMessage::parse(&self.read_line().await?) == EngineMessage::ReadyOk {
                return Ok(());
            }
        }
    }

    async fn search(
        &mut self,
        position: &SearchPosition,
        depth: u32,
        lines: u32,
    ) -> Result<Vec<EvaluationLine>, EngineError> {
        let lines = lines.max(1);
        if lines != self.multipv {
            self.send(&GuiCommand::set_option("MultiPV", lines)).await?;
            self.multipv = lines;
        }
        self.send(&position.command()).await?;
        self.send(&GuiCommand::Go(GoOptions::depth(depth))).await?;

        // Latest exact line per multipv rank.
        let mut ranked: BTreeMap<u32, EvaluationLine> = BTreeMap::new();
        loop {
            match EngineMessage::parse(&self.read_line().await?) {
                EngineMessage::Info(info) => {
                    if info.bound != Bound::Exact || info.rank() > lines {
                        continue;
                    }
                    if let (Some(depth), Some(score)) = (info.depth, info.score) {
                        let rank = info.rank();
                        ranked.insert(
                            rank,
                            EvaluationLine {
                                depth,
                                evaluation: score.into(),
                                pv: info.pv,
                            },
                        );
                    }
                }
                EngineMessage::BestMove { .. } => break,
                _ => {}
            }
        }
        Ok(ranked.into_values().collect())
    }
}

/// Marks the session unusable unless disarmed. Covers both errors and
/// futures dropped before completion.
struct PoisonGuard<'a> {
    usable: &'a AtomicBool,
    armed: bool,
}

impl<'a> PoisonGuard<'a> {
    fn new(usable: &'a AtomicBool) -> Self {
        Self {
            usable,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PoisonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.usable.store(false, Ordering::SeqCst);
        }
    }
}

/// One live UCI engine process.
///
/// Calls are serialised: concurrent callers of [`evaluate`](Self::evaluate)
/// wait for each other. The process is killed when the session is dropped.
pub struct EngineSession {
    /// The engine's name (reported via UCI id).
    name: String,
    io: Mutex<EngineIo>,
    child: Mutex<Option<Child>>,
    usable: AtomicBool,
    timeout: Duration,
}

impl EngineSession {
    /// Spawns the engine and performs the UCI handshake.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable doesn't exist
    /// - `EngineError::SpawnError` if the process fails to start
    /// - `EngineError::Timeout` if the handshake takes longer than `options.timeout`
    /// - any I/O or protocol error raised during the handshake
    pub async fn open(path: &str, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(&options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("stdout unavailable".to_string()))?;
        let mut io = EngineIo {
            stdin,
            lines: BufReader::new(stdout).lines(),
            multipv: 1,
        };

        let name = match timeout(options.timeout, io.handshake(options)).await {
            Ok(result) => result?,
            Err(_) => return Err(EngineError::Timeout(options.timeout)),
        };
        info!(engine = %name, path, threads = options.threads, "engine ready");

        Ok(Self {
            name,
            io: Mutex::new(io),
            child: Mutex::new(Some(child)),
            usable: AtomicBool::new(true),
            timeout: options.timeout,
        })
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false once the session has failed or been closed.
    pub fn is_usable(&self) -> bool {
        self.usable.load(Ordering::SeqCst)
    }

    /// Tells the engine a new game starts and waits until it is ready.
    pub async fn new_game(&self) -> Result<(), EngineError> {
        let mut io = self.acquire().await?;
        let guard = PoisonGuard::new(&self.usable);
        let result = timeout(self.timeout, async {
            io.send(&GuiCommand::UciNewGame).await?;
            io.sync().await
        })
        .await;
        self.settle(guard, result)
    }

    /// Searches `position` to `depth` and returns up to `lines` ranked lines,
    /// best first.
    ///
    /// Only exact scores are kept; `lowerbound`/`upperbound` reports are
    /// ignored. A position with no legal moves yields whatever the engine
    /// reports for it (typically a single depth-0 line), possibly nothing.
    ///
    /// # Errors
    ///
    /// Fails if the session is unusable, the engine exits, I/O fails, or no
    /// `bestmove` arrives within the timeout. Any failure leaves the session
    /// unusable.
    pub async fn evaluate(
        &self,
        position: &SearchPosition,
        depth: u32,
        lines: u32,
    ) -> Result<Vec<EvaluationLine>, EngineError> {
        let mut io = self.acquire().await?;
        let guard = PoisonGuard::new(&self.usable);
        let result = timeout(self.timeout, io.search(position, depth, lines)).await;
        self.settle(guard, result)
    }

    /// Terminates the engine: `quit`, a short grace period, then kill.
    ///
    /// Safe to call while another task is inside [`evaluate`](Self::evaluate);
    /// that call then fails. Calling it again is a no-op.
    pub async fn close(&self) {
        self.usable.store(false, Ordering::SeqCst);
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        if let Ok(mut io) = self.io.try_lock() {
            let exited = timeout(QUIT_GRACE, async {
                io.send(&GuiCommand::Quit).await?;
                Ok::<_, EngineError>(child.wait().await?)
            })
            .await;
            if let Ok(Ok(status)) = exited {
                debug!(engine = %self.name, %status, "engine exited");
                return;
            }
        }

        match child.kill().await {
            Ok(()) => debug!(engine = %self.name, "engine killed"),
            Err(e) => warn!(engine = %self.name, error = %e, "failed to kill engine"),
        }
    }

    async fn acquire(&self) -> Result<MutexGuard<'_, EngineIo>, EngineError> {
        if !self.is_usable() {
            return Err(EngineError::Unusable);
        }
        let io = self.io.lock().await;
        // Closed or failed while we were waiting.
        if !self.is_usable() {
            return Err(EngineError::Unusable);
        }
        Ok(io)
    }

    fn settle<T>(
        &self,
        guard: PoisonGuard<'_>,
        result: Result<Result<T, EngineError>, Elapsed>,
    ) -> Result<T, EngineError> {
        match result {
            Ok(Ok(value)) => {
                guard.disarm();
                Ok(value)
            }
            Ok(Err(e)) => {
                warn!(engine = %self.name, error = %e, "engine session failed");
                Err(e)
            }
            Err(_) => {
                warn!(engine = %self.name, timeout = ?self.timeout, "engine timed out");
                Err(EngineError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("name", &self.name)
            .field("usable", &self.is_usable())
            .field("timeout", &self.timeout)
            .finish()
    }
}

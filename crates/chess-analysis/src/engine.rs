//! UCI engine driver for position analysis.
//!
//! [`EngineSession`] holds the protocol state machine over any line
//! transport; [`AnalysisEngine`] binds a session to an engine subprocess
//! and owns that process until it is dropped.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace, warn};
use uci::{EngineMessage, GuiCommand, SearchLimit, UciConnection, UciError};

use crate::evaluation::{Evaluation, EvaluationRecord};

/// How long a process gets to exit after `quit` before it is killed.
pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
/// Poll interval while waiting for the process to exit.
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[source] std::io::Error),
    /// The engine stopped answering or answered something unusable.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    /// Reading from or writing to the engine failed.
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True when the executable itself is missing, as opposed to an engine
    /// that started but could not be used.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<UciError> for EngineError {
    fn from(err: UciError) -> Self {
        match err {
            UciError::IoError(e) => EngineError::Io(e),
            UciError::ParseError(msg) => EngineError::Unavailable(msg),
        }
    }
}

/// Anything that can evaluate the position reached after a move prefix.
pub trait PositionEvaluator {
    /// Evaluate the position after `moves` from the start position.
    fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<EvaluationRecord, EngineError>;
}

/// Locate an engine executable.
///
/// A path with directory components must point at an existing file. A bare
/// name is looked up in the current directory, then on `PATH`.
pub fn resolve_engine(engine: &str) -> Result<PathBuf, EngineError> {
    let path = Path::new(engine);
    if engine.trim().is_empty() {
        return Err(EngineError::NotFound(engine.to_string()));
    }

    if path.components().count() > 1 || path.is_absolute() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(EngineError::NotFound(engine.to_string()))
        };
    }

    if path.is_file() {
        return Ok(Path::new(".").join(path));
    }

    std::env::var_os("PATH")
        .into_iter()
        .flat_map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .flat_map(|dir| {
            let plain = dir.join(engine);
            let with_suffix = dir.join(format!("{}{}", engine, std::env::consts::EXE_SUFFIX));
            [plain, with_suffix]
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| EngineError::NotFound(engine.to_string()))
}

/// UCI conversation with one engine over a line transport.
///
/// Requests are strictly sequential: every call runs to completion before
/// the next command is written.
pub struct EngineSession<R: BufRead, W: Write> {
    conn: UciConnection<R, W>,
    name: String,
}

impl<R: BufRead, W: Write> EngineSession<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            conn: UciConnection::new(reader, writer),
            name: String::new(),
        }
    }

    /// Returns the engine's name as reported via `id name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the underlying writer.
    pub fn writer(&self) -> &W {
        self.conn.writer()
    }

    /// Send `uci`, wait for `uciok`, then send `ucinewgame`.
    pub fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci)?;

        loop {
            match self.next_message("uciok")? {
                EngineMessage::Id {
                    name: Some(name), ..
                } => self.name = name,
                EngineMessage::UciOk => break,
                _ => {}
            }
        }

        if self.name.is_empty() {
            self.name = "Unknown Engine".to_string();
        }
        debug!(engine = %self.name, "UCI handshake complete");

        self.send(&GuiCommand::UciNewGame)
    }

    /// Send `isready` and block until `readyok`.
    pub fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady)?;
        loop {
            if let EngineMessage::ReadyOk = self.next_message("readyok")? {
                return Ok(());
            }
        }
    }

    /// Evaluate the position after `moves`.
    ///
    /// The record comes from the last scored `info` line printed before
    /// `bestmove`.
    pub fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<EvaluationRecord, EngineError> {
        self.wait_ready()?;
        self.send(&GuiCommand::startpos(moves))?;
        self.wait_ready()?;
        self.send(&GuiCommand::Go(limit))?;

        let mut last_scored = None;
        let best_move = loop {
            match self.next_message("bestmove")? {
                EngineMessage::Info(info) if info.score.is_some() => last_scored = Some(info),
                EngineMessage::BestMove { mv, .. } => break mv,
                _ => {}
            }
        };

        let info = last_scored.ok_or_else(|| {
            EngineError::Unavailable(format!("bestmove {} arrived without a score", best_move))
        })?;
        let score = info.score.ok_or_else(|| {
            EngineError::Unavailable("scored info line lost its score".to_string())
        })?;

        Ok(EvaluationRecord {
            evaluation: Evaluation::from(score),
            best_move: Some(best_move),
            depth: info.depth.unwrap_or(0),
            nodes: info.nodes,
        })
    }

    /// Send `quit`. No answer is expected.
    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Quit)
    }

    fn send(&mut self, cmd: &GuiCommand) -> Result<(), EngineError> {
        trace!(cmd = %cmd, "engine <");
        self.conn.send(cmd)?;
        Ok(())
    }

    /// Next message, or `Unavailable` if the stream ends while `expecting`.
    fn next_message(&mut self, expecting: &str) -> Result<EngineMessage, EngineError> {
        match self.conn.read_line()? {
            Some(line) => {
                trace!(line = %line, "engine >");
                Ok(EngineMessage::parse(&line))
            }
            None => Err(EngineError::Unavailable(format!(
                "engine closed its output while waiting for {}",
                expecting
            ))),
        }
    }
}

impl<R: BufRead, W: Write> PositionEvaluator for EngineSession<R, W> {
    fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<EvaluationRecord, EngineError> {
        EngineSession::evaluate(self, moves, limit)
    }
}

/// Wrapper for UCI-compatible analysis engines like Stockfish.
///
/// The subprocess lives exactly as long as this value. Dropping it sends
/// `quit`, waits up to [`ENGINE_QUIT_TIMEOUT`], and kills the process if it
/// is still running.
pub struct AnalysisEngine {
    /// The engine process handle.
    process: Child,
    session: EngineSession<BufReader<ChildStdout>, ChildStdin>,
    closed: bool,
}

impl AnalysisEngine {
    /// Resolve, spawn and handshake an engine.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the engine cannot be located
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::Unavailable` if the handshake never completes
    pub fn new(engine: &str) -> Result<Self, EngineError> {
        let path = resolve_engine(engine)?;
        Self::spawn(&path)
    }

    /// Spawn an already resolved engine path and run the handshake.
    pub fn spawn(path: &Path) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    EngineError::NotFound(path.display().to_string())
                }
                _ => EngineError::SpawnError(e),
            })?;
        debug!(path = %path.display(), pid = process.id(), "engine spawned");

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(EngineError::Unavailable(
                    "engine pipes were not captured".to_string(),
                ));
            }
        };

        let mut engine = Self {
            process,
            session: EngineSession::new(BufReader::new(stdout), stdin),
            closed: false,
        };
        // On failure `engine` is dropped here, which reaps the process.
        engine.session.handshake()?;
        Ok(engine)
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        self.session.name()
    }

    /// Analyze the position reached after `moves` from the start position.
    pub fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<EvaluationRecord, EngineError> {
        self.session.evaluate(moves, limit)
    }

    /// Shut the engine down now instead of at drop time.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = self.session.quit();
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.process.try_wait() {
                debug!(%status, "engine exited");
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }

        warn!(pid = self.process.id(), "engine ignored quit, killing it");
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

impl PositionEvaluator for AnalysisEngine {
    fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<EvaluationRecord, EngineError> {
        AnalysisEngine::evaluate(self, moves, limit)
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! UCI (Universal Chess Interface) protocol vocabulary for the GUI side.
//!
//! This crate provides the commands an analysis driver sends to an engine
//! and parsing for the messages the engine answers with.
//!
//! # Commands sent
//!
//! - `uci` / `uciok` - Initialize engine, get id and options
//! - `ucinewgame` - Reset game-specific state
//! - `isready` / `readyok` - Synchronization
//! - `position startpos [moves <move>...]` - Set position
//! - `go movetime <ms> | depth <d> | nodes <n>` - Start search
//! - `quit` - Exit engine
//!
//! # Messages parsed
//!
//! - `id name <name>`, `uciok`, `readyok`
//! - `info ... score cp <n> | score mate <n> ...`
//! - `bestmove <move> [ponder <move>]`

mod command;
mod info;

pub use command::{GuiCommand, SearchLimit};
pub use info::{EngineInfo, Score};

use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found.
    BestMove { mv: String, ponder: Option<String> },
    /// Anything else (option declarations, banners, copy protection...).
    Other(String),
}

impl EngineMessage {
    /// Classify one line of engine output.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("uciok") if parts.next().is_none() => EngineMessage::UciOk,
            Some("readyok") if parts.next().is_none() => EngineMessage::ReadyOk,
            Some("id") => match parts.next() {
                Some("name") => EngineMessage::Id {
                    name: Some(rest_after(line, "name")),
                    author: None,
                },
                Some("author") => EngineMessage::Id {
                    name: None,
                    author: Some(rest_after(line, "author")),
                },
                _ => EngineMessage::Other(line.to_string()),
            },
            Some("bestmove") => match parts.next() {
                Some(mv) => {
                    let ponder = match parts.next() {
                        Some("ponder") => parts.next().map(str::to_string),
                        _ => None,
                    };
                    EngineMessage::BestMove {
                        mv: mv.to_string(),
                        ponder,
                    }
                }
                None => EngineMessage::Other(line.to_string()),
            },
            Some("info") => match EngineInfo::parse(line) {
                Some(info) => EngineMessage::Info(info),
                None => EngineMessage::Other(line.to_string()),
            },
            _ => EngineMessage::Other(line.to_string()),
        }
    }
}

fn rest_after(line: &str, keyword: &str) -> String {
    line.split_once(keyword)
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

/// Line transport to an engine: commands out, raw lines in.
///
/// Every command is written as one line and flushed immediately.
pub struct UciConnection<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> UciConnection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Send a command to the engine.
    pub fn send(&mut self, cmd: &GuiCommand) -> Result<(), UciError> {
        writeln!(self.writer, "{}", cmd.to_uci())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read the next line from the engine, trimmed.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub fn read_line(&mut self) -> Result<Option<String>, UciError> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Borrow the underlying writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }
}

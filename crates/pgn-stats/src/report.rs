//! Final report output, as text lines or JSON.

use chess_analysis::ReportRow;
use serde::Serialize;
use std::io::Write;

/// Ranked per-player statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Games whose evaluations went into the statistics.
    pub games: usize,
    pub players: Vec<ReportRow>,
}

impl Report {
    /// One line per player, best represented first.
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for row in &self.players {
            writeln!(out, "{}", row)?;
        }
        Ok(())
    }

    /// Pretty-printed JSON document.
    ///
    /// # Format
    ///
    /// ```json
    /// {
    ///   "games": 12,
    ///   "players": [
    ///     {
    ///       "rank": 1,
    ///       "name": "Carlsen, Magnus",
    ///       "games": 12,
    ///       "moves": 410,
    ///       "blunders": 1,
    ///       "mistakes": 4,
    ///       "inaccuracies": 11,
    ///       "average_loss": 18.7
    ///     }
    ///   ]
    /// }
    /// ```
    pub fn write_json<W: Write>(&self, out: &mut W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out).map_err(serde_json::Error::io)
    }
}

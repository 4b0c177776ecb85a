//! Commands sent from the GUI side to an engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Tell the engine the next search belongs to a different game.
    UciNewGame,
    /// Check if engine is ready.
    IsReady,
    /// Set up the standard start position plus moves.
    Position { moves: Vec<String> },
    /// Start calculating with a single stopping condition.
    Go(SearchLimit),
    /// Quit the engine.
    Quit,
}

impl GuiCommand {
    /// Position command for the standard start position followed by `moves`.
    pub fn startpos(moves: &[String]) -> Self {
        GuiCommand::Position {
            moves: moves.to_vec(),
        }
    }

    /// Format the command as a single protocol line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::Position { moves } => {
                let mut line = "position startpos".to_string();
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(limit) => format!("go {}", limit),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// Stopping condition for one `go` search.
///
/// Exactly one limit is active per search. The textual form is the `go`
/// argument itself, e.g. `movetime 500`, `depth 12` or `nodes 5000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SearchLimit {
    /// Search for exactly this many milliseconds.
    MoveTime(u64),
    /// Search to this depth in plies.
    Depth(u32),
    /// Search this many nodes.
    Nodes(u64),
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::MoveTime(500)
    }
}

impl fmt::Display for SearchLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchLimit::MoveTime(ms) => write!(f, "movetime {}", ms),
            SearchLimit::Depth(d) => write!(f, "depth {}", d),
            SearchLimit::Nodes(n) => write!(f, "nodes {}", n),
        }
    }
}

impl FromStr for SearchLimit {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(kind), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(UciError::ParseError(format!(
                "Expected '<movetime|depth|nodes> <value>', got '{}'",
                s.trim()
            )));
        };

        let bad_value = || UciError::ParseError(format!("Invalid {} value '{}'", kind, value));
        match kind {
            "movetime" => value.parse().map(SearchLimit::MoveTime).map_err(|_| bad_value()),
            "depth" => value.parse().map(SearchLimit::Depth).map_err(|_| bad_value()),
            "nodes" => value.parse().map(SearchLimit::Nodes).map_err(|_| bad_value()),
            other => Err(UciError::ParseError(format!(
                "Unknown search limit '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SearchLimit {
    type Error = UciError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchLimit> for String {
    fn from(limit: SearchLimit) -> Self {
        limit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_simple_commands() {
        assert_eq!(GuiCommand::Uci.to_uci(), "uci");
        assert_eq!(GuiCommand::UciNewGame.to_uci(), "ucinewgame");
        assert_eq!(GuiCommand::IsReady.to_uci(), "isready");
        assert_eq!(GuiCommand::Quit.to_uci(), "quit");
    }

    #[test]
    fn format_position_startpos() {
        assert_eq!(GuiCommand::startpos(&[]).to_uci(), "position startpos");
    }

    #[test]
    fn format_position_startpos_with_moves() {
        let moves = vec!["e2e4".to_string(), "e7e5".to_string()];
        assert_eq!(
            GuiCommand::startpos(&moves).to_uci(),
            "position startpos moves e2e4 e7e5"
        );
    }

    #[test]
    fn format_go() {
        assert_eq!(GuiCommand::Go(SearchLimit::MoveTime(500)).to_uci(), "go movetime 500");
        assert_eq!(GuiCommand::Go(SearchLimit::Depth(10)).to_uci(), "go depth 10");
        assert_eq!(GuiCommand::Go(SearchLimit::Nodes(5000)).to_uci(), "go nodes 5000");
    }

    #[test]
    fn parse_search_limits() {
        assert_eq!("movetime 500".parse::<SearchLimit>().unwrap(), SearchLimit::MoveTime(500));
        assert_eq!("depth 10".parse::<SearchLimit>().unwrap(), SearchLimit::Depth(10));
        assert_eq!("  nodes 5000 ".parse::<SearchLimit>().unwrap(), SearchLimit::Nodes(5000));
    }

    #[test]
    fn parse_search_limit_rejects_garbage() {
        assert!("infinite".parse::<SearchLimit>().is_err());
        assert!("depth".parse::<SearchLimit>().is_err());
        assert!("depth ten".parse::<SearchLimit>().is_err());
        assert!("wtime 1000".parse::<SearchLimit>().is_err());
        assert!("depth 10 nodes 5".parse::<SearchLimit>().is_err());
    }

    #[test]
    fn search_limit_default_is_half_second() {
        assert_eq!(SearchLimit::default(), SearchLimit::MoveTime(500));
    }

    #[test]
    fn search_limit_serde_uses_text_form() {
        let json = serde_json::to_string(&SearchLimit::Depth(12)).unwrap();
        assert_eq!(json, "\"depth 12\"");

        let limit: SearchLimit = serde_json::from_str("\"nodes 100\"").unwrap();
        assert_eq!(limit, SearchLimit::Nodes(100));

        assert!(serde_json::from_str::<SearchLimit>("\"ponder\"").is_err());
    }
}

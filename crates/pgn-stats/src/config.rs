//! Settings file loading for pgn-stats.
//!
//! This module provides the [`Settings`] read from a TOML file
//! (`pgn-stats.toml` by default) and the checks run on them before any
//! game is read.

use chess_analysis::{StatsConfig, Thresholds};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uci::SearchLimit;

/// Errors that can occur when loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file from disk.
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse the settings file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// The settings parsed but make no sense together.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything a run needs to know.
///
/// Every field has a default except `pgn_input`, which validation requires.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Engine executable, as a path or a name looked up on `PATH`.
    /// Defaults to "stockfish".
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Search budget per position, e.g. "movetime 500", "depth 18" or
    /// "nodes 100000". Defaults to "movetime 500".
    #[serde(default)]
    pub level: SearchLimit,
    /// Number of engines analyzing in parallel. Defaults to 1.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_blunder")]
    pub blunder: i32,
    #[serde(default = "default_mistake")]
    pub mistake: i32,
    #[serde(default = "default_inaccuracy")]
    pub inaccuracy: i32,
    /// Full moves at the start of each game left out of the statistics.
    #[serde(default)]
    pub skip_first_moves: usize,
    /// Case-insensitive substring a player name must contain.
    #[serde(default)]
    pub player_filter: String,
    /// Read evaluations from the input's annotations instead of running an
    /// engine.
    #[serde(default)]
    pub read_values_from_pgn_input: bool,
    #[serde(default)]
    pub pgn_input: PathBuf,
    /// Where to write the engine-annotated games, if anywhere.
    #[serde(default)]
    pub pgn_output: Option<PathBuf>,
    /// First game to analyze, 1-based. Unset or non-positive means the
    /// first game.
    #[serde(default)]
    pub first_game: Option<i64>,
    /// Last game to analyze, inclusive. Unset or non-positive means the
    /// last game.
    #[serde(default)]
    pub last_game: Option<i64>,
}

fn default_engine() -> String {
    "stockfish".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_blunder() -> i32 {
    300
}

fn default_mistake() -> i32 {
    100
}

fn default_inaccuracy() -> i32 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            level: SearchLimit::default(),
            workers: default_workers(),
            blunder: default_blunder(),
            mistake: default_mistake(),
            inaccuracy: default_inaccuracy(),
            skip_first_moves: 0,
            player_filter: String::new(),
            read_values_from_pgn_input: false,
            pgn_input: PathBuf::new(),
            pgn_output: None,
            first_game: None,
            last_game: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from [`Self::default_path()`].
    ///
    /// An explicitly given file must exist. The default file is optional;
    /// without it every setting takes its default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns `pgn-stats.toml` in the current working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("pgn-stats.toml")
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pgn_input.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("pgn_input is required".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.inaccuracy < 0 || self.inaccuracy > self.mistake || self.mistake > self.blunder {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy 0 <= inaccuracy ({}) <= mistake ({}) <= blunder ({})",
                self.inaccuracy, self.mistake, self.blunder
            )));
        }
        let range = self.game_range();
        if let (Some(first), Some(last)) = (range.first, range.last) {
            if first > last {
                return Err(ConfigError::Invalid(format!(
                    "first_game ({}) is after last_game ({})",
                    first, last
                )));
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            blunder: self.blunder,
            mistake: self.mistake,
            inaccuracy: self.inaccuracy,
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            thresholds: self.thresholds(),
            skip_first_moves: self.skip_first_moves,
        }
    }

    pub fn game_range(&self) -> GameRange {
        let positive = |n: Option<i64>| {
            n.filter(|&n| n > 0)
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        };
        GameRange {
            first: positive(self.first_game),
            last: positive(self.last_game),
        }
    }

    /// True when annotated games should be written to `pgn_output`.
    pub fn writes_output(&self) -> bool {
        !self.read_values_from_pgn_input
            && self
                .pgn_output
                .as_ref()
                .is_some_and(|out| !out.as_os_str().is_empty() && *out != self.pgn_input)
    }
}

/// 1-based inclusive range of selected games; `None` ends are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameRange {
    pub first: Option<usize>,
    pub last: Option<usize>,
}

impl GameRange {
    pub fn contains(&self, number: usize) -> bool {
        self.first.map_or(true, |first| number >= first)
            && self.last.map_or(true, |last| number <= last)
    }
}

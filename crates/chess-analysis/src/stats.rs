//! Per-player accumulation of loss tallies across a batch of games.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::evaluation::GameEvaluations;
use crate::game::Game;
use crate::quality::{side_tally, LossTally, Side, Thresholds};

/// Settings that shape how a game's evaluations become tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsConfig {
    pub thresholds: Thresholds,
    /// Full moves at the start of every game that are not counted.
    pub skip_first_moves: usize,
}

/// Running tallies keyed by player name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct PlayerStats {
    entries: Vec<(String, LossTally)>,
    index: HashMap<String, usize>,
}

impl PlayerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tally into `player`'s accumulator, creating it if needed.
    pub fn record(&mut self, player: &str, tally: &LossTally) {
        match self.index.get(player) {
            Some(&i) => self.entries[i].1.merge(tally),
            None => {
                self.index.insert(player.to_string(), self.entries.len());
                self.entries.push((player.to_string(), tally.clone()));
            }
        }
    }

    /// Add both sides of one analyzed game.
    pub fn add_game(&mut self, game: &Game, evaluations: &GameEvaluations, config: &StatsConfig) {
        let sides = [(Side::White, game.white()), (Side::Black, game.black())];
        for (side, player) in sides {
            if let Some(tally) = side_tally(
                evaluations,
                side,
                config.skip_first_moves,
                &config.thresholds,
            ) {
                self.record(player, &tally);
            }
        }
    }

    pub fn get(&self, player: &str) -> Option<&LossTally> {
        self.index.get(player).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranked rows: most games first, ties in first-seen order.
    ///
    /// Only players whose name contains `filter` (ignoring case) are listed;
    /// ranks are numbered after filtering.
    pub fn report(&self, filter: &str) -> Vec<ReportRow> {
        let needle = filter.to_lowercase();
        let mut rows: Vec<&(String, LossTally)> = self
            .entries
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .collect();
        // `sort_by` is stable.
        rows.sort_by(|a, b| b.1.games.cmp(&a.1.games));

        rows.into_iter()
            .enumerate()
            .map(|(i, (name, tally))| ReportRow {
                rank: i + 1,
                name: name.clone(),
                games: tally.games,
                moves: tally.moves,
                blunders: tally.blunders,
                mistakes: tally.mistakes,
                inaccuracies: tally.inaccuracies,
                average_loss: tally.average_loss,
            })
            .collect()
    }
}

/// Build per-player stats for a batch.
///
/// `games` and `evaluations` are paired by position; extra entries on either
/// side are ignored.
pub fn aggregate(games: &[Game], evaluations: &[GameEvaluations], config: &StatsConfig) -> PlayerStats {
    let mut stats = PlayerStats::new();
    for (game, evals) in games.iter().zip(evaluations) {
        stats.add_game(game, evals, config);
    }
    stats
}

/// One line of the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub rank: usize,
    pub name: String,
    pub games: u32,
    pub moves: u32,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub average_loss: f64,
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {}. Games: {}, Moves: {}, Blunders: {}, Mistakes: {}, Inaccuracies: {}, Average loss: {:.1} centipawns",
            self.rank,
            self.name,
            self.games,
            self.moves,
            self.blunders,
            self.mistakes,
            self.inaccuracies,
            self.average_loss
        )
    }
}

//! Per-game analysis.
//!
//! This module provides the [`GameAnalyzer`], which replays a game one ply at
//! a time and collects an engine evaluation for every position reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uci::SearchLimit;

use crate::engine::{AnalysisEngine, EngineError, PositionEvaluator};
use crate::evaluation::{Evaluation, GameEvaluations};
use crate::game::Game;

/// Errors that can occur during game analysis.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error from the analysis engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// The analysis was cancelled from outside between two plies.
    #[error("Analysis aborted")]
    Aborted,
}

/// Replays games against one evaluator.
///
/// The evaluator is held for the analyzer's whole lifetime, so every game it
/// analyzes talks to the same engine process.
pub struct GameAnalyzer<E: PositionEvaluator = AnalysisEngine> {
    evaluator: E,
    limit: SearchLimit,
    abort: Option<Arc<AtomicBool>>,
}

impl GameAnalyzer<AnalysisEngine> {
    /// Creates a new game analyzer backed by a freshly spawned engine.
    ///
    /// # Arguments
    ///
    /// * `engine` - Path or name of the UCI engine executable.
    /// * `limit` - Search budget used for every position.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be found or started.
    pub fn new(engine: &str, limit: SearchLimit) -> Result<Self, AnalyzerError> {
        let engine = AnalysisEngine::new(engine)?;
        Ok(Self::with_evaluator(engine, limit))
    }
}

impl<E: PositionEvaluator> GameAnalyzer<E> {
    pub fn with_evaluator(evaluator: E, limit: SearchLimit) -> Self {
        Self {
            evaluator,
            limit,
            abort: None,
        }
    }

    /// Stop between plies once `flag` is set.
    pub fn set_abort_flag(&mut self, flag: Arc<AtomicBool>) {
        self.abort = Some(flag);
    }

    /// Gives the evaluator back, e.g. to shut an engine down early.
    pub fn into_evaluator(self) -> E {
        self.evaluator
    }

    /// Evaluates the start position and the position after every ply.
    ///
    /// The result has one entry per position, `moves.len() + 1` in total,
    /// unless the last position is reported as already mated (`mate 0`), in
    /// which case that entry is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Engine`] on the first failed request and
    /// [`AnalyzerError::Aborted`] if the abort flag was raised.
    pub fn analyze_game(&mut self, game: &Game) -> Result<GameEvaluations, AnalyzerError> {
        let mut evaluations = GameEvaluations::with_capacity(game.moves.len() + 1);

        for ply in 0..=game.moves.len() {
            if self.is_aborted() {
                return Err(AnalyzerError::Aborted);
            }
            let record = self.evaluator.evaluate(&game.moves[..ply], self.limit)?;
            evaluations.push(record);
        }

        if let Some(last) = evaluations.last() {
            if last.evaluation == Evaluation::Mate(0) {
                evaluations.pop();
            }
        }

        debug!(
            white = game.white(),
            black = game.black(),
            plies = game.moves.len(),
            "game analyzed"
        );
        Ok(evaluations)
    }

    fn is_aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

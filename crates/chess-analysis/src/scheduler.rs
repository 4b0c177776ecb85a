//! Parallel analysis of a batch of games.
//!
//! The [`Scheduler`] runs up to `workers` threads, each owning one engine for
//! its whole life. Workers pull game indices from a shared queue and write
//! their results into a buffer indexed by the game's position, so output
//! order always matches input order regardless of which worker finished
//! first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use thiserror::Error;
use tracing::{debug, info};
use uci::SearchLimit;

use crate::analyzer::{AnalyzerError, GameAnalyzer};
use crate::engine::{resolve_engine, AnalysisEngine, EngineError, PositionEvaluator};
use crate::evaluation::GameEvaluations;
use crate::game::Game;

/// Sent once per finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Errors that abort a batch.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The first engine failure seen by any worker.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A worker thread panicked.
    #[error("Analysis worker panicked")]
    WorkerPanicked,
}

/// Raises the abort flag if the owning thread unwinds.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

pub struct Scheduler {
    workers: usize,
    limit: SearchLimit,
    progress: Option<Sender<Progress>>,
}

impl Scheduler {
    /// A scheduler with `workers` engines (at least one).
    pub fn new(workers: usize, limit: SearchLimit) -> Self {
        Self {
            workers: workers.max(1),
            limit,
            progress: None,
        }
    }

    /// Report a [`Progress`] message on `tx` after every game.
    pub fn with_progress(mut self, tx: Sender<Progress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Analyze `games` with copies of the engine at `engine`.
    ///
    /// The engine is located once up front, so a missing executable fails
    /// before any thread starts.
    pub fn run(&self, engine: &str, games: &[Game]) -> Result<Vec<GameEvaluations>, SchedulerError> {
        let path = resolve_engine(engine)?;
        self.run_with(games, || AnalysisEngine::spawn(&path))
    }

    /// Analyze `games` with evaluators built by `factory`, one per worker.
    ///
    /// # Errors
    ///
    /// If any evaluator cannot be created or fails mid-game, the remaining
    /// workers stop at their next ply and the first error is returned. No
    /// partial results are returned.
    pub fn run_with<E, F>(&self, games: &[Game], factory: F) -> Result<Vec<GameEvaluations>, SchedulerError>
    where
        E: PositionEvaluator,
        F: Fn() -> Result<E, EngineError> + Sync,
    {
        let total = games.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.min(total);
        let limit = self.limit;
        info!(games = total, workers, %limit, "starting analysis");

        let queue = Mutex::new((0..total).collect::<VecDeque<usize>>());
        let results: Mutex<Vec<Option<GameEvaluations>>> = Mutex::new(vec![None; total]);
        let first_error: Mutex<Option<EngineError>> = Mutex::new(None);
        let abort = Arc::new(AtomicBool::new(false));
        let completed = AtomicUsize::new(0);

        let fail = |e: EngineError| {
            let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(e);
            }
        };

        let worker = |id: usize, progress: Option<Sender<Progress>>| {
            let _guard = AbortOnPanic(&abort);

            let evaluator = match factory() {
                Ok(evaluator) => evaluator,
                Err(e) => {
                    abort.store(true, Ordering::SeqCst);
                    fail(e);
                    return;
                }
            };
            let mut analyzer = GameAnalyzer::with_evaluator(evaluator, limit);
            analyzer.set_abort_flag(Arc::clone(&abort));
            debug!(worker = id, "worker started");

            loop {
                if abort.load(Ordering::SeqCst) {
                    break;
                }
                let next = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(index) = next else {
                    break;
                };

                match analyzer.analyze_game(&games[index]) {
                    Ok(evaluations) => {
                        results.lock().unwrap_or_else(PoisonError::into_inner)[index] =
                            Some(evaluations);
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(tx) = &progress {
                            let _ = tx.send(Progress {
                                completed: done,
                                total,
                            });
                        }
                    }
                    Err(AnalyzerError::Aborted) => break,
                    Err(AnalyzerError::Engine(e)) => {
                        abort.store(true, Ordering::SeqCst);
                        // Shut this worker's engine down before reporting.
                        drop(analyzer);
                        debug!(worker = id, game = index, error = %e, "worker failed");
                        fail(e);
                        return;
                    }
                }
            }
            debug!(worker = id, "worker finished");
        };

        let panicked = thread::scope(|s| {
            let worker = &worker;
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let progress = self.progress.clone();
                    s.spawn(move || worker(id, progress))
                })
                .collect();
            handles
                .into_iter()
                .fold(false, |panicked, handle| handle.join().is_err() || panicked)
        });

        if let Some(e) = first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(SchedulerError::Engine(e));
        }

        // Without an engine error only a panic raises the abort flag, so a
        // game left without a result belongs to an unwound worker.
        let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        match results.into_iter().collect::<Option<Vec<_>>>() {
            Some(all) if !panicked => {
                info!(games = total, "analysis complete");
                Ok(all)
            }
            _ => Err(SchedulerError::WorkerPanicked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{Evaluation, EvaluationRecord};
    use crate::stats::{aggregate, StatsConfig};
    use std::sync::mpsc;

    /// Deterministic scores derived from the move list.
    #[derive(Default)]
    struct ScriptedEvaluator {
        fail_on: Option<String>,
        panic_on: Option<String>,
    }

    impl PositionEvaluator for ScriptedEvaluator {
        fn evaluate(
            &mut self,
            moves: &[String],
            _limit: SearchLimit,
        ) -> Result<EvaluationRecord, EngineError> {
            let last = moves.last().map(String::as_str).unwrap_or("");
            if self.fail_on.as_deref() == Some(last) {
                return Err(EngineError::Unavailable("scripted failure".to_string()));
            }
            if self.panic_on.as_deref() == Some(last) {
                panic!("scripted panic");
            }
            let seed: i32 = last.bytes().map(i32::from).sum::<i32>() + moves.len() as i32 * 31;
            Ok(EvaluationRecord::centipawns(seed % 400 - 200))
        }
    }

    fn batch(size: usize) -> Vec<Game> {
        let pool = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6"];
        (0..size)
            .map(|i| {
                let moves = pool.iter().take(1 + i % pool.len()).map(|m| m.to_string()).collect();
                Game::new(
                    vec![
                        ("White".to_string(), format!("P{}", i % 3)),
                        ("Black".to_string(), format!("P{}", (i + 1) % 3)),
                    ],
                    moves,
                )
            })
            .collect()
    }

    #[test]
    fn test_results_follow_input_order() {
        let games = batch(13);
        let results = Scheduler::new(4, SearchLimit::Depth(1))
            .run_with(&games, || Ok(ScriptedEvaluator::default()))
            .unwrap();

        assert_eq!(results.len(), games.len());
        for (game, evals) in games.iter().zip(&results) {
            assert_eq!(evals.len(), game.moves.len() + 1);
        }
    }

    #[test]
    fn test_empty_batch_spawns_nothing() {
        let results = Scheduler::new(3, SearchLimit::Depth(1))
            .run_with(&[], || -> Result<ScriptedEvaluator, EngineError> {
                panic!("no evaluator should be built")
            })
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_worker_count_does_not_change_numbers() {
        let games = batch(17);
        let config = StatsConfig::default();

        let sequential = Scheduler::new(1, SearchLimit::Depth(1))
            .run_with(&games, || Ok(ScriptedEvaluator::default()))
            .unwrap();
        let parallel = Scheduler::new(4, SearchLimit::Depth(1))
            .run_with(&games, || Ok(ScriptedEvaluator::default()))
            .unwrap();
        assert_eq!(sequential, parallel);

        let a = aggregate(&games, &sequential, &config);
        let b = aggregate(&games, &parallel, &config);
        for row in a.report("") {
            let other = b.get(&row.name).unwrap();
            assert!((row.average_loss - other.average_loss).abs() < 1e-9);
            assert_eq!(row.blunders, other.blunders);
            assert_eq!(row.moves, other.moves);
            assert_eq!(row.games, other.games);
        }
    }

    #[test]
    fn test_progress_reports_every_game() {
        let games = batch(6);
        let (tx, rx) = mpsc::channel();
        Scheduler::new(2, SearchLimit::Depth(1))
            .with_progress(tx)
            .run_with(&games, || Ok(ScriptedEvaluator::default()))
            .unwrap();

        let mut seen: Vec<Progress> = rx.try_iter().collect();
        seen.sort_by_key(|p| p.completed);
        assert_eq!(seen.len(), 6);
        assert_eq!(seen.last(), Some(&Progress { completed: 6, total: 6 }));
    }

    #[test]
    fn test_engine_failure_aborts_batch() {
        let games = batch(10);
        let err = Scheduler::new(3, SearchLimit::Depth(1))
            .run_with(&games, || {
                Ok(ScriptedEvaluator {
                    fail_on: Some("f1b5".to_string()),
                    ..Default::default()
                })
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Engine(EngineError::Unavailable(_))));
    }

    #[test]
    fn test_factory_failure_aborts_batch() {
        let games = batch(4);
        let err = Scheduler::new(2, SearchLimit::Depth(1))
            .run_with(&games, || -> Result<ScriptedEvaluator, EngineError> {
                Err(EngineError::NotFound("stockfish".to_string()))
            })
            .unwrap_err();
        match err {
            SchedulerError::Engine(e) => assert!(e.is_not_found()),
            other => panic!("Expected engine error, got {:?}", other),
        }
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let games = batch(5);
        let err = Scheduler::new(2, SearchLimit::Depth(1))
            .run_with(&games, || {
                Ok(ScriptedEvaluator {
                    panic_on: Some("b8c6".to_string()),
                    ..Default::default()
                })
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::WorkerPanicked));
    }

    #[test]
    fn test_lone_worker_panic_leaves_no_partial_results() {
        let err = Scheduler::new(1, SearchLimit::Depth(1))
            .run_with(&batch(5), || {
                Ok(ScriptedEvaluator {
                    panic_on: Some("b8c6".to_string()),
                    ..Default::default()
                })
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::WorkerPanicked));
    }

    #[test]
    fn test_run_with_missing_engine() {
        let err = Scheduler::new(1, SearchLimit::Depth(1))
            .run("/nonexistent/engine", &batch(1))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Engine(EngineError::NotFound(_))));
    }

    #[test]
    fn test_scripted_scores_are_centipawns() {
        let mut evaluator = ScriptedEvaluator::default();
        let record = evaluator.evaluate(&[], SearchLimit::Depth(1)).unwrap();
        assert!(matches!(record.evaluation, Evaluation::Centipawns(_)));
    }
}

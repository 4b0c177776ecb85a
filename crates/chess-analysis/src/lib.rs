//! Move-quality statistics from UCI engine analysis.
//!
//! This crate drives UCI engines over a batch of games and turns the
//! evaluations into per-player loss statistics.
//!
//! # Overview
//!
//! - [`AnalysisEngine`] - One engine subprocess speaking UCI
//! - [`GameAnalyzer`] - Evaluates every position of a game with one engine
//! - [`Scheduler`] - Spreads a batch over several engines, keeping input order
//! - [`read_annotated`] - Recovers evaluations from already annotated PGN
//! - [`PlayerStats`] - Per-player blunder, mistake and inaccuracy counts
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{aggregate, Scheduler, StatsConfig};
//! use uci::SearchLimit;
//!
//! let evaluations = Scheduler::new(4, SearchLimit::Depth(18)).run("stockfish", &games)?;
//! let stats = aggregate(&games, &evaluations, &StatsConfig::default());
//! for row in stats.report("") {
//!     println!("{}", row);
//! }
//! ```

pub mod analyzer;
pub mod annotated;
pub mod engine;
pub mod evaluation;
pub mod game;
pub mod quality;
pub mod scheduler;
pub mod stats;

pub use analyzer::{AnalyzerError, GameAnalyzer};
pub use annotated::{read_annotated, MalformedAnnotation};
pub use engine::{AnalysisEngine, EngineError, PositionEvaluator};
pub use evaluation::{Evaluation, EvaluationRecord, GameEvaluations};
pub use game::Game;
pub use quality::{LossTally, MoveQuality, Side, Thresholds};
pub use scheduler::{Progress, Scheduler, SchedulerError};
pub use stats::{aggregate, PlayerStats, ReportRow, StatsConfig};

//! pgn-stats - per-player move-quality statistics for PGN collections.
//!
//! Games are read from a PGN file and either analyzed by a pool of UCI
//! engines or taken from evaluations already annotated in the file. Every
//! move's centipawn loss is classified as an inaccuracy, mistake or blunder
//! and summed per player.
//!
//! # Modules
//!
//! - [`config`] - Settings file loading and validation
//! - [`pgn`] - PGN reading and annotated PGN writing
//! - [`progress`] - Progress bar for engine analysis
//! - [`report`] - Text and JSON report output

pub mod config;
pub mod pgn;
pub mod progress;
pub mod report;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chess_analysis::engine::resolve_engine;
use chess_analysis::{
    aggregate, read_annotated, AnalysisEngine, EngineError, Game, GameEvaluations, Scheduler,
    SchedulerError,
};
use clap::Parser;
use config::{ConfigError, GameRange, Settings};
use pgn::{PgnError, PgnGame};
use report::Report;
use thiserror::Error;
use tracing::info;

#[derive(Parser, Debug, Default)]
#[command(name = "pgn-stats")]
#[command(about = "Per-player blunder, mistake and inaccuracy statistics from engine analysis")]
pub struct Cli {
    /// Settings file [default: pgn-stats.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of engines to run in parallel (overrides the settings file)
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Everything that can stop a run before a report is produced.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to open {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Pgn(#[from] PgnError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Analysis(#[from] SchedulerError),
    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Process exit code: 1 when the engine executable is missing, 2 when
    /// the engine cannot be used, 3 for any other problem.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Engine(e) | RunError::Analysis(SchedulerError::Engine(e)) => {
                if e.is_not_found() {
                    1
                } else {
                    2
                }
            }
            RunError::Analysis(_) => 2,
            RunError::Config(_)
            | RunError::Input { .. }
            | RunError::Pgn(_)
            | RunError::Output { .. } => 3,
        }
    }
}

/// Load settings, gather evaluations and build the report.
pub fn run(cli: &Cli) -> Result<Report, RunError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    run_with_settings(&settings)
}

/// Same as [`run`] for settings that are already loaded.
pub fn run_with_settings(settings: &Settings) -> Result<Report, RunError> {
    settings.validate()?;

    let (games, evaluations) = if settings.read_values_from_pgn_input {
        evaluations_from_annotations(settings)?
    } else {
        evaluations_from_engine(settings)?
    };

    let plain: Vec<Game> = games.into_iter().map(|g| g.game).collect();
    let stats = aggregate(&plain, &evaluations, &settings.stats_config());
    info!(games = plain.len(), players = stats.len(), "statistics complete");

    Ok(Report {
        games: plain.len(),
        players: stats.report(&settings.player_filter),
    })
}

fn evaluations_from_engine(
    settings: &Settings,
) -> Result<(Vec<PgnGame>, Vec<GameEvaluations>), RunError> {
    let engine = resolve_engine(&settings.engine)?;
    let games = select(
        read_input_games(&settings.pgn_input)?,
        |g| &g.game,
        &settings.player_filter,
        settings.game_range(),
    );
    let plain: Vec<Game> = games.iter().map(|g| g.game.clone()).collect();

    let (tx, bar) = progress::spawn_progress_bar(plain.len());
    let result = Scheduler::new(settings.workers, settings.level)
        .with_progress(tx)
        .run_with(&plain, || AnalysisEngine::spawn(&engine));
    // The scheduler and its sender are gone, so the bar thread is finishing.
    let _ = bar.join();
    let evaluations = result?;

    if settings.writes_output() {
        if let Some(path) = &settings.pgn_output {
            write_output(path, &games, &evaluations)?;
        }
    }
    Ok((games, evaluations))
}

fn evaluations_from_annotations(
    settings: &Settings,
) -> Result<(Vec<PgnGame>, Vec<GameEvaluations>), RunError> {
    let slots = pgn::read_game_slots(BufReader::new(open(&settings.pgn_input)?))?;
    let sequences = read_annotated(BufReader::new(open(&settings.pgn_input)?))
        .map_err(PgnError::from)?;
    if slots.len() != sequences.len() {
        return Err(PgnError::AnnotationMismatch {
            games: slots.len(),
            annotated: sequences.len(),
        }
        .into());
    }

    // Skipped games still own a sequence; drop both together.
    let pairs = slots
        .into_iter()
        .zip(sequences)
        .filter_map(|(slot, sequence)| slot.map(|game| (game, sequence)))
        .collect::<Vec<_>>();
    let pairs = select(
        pairs,
        |(g, _)| &g.game,
        &settings.player_filter,
        settings.game_range(),
    );
    Ok(pairs.into_iter().unzip())
}

/// Keep items whose game involves a matching player, then apply the
/// 1-based range to what is left.
fn select<T, F>(items: Vec<T>, game_of: F, player_filter: &str, range: GameRange) -> Vec<T>
where
    F: Fn(&T) -> &Game,
{
    items
        .into_iter()
        .filter(|item| game_of(item).has_player_matching(player_filter))
        .enumerate()
        .filter(|(i, _)| range.contains(i + 1))
        .map(|(_, item)| item)
        .collect()
}

fn open(path: &Path) -> Result<File, RunError> {
    File::open(path).map_err(|source| RunError::Input {
        path: path.to_path_buf(),
        source,
    })
}

fn read_input_games(path: &Path) -> Result<Vec<PgnGame>, RunError> {
    Ok(pgn::read_games(BufReader::new(open(path)?))?)
}

fn write_output(
    path: &Path,
    games: &[PgnGame],
    evaluations: &[GameEvaluations],
) -> Result<(), RunError> {
    let output_error = |source| RunError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(output_error)?;
    pgn::write_annotated(&mut BufWriter::new(file), games, evaluations).map_err(output_error)?;
    info!(path = %path.display(), games = games.len(), "annotated games written");
    Ok(())
}

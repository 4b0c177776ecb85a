//! Integration tests for chess-analysis crate.
//!
//! Most tests run against small `/bin/sh` scripts that speak just enough UCI.
//! The Stockfish test requires Stockfish in PATH.
//! Run with: `cargo test -p chess-analysis --test integration -- --ignored`

use std::time::{Duration, Instant};

use chess_analysis::quality::side_tally;
use chess_analysis::{
    aggregate, AnalysisEngine, EngineError, Evaluation, Game, GameAnalyzer, Scheduler,
    SchedulerError, Side, StatsConfig, Thresholds,
};
use uci::SearchLimit;

#[cfg(unix)]
mod fake {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::OnceLock;

    use tempfile::TempDir;

    /// Scores the position after `n` plies as `n * 37 % 200 - 100`, except
    /// after three plies where it reports being mated in one.
    const WELL_BEHAVED: &str = r#"#!/bin/sh
n=0
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name Fake Engine"; echo "option name Hash type spin default 1 min 1 max 1"; echo uciok ;;
    isready) echo readyok ;;
    position) set -- $rest; if [ $# -gt 1 ]; then n=$(($# - 2)); else n=0; fi ;;
    go)
      if [ "$n" -eq 3 ]; then
        echo "info depth 5 score mate -1 pv a7a6"
      else
        echo "info depth 1 score cp 999 nodes 1"
        echo "info depth 2 score cp $(( n * 37 % 200 - 100 )) nodes 10 pv a2a3"
        echo "info string done"
      fi
      echo "bestmove a2a3" ;;
    quit) exit 0 ;;
  esac
done
"#;

    /// Handshakes, then dies on the first search.
    const CRASHES_ON_GO: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo uciok ;;
    isready) echo readyok ;;
    go) exit 3 ;;
  esac
done
"#;

    /// Exits before acknowledging `uci`.
    const NO_UCIOK: &str = "#!/bin/sh\nread -r cmd\necho \"id name Broken\"\nexit 0\n";

    /// Keeps reading after `quit` and never exits on its own.
    const IGNORES_QUIT: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo uciok ;;
    isready) echo readyok ;;
  esac
done
"#;

    pub struct Engines {
        _dir: TempDir,
        pub well_behaved: PathBuf,
        pub crashes_on_go: PathBuf,
        pub no_uciok: PathBuf,
        pub ignores_quit: PathBuf,
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// All scripts are written before any test spawns one.
    pub fn engines() -> &'static Engines {
        static ENGINES: OnceLock<Engines> = OnceLock::new();
        ENGINES.get_or_init(|| {
            let dir = TempDir::new().unwrap();
            Engines {
                well_behaved: write_script(dir.path(), "fake-engine", WELL_BEHAVED),
                crashes_on_go: write_script(dir.path(), "crashing-engine", CRASHES_ON_GO),
                no_uciok: write_script(dir.path(), "mute-engine", NO_UCIOK),
                ignores_quit: write_script(dir.path(), "stubborn-engine", IGNORES_QUIT),
                _dir: dir,
            }
        })
    }

    pub fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }
}

fn moves(list: &[&str]) -> Vec<String> {
    list.iter().map(|m| m.to_string()).collect()
}

fn game(white: &str, black: &str, list: &[&str]) -> Game {
    Game::new(
        vec![
            ("White".to_string(), white.to_string()),
            ("Black".to_string(), black.to_string()),
        ],
        moves(list),
    )
}

#[test]
fn test_missing_engine_is_not_found() {
    let result = AnalysisEngine::new("/nonexistent/path/to/stockfish");
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[cfg(unix)]
#[test]
fn test_fake_engine_evaluates_positions() {
    let engines = fake::engines();
    let mut engine = AnalysisEngine::new(fake::path_str(&engines.well_behaved)).unwrap();
    assert_eq!(engine.name(), "Fake Engine");

    let start = engine.evaluate(&[], SearchLimit::Depth(2)).unwrap();
    assert_eq!(start.evaluation, Evaluation::Centipawns(-100));
    assert_eq!(start.best_move.as_deref(), Some("a2a3"));
    assert_eq!(start.depth, 2);
    assert_eq!(start.nodes, Some(10));

    let after_two = engine
        .evaluate(&moves(&["e2e4", "e7e5"]), SearchLimit::MoveTime(10))
        .unwrap();
    assert_eq!(after_two.evaluation, Evaluation::Centipawns(-26));

    let mated = engine
        .evaluate(&moves(&["e2e4", "e7e5", "d1h5"]), SearchLimit::Nodes(100))
        .unwrap();
    assert_eq!(mated.evaluation, Evaluation::Mate(-1));
    assert_eq!(mated.depth, 5);
    assert_eq!(mated.nodes, None);

    engine.quit();
}

#[cfg(unix)]
#[test]
fn test_engine_dying_mid_search_is_unavailable() {
    let engines = fake::engines();
    let mut engine = AnalysisEngine::new(fake::path_str(&engines.crashes_on_go)).unwrap();
    let err = engine.evaluate(&[], SearchLimit::Depth(1)).unwrap_err();
    assert!(matches!(err, EngineError::Unavailable(_)));
}

#[cfg(unix)]
#[test]
fn test_engine_without_uciok_is_unavailable() {
    let engines = fake::engines();
    let result = AnalysisEngine::new(fake::path_str(&engines.no_uciok));
    assert!(matches!(result, Err(EngineError::Unavailable(_))));
}

#[cfg(unix)]
#[test]
fn test_engine_ignoring_quit_is_killed() {
    let engines = fake::engines();
    let engine = AnalysisEngine::new(fake::path_str(&engines.ignores_quit)).unwrap();

    let started = Instant::now();
    drop(engine);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[cfg(unix)]
#[test]
fn test_analyzer_with_fake_engine() {
    let engines = fake::engines();
    let mut analyzer =
        GameAnalyzer::new(fake::path_str(&engines.well_behaved), SearchLimit::Depth(1)).unwrap();

    let evals = analyzer
        .analyze_game(&game("A", "B", &["e2e4", "e7e5", "g1f3", "b8c6"]))
        .unwrap();
    assert_eq!(evals.len(), 5);
    assert_eq!(evals[3].evaluation, Evaluation::Mate(-1));
}

#[cfg(unix)]
#[test]
fn test_scheduler_pool_sizes_agree() {
    let engines = fake::engines();
    let path = fake::path_str(&engines.well_behaved);
    let games = vec![
        game("Alice", "Bob", &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]),
        game("Bob", "Carol", &["d2d4", "d7d5"]),
        game("Carol", "Alice", &["c2c4"]),
        game("Alice", "Carol", &["g1f3", "g8f6", "g2g3", "g7g6", "f1g2", "f8g7"]),
        game("Bob", "Alice", &[]),
    ];

    let sequential = Scheduler::new(1, SearchLimit::Depth(1)).run(path, &games).unwrap();
    let parallel = Scheduler::new(4, SearchLimit::Depth(1)).run(path, &games).unwrap();
    assert_eq!(sequential, parallel);
    for (g, evals) in games.iter().zip(&sequential) {
        assert_eq!(evals.len(), g.moves.len() + 1);
    }

    let config = StatsConfig::default();
    let a = aggregate(&games, &sequential, &config);
    let b = aggregate(&games, &parallel, &config);
    for row in a.report("") {
        let other = b.get(&row.name).unwrap();
        assert_eq!(row.games, other.games);
        assert_eq!(row.moves, other.moves);
        assert_eq!(row.blunders, other.blunders);
        assert!((row.average_loss - other.average_loss).abs() < 1e-9);
    }
}

#[cfg(unix)]
#[test]
fn test_scheduler_fails_whole_batch() {
    let engines = fake::engines();
    let games = vec![game("A", "B", &["e2e4"]), game("C", "D", &["d2d4"])];
    let err = Scheduler::new(2, SearchLimit::Depth(1))
        .run(fake::path_str(&engines.crashes_on_go), &games)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Engine(EngineError::Unavailable(_))));
}

#[test]
#[ignore = "requires Stockfish"]
fn test_scholars_mate_with_stockfish() {
    // 1.e4 e5 2.Qh5 Nc6 3.Bc4 Nf6?? 4.Qxf7#
    let scholars = game(
        "White",
        "Black",
        &["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6", "h5f7"],
    );

    let mut analyzer = GameAnalyzer::new("stockfish", SearchLimit::Depth(12))
        .expect("Failed to create GameAnalyzer");
    let evals = analyzer.analyze_game(&scholars).expect("Failed to analyze game");

    // The mated final position is dropped.
    assert_eq!(evals.len(), scholars.moves.len());

    let black = side_tally(&evals, Side::Black, 0, &Thresholds::default())
        .expect("Black made moves");
    assert!(black.blunders >= 1, "Nf6 should be a blunder, got {:?}", black);
}

//! PGN reading and annotated PGN writing.
//!
//! Reading goes through `pgn-reader`, with `shakmaty` replaying each SAN
//! move to recover its UCI form. Only the mainline is kept; variations are
//! skipped. Writing produces the engine comments that
//! [`chess_analysis::read_annotated`] reads back.

use std::io::{Read, Write};
use std::ops::ControlFlow;

use chess_analysis::{EvaluationRecord, Game};
use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Position};
use thiserror::Error;
use tracing::{debug, warn};

/// Movetext lines are wrapped at this width.
const LINE_WIDTH: usize = 80;

/// Tags every exported game carries, in this order.
const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

#[derive(Error, Debug)]
pub enum PgnError {
    #[error("Failed to read PGN: {0}")]
    Io(#[from] std::io::Error),
    /// A mainline move that is not legal in its position.
    #[error("Game {game}: illegal move {san}: {reason}")]
    IllegalMove {
        game: usize,
        san: String,
        reason: String,
    },
    /// Annotated sequences are split on `[Event` lines, so every game needs
    /// exactly one Event tag for the two to pair up.
    #[error("{games} games but {annotated} annotated sequences (is an Event tag missing?)")]
    AnnotationMismatch { games: usize, annotated: usize },
}

/// A game as read from PGN: the analysis view plus the original SAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnGame {
    pub game: Game,
    /// Mainline in SAN, parallel to `game.moves`.
    pub san: Vec<String>,
}

struct Mainline {
    headers: Vec<(String, String)>,
    position: Chess,
    uci: Vec<String>,
    san: Vec<String>,
}

/// Collects mainlines game by game.
struct GameCollector {
    /// 1-based number of the game being read.
    number: usize,
}

impl Visitor for GameCollector {
    type Tags = Vec<(String, String)>;
    type Movetext = Mainline;
    type Output = Result<Option<PgnGame>, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.number += 1;
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.push((
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        // Engines are always given the standard start position.
        if tags.iter().any(|(k, _)| k == "FEN") {
            warn!(game = self.number, "skipping game with a custom start position");
            return ControlFlow::Break(Ok(None));
        }
        ControlFlow::Continue(Mainline {
            headers: tags,
            position: Chess::default(),
            uci: Vec::new(),
            san: Vec::new(),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, mainline: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        match san_plus.san.to_move(&mainline.position) {
            Ok(m) => {
                mainline.uci.push(m.to_uci(CastlingMode::Standard).to_string());
                mainline.san.push(san_plus.to_string());
                mainline.position.play_unchecked(m);
                ControlFlow::Continue(())
            }
            Err(e) => ControlFlow::Break(Err(PgnError::IllegalMove {
                game: self.number,
                san: san_plus.to_string(),
                reason: e.to_string(),
            })),
        }
    }

    fn end_game(&mut self, mainline: Self::Movetext) -> Self::Output {
        Ok(Some(PgnGame {
            game: Game::new(mainline.headers, mainline.uci),
            san: mainline.san,
        }))
    }
}

/// Read every game in a PGN stream, one slot per game in the file.
///
/// Games that start from a custom position are skipped with a warning and
/// leave a `None` in their slot.
///
/// # Errors
///
/// Returns [`PgnError::IllegalMove`] for the first illegal mainline move and
/// [`PgnError::Io`] if the stream cannot be read.
pub fn read_game_slots<R: Read>(input: R) -> Result<Vec<Option<PgnGame>>, PgnError> {
    let mut reader = Reader::new(input);
    let mut collector = GameCollector { number: 0 };
    let mut slots = Vec::new();

    while let Some(game) = reader.read_game(&mut collector)? {
        slots.push(game?);
    }
    debug!(games = slots.len(), "PGN input read");
    Ok(slots)
}

/// Read every game that can be analyzed from the standard start position.
pub fn read_games<R: Read>(input: R) -> Result<Vec<PgnGame>, PgnError> {
    Ok(read_game_slots(input)?.into_iter().flatten().collect())
}

/// Comment carried by a move: the evaluation of the position it was played
/// from, the search depth and the engine's preferred move.
pub fn annotation(record: &EvaluationRecord) -> String {
    match &record.best_move {
        Some(best) => format!("{{{}/{} {}}}", record.evaluation, record.depth, best),
        None => format!("{{{}/{}}}", record.evaluation, record.depth),
    }
}

/// Write one game with an engine comment after every evaluated move.
///
/// The seven roster tags come first, `?` standing in for missing ones, then
/// any other tags in their original order. Move `k` is annotated with
/// `evaluations[k]`; moves without a matching record are written bare.
pub fn write_annotated_game<W: Write>(
    out: &mut W,
    game: &PgnGame,
    evaluations: &[EvaluationRecord],
) -> std::io::Result<()> {
    for key in SEVEN_TAG_ROSTER {
        let missing = if key == "Result" { "*" } else { "?" };
        let value = game.game.header(key).unwrap_or(missing);
        writeln!(out, "[{} \"{}\"]", key, escape_tag(value))?;
    }
    for (key, value) in &game.game.headers {
        if !SEVEN_TAG_ROSTER.contains(&key.as_str()) {
            writeln!(out, "[{} \"{}\"]", key, escape_tag(value))?;
        }
    }
    writeln!(out)?;

    let mut tokens = Vec::with_capacity(game.san.len() * 3 + 1);
    let mut after_comment = false;
    for (ply, san) in game.san.iter().enumerate() {
        let number = ply / 2 + 1;
        if ply % 2 == 0 {
            tokens.push(format!("{}.", number));
        } else if after_comment {
            tokens.push(format!("{}...", number));
        }
        tokens.push(san.clone());

        after_comment = match evaluations.get(ply) {
            Some(record) => {
                tokens.push(annotation(record));
                true
            }
            None => false,
        };
    }
    tokens.push(game.game.header("Result").unwrap_or("*").to_string());

    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            writeln!(out, "{}", line)?;
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    writeln!(out, "{}", line)?;
    writeln!(out)?;
    Ok(())
}

/// Write a whole batch, pairing games with their evaluations by position.
pub fn write_annotated<W: Write>(
    out: &mut W,
    games: &[PgnGame],
    evaluations: &[Vec<EvaluationRecord>],
) -> std::io::Result<()> {
    for (game, evals) in games.iter().zip(evaluations) {
        write_annotated_game(out, game, evals)?;
    }
    out.flush()
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

//! Reads evaluations back out of previously annotated PGN text.
//!
//! Games written with engine comments such as `{+0.35/18 e2e4}` carry one
//! evaluation per move. This reader recovers those values without starting
//! an engine. Mate annotations are skipped, so a sequence may be shorter
//! than the game.

use std::io::BufRead;

use thiserror::Error;
use tracing::debug;

use crate::evaluation::{EvaluationRecord, GameEvaluations};

/// A `<pawns>/<depth>` token whose pawn value is not a decimal number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed annotation '{token}'")]
pub struct MalformedAnnotation {
    pub token: String,
}

/// Split a PGN stream into per-game annotation sequences.
///
/// A line containing `[Event` starts a new game. Anything before the first
/// such line is ignored. Malformed annotations are logged and dropped.
pub fn read_annotated<R: BufRead>(reader: R) -> std::io::Result<Vec<GameEvaluations>> {
    let mut games = Vec::new();
    let mut current: Option<GameEvaluations> = None;

    for line in reader.lines() {
        let line = line?;
        if line.contains("[Event") {
            games.extend(current.take());
            current = Some(GameEvaluations::new());
            continue;
        }
        if let Some(records) = current.as_mut() {
            records.extend(parse_annotation_line(&line));
        }
    }
    games.extend(current);

    debug!(games = games.len(), "annotated input read");
    Ok(games)
}

/// All evaluations annotated on one line of movetext.
pub fn parse_annotation_line(line: &str) -> Vec<EvaluationRecord> {
    if !line.contains('{') {
        return Vec::new();
    }

    line.split_whitespace()
        .filter_map(|token| match parse_annotation(token) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "dropping annotation");
                None
            }
        })
        .collect()
}

/// Parse one whitespace-separated token.
///
/// Returns `Ok(None)` for tokens that are not centipawn annotations: no `/`,
/// a mate marker, or a value without a decimal point (such as the `1/2-1/2`
/// result).
pub fn parse_annotation(token: &str) -> Result<Option<EvaluationRecord>, MalformedAnnotation> {
    let Some((value, rest)) = token.split_once('/') else {
        return Ok(None);
    };
    let value = value.trim_start_matches('{');
    if value.contains('M') || !value.contains('.') {
        return Ok(None);
    }

    let centipawns = pawns_to_centipawns(value).ok_or_else(|| MalformedAnnotation {
        token: token.to_string(),
    })?;

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let depth = rest[..digits].parse().unwrap_or(0);

    Ok(Some(EvaluationRecord {
        depth,
        ..EvaluationRecord::centipawns(centipawns)
    }))
}

/// `-1.207` -> `-120`: times one hundred, truncated toward zero.
fn pawns_to_centipawns(value: &str) -> Option<i32> {
    let (negative, unsigned) = match value.as_bytes().first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    let (whole, fraction) = unsigned.split_once('.')?;

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }

    let whole: i32 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let hundredths = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(2)
        .fold(0, |acc, b| acc * 10 + i32::from(b - b'0'));

    let magnitude = whole.checked_mul(100)?.checked_add(hundredths)?;
    Some(if negative { -magnitude } else { magnitude })
}

//! Chess position evaluation types.

use std::fmt;

/// Centipawn stand-in for a forced mate when a mate score has to be
/// compared with centipawn scores.
pub const MATE_SCORE: i32 = 32_000;

/// Represents a chess position evaluation.
///
/// Both variants are from the perspective of the side to move in the
/// evaluated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better).
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, negative or zero =
    /// side to move gets mated).
    Mate(i32),
}

impl Evaluation {
    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }

    /// Centipawn value for comparisons, with mates pinned to `±MATE_SCORE`.
    ///
    /// Centipawn scores are clamped into the same range so that negating the
    /// result can never overflow.
    pub fn to_centipawns(&self) -> i32 {
        match *self {
            Evaluation::Centipawns(cp) => cp.clamp(-MATE_SCORE, MATE_SCORE),
            Evaluation::Mate(m) if m > 0 => MATE_SCORE,
            Evaluation::Mate(_) => -MATE_SCORE,
        }
    }
}

impl From<uci::Score> for Evaluation {
    fn from(score: uci::Score) -> Self {
        match score {
            uci::Score::Cp(cp) => Evaluation::Centipawns(cp),
            uci::Score::Mate(m) => Evaluation::Mate(m),
        }
    }
}

/// Pawn notation used in PGN annotations: `+0.35`, `-1.20`, `+M3`, `-M2`.
impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", cp as f64 / 100.0),
            Evaluation::Mate(m) if m > 0 => write!(f, "+M{}", m),
            Evaluation::Mate(m) => write!(f, "-M{}", m.unsigned_abs()),
        }
    }
}

/// One engine verdict on one position.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub evaluation: Evaluation,
    /// Engine's preferred move; `None` when the record was read back from
    /// annotations rather than produced by an engine.
    pub best_move: Option<String>,
    /// Reported search depth (0 when unknown).
    pub depth: u32,
    pub nodes: Option<u64>,
}

impl EvaluationRecord {
    /// A bare centipawn record with no search metadata.
    pub fn centipawns(cp: i32) -> Self {
        Self {
            evaluation: Evaluation::Centipawns(cp),
            best_move: None,
            depth: 0,
            nodes: None,
        }
    }

    /// A bare mate record with no search metadata.
    pub fn mate(moves: i32) -> Self {
        Self {
            evaluation: Evaluation::Mate(moves),
            ..Self::centipawns(0)
        }
    }
}

/// Evaluations of one game: the start position, then one per ply.
pub type GameEvaluations = Vec<EvaluationRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores_pin_to_extremes() {
        assert_eq!(Evaluation::Mate(3).to_centipawns(), MATE_SCORE);
        assert_eq!(Evaluation::Mate(-1).to_centipawns(), -MATE_SCORE);
        assert_eq!(Evaluation::Mate(0).to_centipawns(), -MATE_SCORE);
        assert_eq!(Evaluation::Centipawns(i32::MIN).to_centipawns(), -MATE_SCORE);
        assert_eq!(Evaluation::Centipawns(125).to_centipawns(), 125);
    }

    #[test]
    fn display_uses_pawn_notation() {
        assert_eq!(Evaluation::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Evaluation::Centipawns(0).to_string(), "+0.00");
        assert_eq!(Evaluation::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Evaluation::Mate(3).to_string(), "+M3");
        assert_eq!(Evaluation::Mate(-2).to_string(), "-M2");
        assert_eq!(Evaluation::Mate(0).to_string(), "-M0");
    }

    #[test]
    fn converts_uci_score() {
        assert_eq!(Evaluation::from(uci::Score::Cp(7)), Evaluation::Centipawns(7));
        assert_eq!(Evaluation::from(uci::Score::Mate(-4)), Evaluation::Mate(-4));
    }
}

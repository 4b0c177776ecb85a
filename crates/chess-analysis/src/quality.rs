//! Move quality classification and per-side loss tallies.

use crate::evaluation::{Evaluation, EvaluationRecord};

/// Classification of a move by the evaluation it gave away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveQuality {
    /// Inaccuracy (noticeable centipawn loss)
    Inaccuracy,
    /// Mistake (significant centipawn loss)
    Mistake,
    /// Blunder (major centipawn loss)
    Blunder,
}

/// Centipawn losses at which a move becomes an inaccuracy, a mistake or a
/// blunder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub blunder: i32,
    pub mistake: i32,
    pub inaccuracy: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blunder: 300,
            mistake: 100,
            inaccuracy: 50,
        }
    }
}

impl Thresholds {
    /// Most severe tier reached by `loss`, or `None` for an acceptable move.
    pub fn classify(&self, loss: i32) -> Option<MoveQuality> {
        if loss >= self.blunder {
            Some(MoveQuality::Blunder)
        } else if loss >= self.mistake {
            Some(MoveQuality::Mistake)
        } else if loss >= self.inaccuracy {
            Some(MoveQuality::Inaccuracy)
        } else {
            None
        }
    }
}

/// The side whose moves are being tallied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Index of this side's first "before" position in an evaluation list.
    pub fn offset(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }
}

/// Loss caused by a single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlyLoss {
    /// Centipawns given away, never negative.
    pub loss: i32,
    /// False when either side of the pair was a mate score. Such moves are
    /// classified but left out of the average.
    pub scored: bool,
}

/// Loss of the move played between two consecutive positions.
///
/// `before` is from the mover's point of view, `after` from the opponent's
/// (who is to move next), so it is negated first. Mates count as
/// `±MATE_SCORE`.
pub fn move_loss(before: &Evaluation, after: &Evaluation) -> PlyLoss {
    let before_cp = before.to_centipawns();
    let after_cp = -after.to_centipawns();
    PlyLoss {
        loss: (before_cp - after_cp).max(0),
        scored: !before.is_mate() && !after.is_mate(),
    }
}

/// Loss statistics for one player, over one game or many.
#[derive(Debug, Clone, PartialEq)]
pub struct LossTally {
    /// Mean loss over `scored_moves`, in centipawns.
    pub average_loss: f64,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    pub games: u32,
    /// Every move that was paired, mate pairs included.
    pub moves: u32,
    /// Moves that contributed to `average_loss`; the merge weight.
    pub scored_moves: u32,
}

impl LossTally {
    /// Tally one game's worth of move losses.
    ///
    /// Returns `None` when there are no losses at all, so a side without a
    /// single complete pair contributes nothing rather than a zero row.
    pub fn from_losses<I>(losses: I, thresholds: &Thresholds) -> Option<Self>
    where
        I: IntoIterator<Item = PlyLoss>,
    {
        let mut tally = LossTally {
            average_loss: 0.0,
            inaccuracies: 0,
            mistakes: 0,
            blunders: 0,
            games: 1,
            moves: 0,
            scored_moves: 0,
        };
        let mut scored_sum: i64 = 0;

        for ply in losses {
            tally.moves += 1;
            match thresholds.classify(ply.loss) {
                Some(MoveQuality::Blunder) => tally.blunders += 1,
                Some(MoveQuality::Mistake) => tally.mistakes += 1,
                Some(MoveQuality::Inaccuracy) => tally.inaccuracies += 1,
                None => {}
            }
            if ply.scored {
                tally.scored_moves += 1;
                scored_sum += i64::from(ply.loss);
            }
        }

        if tally.moves == 0 {
            return None;
        }
        if tally.scored_moves > 0 {
            tally.average_loss = scored_sum as f64 / f64::from(tally.scored_moves);
        }
        Some(tally)
    }

    /// Fold `other` into `self`.
    ///
    /// Averages are weighted by scored move count; counters are summed.
    pub fn merge(&mut self, other: &LossTally) {
        let weight = f64::from(self.scored_moves);
        let other_weight = f64::from(other.scored_moves);
        let total = weight + other_weight;

        self.average_loss = if total > 0.0 {
            (self.average_loss * weight + other.average_loss * other_weight) / total
        } else {
            0.0
        };
        self.inaccuracies += other.inaccuracies;
        self.mistakes += other.mistakes;
        self.blunders += other.blunders;
        self.games += other.games;
        self.moves += other.moves;
        self.scored_moves += other.scored_moves;
    }
}

/// Loss tally of one side in one game.
///
/// The first `skip_first_moves` full moves are ignored. Starting at the
/// side's offset, every second entry is paired with its successor; an
/// unpaired trailing entry is dropped.
pub fn side_tally(
    evaluations: &[EvaluationRecord],
    side: Side,
    skip_first_moves: usize,
    thresholds: &Thresholds,
) -> Option<LossTally> {
    let evaluations = evaluations
        .get(skip_first_moves.saturating_mul(2)..)
        .unwrap_or(&[]);

    let losses = evaluations
        .iter()
        .skip(side.offset())
        .step_by(2)
        .zip(evaluations.iter().skip(side.offset() + 1).step_by(2))
        .map(|(before, after)| move_loss(&before.evaluation, &after.evaluation));

    LossTally::from_losses(losses, thresholds)
}

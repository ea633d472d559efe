//! Chess position evaluation types.

use std::fmt;

/// Represents a chess position evaluation.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found). Both are from the
/// perspective of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better)
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated)
    Mate(i32),
}

impl Evaluation {
    /// Returns true if this is a forced mate score.
    #[must_use]
    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }

    /// The centipawn value, if this is not a mate score.
    #[must_use]
    pub fn centipawns(&self) -> Option<i32> {
        match self {
            Evaluation::Centipawns(cp) => Some(*cp),
            Evaluation::Mate(_) => None,
        }
    }

    /// The mate distance, if this is a mate score.
    #[must_use]
    pub fn mate(&self) -> Option<i32> {
        match self {
            Evaluation::Centipawns(_) => None,
            Evaluation::Mate(n) => Some(*n),
        }
    }

    /// Builds an evaluation from the two nullable persisted fields.
    ///
    /// Returns `None` unless exactly one of them is set.
    #[must_use]
    pub fn from_parts(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (Some(cp), None) => Some(Evaluation::Centipawns(cp)),
            (None, Some(n)) => Some(Evaluation::Mate(n)),
            _ => None,
        }
    }
}

impl From<uci::Score> for Evaluation {
    fn from(score: uci::Score) -> Self {
        match score {
            uci::Score::Cp(cp) => Evaluation::Centipawns(cp),
            uci::Score::Mate(n) => Evaluation::Mate(n),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Evaluation::Mate(n) if *n < 0 => write!(f, "-M{}", n.unsigned_abs()),
            Evaluation::Mate(n) => write!(f, "M{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accessors() {
        let cp = Evaluation::Centipawns(35);
        assert!(!cp.is_mate());
        assert_eq!(cp.centipawns(), Some(35));
        assert_eq!(cp.mate(), None);

        let mate = Evaluation::Mate(-2);
        assert!(mate.is_mate());
        assert_eq!(mate.centipawns(), None);
        assert_eq!(mate.mate(), Some(-2));
    }

    #[test]
    fn test_from_uci_score() {
        assert_eq!(Evaluation::from(uci::Score::Cp(-12)), Evaluation::Centipawns(-12));
        assert_eq!(Evaluation::from(uci::Score::Mate(3)), Evaluation::Mate(3));
    }

    #[test]
    fn test_from_parts_rejects_both_and_neither() {
        assert_eq!(Evaluation::from_parts(None, None), None);
        assert_eq!(Evaluation::from_parts(Some(10), Some(2)), None);
        assert_eq!(Evaluation::from_parts(Some(10), None), Some(Evaluation::Centipawns(10)));
        assert_eq!(Evaluation::from_parts(None, Some(2)), Some(Evaluation::Mate(2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Evaluation::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Evaluation::Centipawns(-150).to_string(), "-1.50");
        assert_eq!(Evaluation::Mate(3).to_string(), "M3");
        assert_eq!(Evaluation::Mate(-4).to_string(), "-M4");
    }

    proptest! {
        #[test]
        fn exactly_one_part_is_set(cp in any::<i32>(), mate in any::<i32>(), is_mate in any::<bool>()) {
            let eval = if is_mate { Evaluation::Mate(mate) } else { Evaluation::Centipawns(cp) };
            prop_assert!(eval.centipawns().is_some() ^ eval.mate().is_some());
            prop_assert_eq!(Evaluation::from_parts(eval.centipawns(), eval.mate()), Some(eval));
        }
    }
}

//! Supplier evaluation scoring: weighted composite and grade bands.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::{EvaluationWeights, GradeCutoffs};
use crate::errors::ProcurementError;

/// Letter grade on the 0-5 composite.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn is_passing(self) -> bool {
        !matches!(self, Grade::D | Grade::F)
    }

    pub fn is_excellent(self) -> bool {
        self == Grade::A
    }

    pub fn is_good(self) -> bool {
        matches!(self, Grade::A | Grade::B)
    }

    pub fn is_poor(self) -> bool {
        matches!(self, Grade::D | Grade::F)
    }
}

/// The five scored dimensions of a supplier evaluation, each 0-5 when
/// present. Absent dimensions are excluded from the composite entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub quality: Option<Decimal>,
    pub delivery: Option<Decimal>,
    pub price: Option<Decimal>,
    pub service: Option<Decimal>,
    pub communication: Option<Decimal>,
}

impl DimensionScores {
    fn entries(&self, weights: &EvaluationWeights) -> [(Option<Decimal>, Decimal); 5] {
        [
            (self.quality, weights.quality),
            (self.delivery, weights.delivery),
            (self.price, weights.price),
            (self.service, weights.service),
            (self.communication, weights.communication),
        ]
    }

    /// Validates that every present score is within the 0-5 scale.
    pub fn validate(&self) -> Result<(), ProcurementError> {
        let five = Decimal::from(5);
        for (name, score) in [
            ("quality", self.quality),
            ("delivery", self.delivery),
            ("price", self.price),
            ("service", self.service),
            ("communication", self.communication),
        ] {
            if let Some(value) = score {
                if value < Decimal::ZERO || value > five {
                    return Err(ProcurementError::Validation(format!(
                        "{} score must be between 0 and 5, got {}",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Weighted composite over the dimensions actually scored.
///
/// The denominator renormalizes over the present dimensions' weights, so an
/// evaluation with a single 4.0 quality score yields exactly 4.0. With no
/// scored dimensions there is no composite at all.
pub fn weighted_composite(
    scores: &DimensionScores,
    weights: &EvaluationWeights,
) -> Option<Decimal> {
    let mut total = Decimal::ZERO;
    let mut weight_sum = Decimal::ZERO;
    for (score, weight) in scores.entries(weights) {
        if let Some(value) = score {
            total += value * weight;
            weight_sum += weight;
        }
    }
    if weight_sum.is_zero() {
        return None;
    }
    Some(
        (total / weight_sum)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// Maps a 0-5 composite onto its grade band.
pub fn grade_for(score: Decimal, cutoffs: &GradeCutoffs) -> Grade {
    if score >= cutoffs.a {
        Grade::A
    } else if score >= cutoffs.b {
        Grade::B
    } else if score >= cutoffs.c {
        Grade::C
    } else if score >= cutoffs.d {
        Grade::D
    } else {
        Grade::F
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn weights() -> EvaluationWeights {
        EvaluationWeights::default()
    }

    #[test]
    fn fully_scored_evaluation_uses_all_weights() {
        let scores = DimensionScores {
            quality: Some(dec!(5)),
            delivery: Some(dec!(4)),
            price: Some(dec!(3)),
            service: Some(dec!(2)),
            communication: Some(dec!(1)),
        };
        // 5*.30 + 4*.25 + 3*.20 + 2*.15 + 1*.10 = 3.50
        assert_eq!(weighted_composite(&scores, &weights()), Some(dec!(3.50)));
    }

    #[test]
    fn single_dimension_renormalizes_to_that_score() {
        let scores = DimensionScores {
            quality: Some(dec!(4.0)),
            ..Default::default()
        };
        assert_eq!(weighted_composite(&scores, &weights()), Some(dec!(4.00)));
    }

    #[test]
    fn unscored_evaluation_has_no_composite() {
        assert_eq!(
            weighted_composite(&DimensionScores::default(), &weights()),
            None
        );
    }

    #[test]
    fn out_of_range_score_fails_validation() {
        let scores = DimensionScores {
            delivery: Some(dec!(5.01)),
            ..Default::default()
        };
        assert!(scores.validate().is_err());
    }

    #[rstest]
    #[case(dec!(4.5), Grade::A)]
    #[case(dec!(4.49), Grade::B)]
    #[case(dec!(3.5), Grade::B)]
    #[case(dec!(2.5), Grade::C)]
    #[case(dec!(1.5), Grade::D)]
    #[case(dec!(1.49), Grade::F)]
    #[case(dec!(0), Grade::F)]
    fn grade_bands(#[case] score: Decimal, #[case] expected: Grade) {
        assert_eq!(grade_for(score, &GradeCutoffs::default()), expected);
    }
}

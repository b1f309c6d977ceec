//! Quotation evaluation: combining externally supplied technical and
//! commercial scores into an overall score.
//!
//! The engine only combines scores; it never judges technical merit itself,
//! and it never selects a winner automatically. Winner selection is an
//! explicit, audited act on the quotation service.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::QuotationScoreWeights;
use crate::errors::ProcurementError;

/// Combines 0-100 technical and commercial scores into the overall score
/// using the configured weights (0.6 / 0.4 by default).
pub fn overall_score(
    technical: Decimal,
    commercial: Decimal,
    weights: &QuotationScoreWeights,
) -> Result<Decimal, ProcurementError> {
    let hundred = Decimal::ONE_HUNDRED;
    for (name, score) in [("technical", technical), ("commercial", commercial)] {
        if score < Decimal::ZERO || score > hundred {
            return Err(ProcurementError::Validation(format!(
                "{} score must be between 0 and 100, got {}",
                name, score
            )));
        }
    }
    Ok(
        (technical * weights.technical + commercial * weights.commercial)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn overall_is_sixty_forty_weighted() {
        let score =
            overall_score(dec!(80), dec!(60), &QuotationScoreWeights::default()).unwrap();
        assert_eq!(score, dec!(72.00));
    }

    #[test]
    fn equal_inputs_pass_through() {
        let score =
            overall_score(dec!(55), dec!(55), &QuotationScoreWeights::default()).unwrap();
        assert_eq!(score, dec!(55.00));
    }

    #[test]
    fn scores_outside_scale_are_rejected() {
        let weights = QuotationScoreWeights::default();
        assert!(overall_score(dec!(101), dec!(50), &weights).is_err());
        assert!(overall_score(dec!(50), dec!(-1), &weights).is_err());
    }
}

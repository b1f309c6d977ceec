//! Pure totals arithmetic for line items and documents.
//!
//! Every function here is side-effect free and idempotent; the transition
//! methods recompute totals on each item mutation. Monetary amounts are
//! rounded half-up to two decimals at the item level before summation so that
//! document totals never accumulate rounding drift.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ProcurementError;

/// Rounds a monetary amount to two decimals, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The derived amounts for a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotal {
    /// Post-discount line total, rounded, excluding tax.
    pub total: Decimal,
    pub discount_applied: Decimal,
    pub tax_applied: Decimal,
}

impl LineTotal {
    pub fn total_with_tax(&self) -> Decimal {
        self.total + self.tax_applied
    }
}

/// Computes a line total from quantity and unit price.
///
/// An explicit discount amount overrides a discount percentage; with neither,
/// the discount is zero. Tax is computed on the post-discount amount. A
/// discount exceeding the gross amount is rejected rather than clamped.
pub fn line_total(
    quantity: Decimal,
    unit_price: Decimal,
    discount_pct: Option<Decimal>,
    discount_amt: Option<Decimal>,
    tax_rate_pct: Option<Decimal>,
) -> Result<LineTotal, ProcurementError> {
    if quantity <= Decimal::ZERO {
        return Err(ProcurementError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if unit_price < Decimal::ZERO {
        return Err(ProcurementError::Validation(format!(
            "unit price must not be negative, got {}",
            unit_price
        )));
    }

    let gross = quantity * unit_price;
    let discount = match (discount_amt, discount_pct) {
        (Some(amount), _) => amount,
        (None, Some(pct)) => gross * pct / Decimal::ONE_HUNDRED,
        (None, None) => Decimal::ZERO,
    };
    if discount < Decimal::ZERO {
        return Err(ProcurementError::Validation(
            "discount must not be negative".to_string(),
        ));
    }

    let net = gross - discount;
    if net < Decimal::ZERO {
        return Err(ProcurementError::Validation(format!(
            "discount {} exceeds line amount {}",
            discount, gross
        )));
    }

    let tax = match tax_rate_pct {
        Some(rate) if rate < Decimal::ZERO => {
            return Err(ProcurementError::Validation(
                "tax rate must not be negative".to_string(),
            ));
        }
        Some(rate) => net * rate / Decimal::ONE_HUNDRED,
        None => Decimal::ZERO,
    };

    Ok(LineTotal {
        total: round_money(net),
        discount_applied: round_money(discount),
        tax_applied: round_money(tax),
    })
}

/// The derived aggregate amounts for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// Sum of item totals before document-level tax, shipping, and discount.
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl DocumentTotals {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
        }
    }
}

/// Aggregates already-rounded item totals into document totals.
///
/// Document-level tax applies to the subtotal; whether item totals already
/// embed item-level tax is the caller's tax-mode decision, and the two modes
/// are never combined by default. A grand total driven negative by the
/// document discount is an error, not a silent clamp to zero.
pub fn document_totals(
    item_totals: &[Decimal],
    tax_rate_pct: Decimal,
    shipping_cost: Decimal,
    discount_amount: Decimal,
) -> Result<DocumentTotals, ProcurementError> {
    if tax_rate_pct < Decimal::ZERO {
        return Err(ProcurementError::Validation(
            "tax rate must not be negative".to_string(),
        ));
    }
    if shipping_cost < Decimal::ZERO || discount_amount < Decimal::ZERO {
        return Err(ProcurementError::Validation(
            "shipping cost and discount must not be negative".to_string(),
        ));
    }

    let subtotal: Decimal = item_totals.iter().copied().sum();
    let tax_amount = round_money(subtotal * tax_rate_pct / Decimal::ONE_HUNDRED);
    let total_amount = subtotal + tax_amount + shipping_cost - discount_amount;
    if total_amount < Decimal::ZERO {
        return Err(ProcurementError::Validation(format!(
            "document total would be negative ({})",
            total_amount
        )));
    }

    Ok(DocumentTotals {
        subtotal,
        tax_amount,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn plain_line_total_is_quantity_times_price() {
        let line = line_total(dec!(10), dec!(5.00), None, None, None).unwrap();
        assert_eq!(line.total, dec!(50.00));
        assert_eq!(line.discount_applied, dec!(0));
        assert_eq!(line.tax_applied, dec!(0));
    }

    #[test]
    fn discount_amount_overrides_percentage() {
        let line = line_total(dec!(10), dec!(5.00), Some(dec!(50)), Some(dec!(5.00)), None).unwrap();
        assert_eq!(line.discount_applied, dec!(5.00));
        assert_eq!(line.total, dec!(45.00));
    }

    #[test]
    fn tax_applies_after_discount() {
        let line = line_total(dec!(1), dec!(100.00), Some(dec!(10)), None, Some(dec!(20))).unwrap();
        assert_eq!(line.total, dec!(90.00));
        assert_eq!(line.tax_applied, dec!(18.00));
        assert_eq!(line.total_with_tax(), dec!(108.00));
    }

    #[test]
    fn rounding_happens_at_the_item_level() {
        // 3 * 0.333 = 0.999 -> 1.00 per line; summation sees rounded values.
        let line = line_total(dec!(3), dec!(0.333), None, None, None).unwrap();
        assert_eq!(line.total, dec!(1.00));
    }

    #[test]
    fn excessive_discount_is_rejected() {
        let err = line_total(dec!(1), dec!(10.00), None, Some(dec!(15.00)), None).unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(line_total(dec!(0), dec!(10.00), None, None, None).is_err());
        assert!(line_total(dec!(-2), dec!(10.00), None, None, None).is_err());
    }

    #[test]
    fn document_totals_sum_tax_shipping_and_discount() {
        let totals = document_totals(
            &[dec!(50.00), dec!(10.00)],
            dec!(10),
            dec!(4.00),
            dec!(1.00),
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec!(60.00));
        assert_eq!(totals.tax_amount, dec!(6.00));
        assert_eq!(totals.total_amount, dec!(69.00));
    }

    #[test]
    fn negative_grand_total_is_an_error_not_a_clamp() {
        let err = document_totals(&[dec!(10.00)], dec!(0), dec!(0), dec!(50.00)).unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[test]
    fn document_totals_are_deterministic() {
        let items = [dec!(19.99), dec!(3.33), dec!(0.01)];
        let a = document_totals(&items, dec!(7.5), dec!(2.50), dec!(0)).unwrap();
        let b = document_totals(&items, dec!(7.5), dec!(2.50), dec!(0)).unwrap();
        assert_eq!(a, b);
    }
}

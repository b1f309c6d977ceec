use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use procurement_engine::config::EvaluationWeights;
use procurement_engine::models::purchase_order::{NewPurchaseOrderItem, PurchaseOrder};
use procurement_engine::scoring::{weighted_composite, DimensionScores};
use procurement_engine::totals::line_total;
use procurement_engine::TaxMode;

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn score(tenths: Option<i64>) -> Option<Decimal> {
    tenths.map(|t| Decimal::new(t, 1))
}

proptest! {
    #[test]
    fn line_totals_are_deterministic_and_bounded(
        quantity in 1i64..=10_000,
        price_cents in 0i64..=1_000_000,
        discount_pct in proptest::option::of(0i64..=100),
        tax_pct in proptest::option::of(0i64..=50),
    ) {
        let quantity = Decimal::from(quantity);
        let price = money(price_cents);
        let discount = discount_pct.map(Decimal::from);
        let tax = tax_pct.map(Decimal::from);

        let first = line_total(quantity, price, discount, None, tax).unwrap();
        let second = line_total(quantity, price, discount, None, tax).unwrap();
        prop_assert_eq!(&first, &second);

        let gross = quantity * price;
        prop_assert!(first.discount_applied >= Decimal::ZERO);
        prop_assert!(first.discount_applied <= gross);
        prop_assert!(first.total >= Decimal::ZERO);
        prop_assert!(first.tax_applied >= Decimal::ZERO);
        prop_assert_eq!(first.total_with_tax(), first.total + first.tax_applied);
    }

    #[test]
    fn discount_amount_overrides_percentage(
        quantity in 1i64..=1_000,
        price_cents in 100i64..=100_000,
        pct in 1i64..=100,
        amount_cents in 0i64..=10_000,
    ) {
        let quantity = Decimal::from(quantity);
        let price = money(price_cents);
        let amount = money(amount_cents);
        prop_assume!(amount <= quantity * price);

        let both = line_total(quantity, price, Some(Decimal::from(pct)), Some(amount), None).unwrap();
        let amount_only = line_total(quantity, price, None, Some(amount), None).unwrap();
        prop_assert_eq!(both, amount_only);
    }

    #[test]
    fn composites_stay_within_the_scored_range(
        quality in proptest::option::of(0i64..=50),
        delivery in proptest::option::of(0i64..=50),
        price in proptest::option::of(0i64..=50),
        service in proptest::option::of(0i64..=50),
        communication in proptest::option::of(0i64..=50),
    ) {
        let scores = DimensionScores {
            quality: score(quality),
            delivery: score(delivery),
            price: score(price),
            service: score(service),
            communication: score(communication),
        };
        let present: Vec<Decimal> = [
            scores.quality,
            scores.delivery,
            scores.price,
            scores.service,
            scores.communication,
        ]
        .into_iter()
        .flatten()
        .collect();

        match weighted_composite(&scores, &EvaluationWeights::default()) {
            None => prop_assert!(present.is_empty()),
            Some(composite) => {
                let min = present.iter().min().copied().unwrap();
                let max = present.iter().max().copied().unwrap();
                // Rounding to two decimals may nudge past the extremes by
                // at most half a cent.
                prop_assert!(composite >= min - dec!(0.005));
                prop_assert!(composite <= max + dec!(0.005));
            }
        }
    }

    #[test]
    fn receipts_never_exceed_the_ordered_quantity(
        ordered in 1i64..=500,
        receipts in proptest::collection::vec(1i64..=200, 1..12),
    ) {
        let mut po = PurchaseOrder::new(
            Uuid::new_v4(),
            "PO-2026-000001".to_string(),
            Uuid::new_v4(),
            chrono::Utc::now().date_naive(),
            "buyer".to_string(),
        );
        let item_id = po
            .add_item(
                NewPurchaseOrderItem {
                    quotation_item_id: None,
                    product_id: None,
                    item_name: "Beakers".to_string(),
                    description: None,
                    ordered_quantity: Decimal::from(ordered),
                    unit: "EA".to_string(),
                    unit_price: dec!(1.00),
                    discount_percentage: None,
                    discount_amount: None,
                    tax_rate: None,
                    expected_delivery_date: None,
                    notes: None,
                },
                TaxMode::DocumentLevel,
                "buyer",
            )
            .unwrap();
        po.submit(TaxMode::DocumentLevel, "buyer").unwrap();
        po.approve("manager").unwrap();

        for receipt in receipts {
            // Over-receipts fail without side effects; completion ends the run.
            let _ = po.receive_item(item_id, Decimal::from(receipt), None, "warehouse");
            let item = po.item(item_id).unwrap();
            prop_assert!(item.received_quantity() + item.cancelled_quantity() <= item.ordered_quantity);
        }
    }
}

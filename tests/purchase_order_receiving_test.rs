use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use procurement_engine::errors::ProcurementError;
use procurement_engine::models::purchase_order::NewPurchaseOrderItem;
use procurement_engine::models::{PurchaseOrder, TenantContext};
use procurement_engine::services::purchase_orders::CreatePurchaseOrderInput;
use procurement_engine::workflow::DocumentStatus;
use procurement_engine::{EngineConfig, Event, ProcurementEngine};

fn ctx() -> TenantContext {
    TenantContext::new(Uuid::new_v4(), "amira")
}

fn po_input() -> CreatePurchaseOrderInput {
    CreatePurchaseOrderInput {
        supplier_id: Uuid::new_v4(),
        order_date: None,
        expected_delivery_date: None,
        priority: None,
        currency: None,
        exchange_rate: None,
        payment_terms: None,
        delivery_terms: None,
        delivery_address: Some("Building 4, dock 3".to_string()),
        department: None,
        cost_center: None,
        budget_code: None,
        notes: None,
    }
}

fn line(quantity: rust_decimal::Decimal) -> NewPurchaseOrderItem {
    NewPurchaseOrderItem {
        quotation_item_id: None,
        product_id: None,
        item_name: "Beakers".to_string(),
        description: None,
        ordered_quantity: quantity,
        unit: "EA".to_string(),
        unit_price: dec!(5.00),
        discount_percentage: None,
        discount_amount: None,
        tax_rate: None,
        expected_delivery_date: None,
        notes: None,
    }
}

async fn approved_order(
    engine: &ProcurementEngine,
    ctx: &TenantContext,
    quantity: rust_decimal::Decimal,
) -> PurchaseOrder {
    let po = engine.purchase_orders.create(ctx, po_input()).await.unwrap();
    engine
        .purchase_orders
        .add_item(ctx, po.id, line(quantity))
        .await
        .unwrap();
    engine.purchase_orders.submit(ctx, po.id).await.unwrap();
    engine.purchase_orders.approve(ctx, po.id).await.unwrap()
}

#[tokio::test]
async fn partial_receipts_accumulate_and_never_exceed_the_order() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let po = approved_order(&engine, &ctx, dec!(100)).await;
    let item_id = po.items()[0].id;

    let po = engine
        .purchase_orders
        .receive_item(&ctx, po.id, item_id, dec!(60), Some("first pallet"))
        .await
        .unwrap();
    assert_eq!(po.items()[0].received_quantity(), dec!(60));
    assert_eq!(po.status(), DocumentStatus::Approved);

    assert_matches!(
        engine
            .purchase_orders
            .receive_item(&ctx, po.id, item_id, dec!(50), None)
            .await,
        Err(ProcurementError::InvariantViolation(_))
    );
    // The rejected receipt left no trace.
    let po = engine.purchase_orders.get(&ctx, po.id).await.unwrap();
    assert_eq!(po.items()[0].received_quantity(), dec!(60));

    let po = engine
        .purchase_orders
        .receive_item(&ctx, po.id, item_id, dec!(40), Some("remainder"))
        .await
        .unwrap();
    assert!(po.items()[0].is_fully_received());
    assert_eq!(po.status(), DocumentStatus::Completed);
    assert!(po.delivered_at().is_some());
}

#[tokio::test]
async fn receiving_emits_item_and_delivery_events() {
    let (engine, mut events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let po = approved_order(&engine, &ctx, dec!(10)).await;
    let item_id = po.items()[0].id;

    engine
        .purchase_orders
        .receive_item(&ctx, po.id, item_id, dec!(10), None)
        .await
        .unwrap();

    let mut saw_receipt = false;
    let mut saw_delivery = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::PurchaseOrderItemReceived {
                purchase_order_id,
                quantity,
                ..
            } => {
                assert_eq!(purchase_order_id, po.id);
                assert_eq!(quantity, dec!(10));
                saw_receipt = true;
            }
            Event::PurchaseOrderDelivered(id) => {
                assert_eq!(id, po.id);
                saw_delivery = true;
            }
            _ => {}
        }
    }
    assert!(saw_receipt);
    assert!(saw_delivery);
}

#[tokio::test]
async fn receiving_against_a_draft_order_is_refused() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let po = engine.purchase_orders.create(&ctx, po_input()).await.unwrap();
    let po = engine
        .purchase_orders
        .add_item(&ctx, po.id, line(dec!(10)))
        .await
        .unwrap();

    assert_matches!(
        engine
            .purchase_orders
            .receive_item(&ctx, po.id, po.items()[0].id, dec!(1), None)
            .await,
        Err(ProcurementError::NotModifiable { .. })
    );
}

#[tokio::test]
async fn transmission_and_shipping_stamps() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let po = approved_order(&engine, &ctx, dec!(10)).await;

    let po = engine
        .purchase_orders
        .send_to_supplier(&ctx, po.id)
        .await
        .unwrap();
    assert!(po.sent_to_supplier_at().is_some());

    let po = engine.purchase_orders.acknowledge(&ctx, po.id).await.unwrap();
    assert!(po.acknowledged_at().is_some());

    let po = engine
        .purchase_orders
        .ship(&ctx, po.id, "TRK-889", "DHL")
        .await
        .unwrap();
    assert_eq!(po.tracking_number(), Some("TRK-889"));
    assert_eq!(po.carrier(), Some("DHL"));
    assert_eq!(po.status(), DocumentStatus::Approved);

    let po = engine.purchase_orders.deliver(&ctx, po.id).await.unwrap();
    assert_eq!(po.status(), DocumentStatus::Completed);
}

#[tokio::test]
async fn cancelled_quantity_closes_the_line() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let po = approved_order(&engine, &ctx, dec!(100)).await;
    let item_id = po.items()[0].id;

    engine
        .purchase_orders
        .receive_item(&ctx, po.id, item_id, dec!(70), None)
        .await
        .unwrap();
    let po = engine
        .purchase_orders
        .cancel_item_quantity(&ctx, po.id, item_id, dec!(30))
        .await
        .unwrap();
    let item = &po.items()[0];
    assert_eq!(item.cancelled_quantity(), dec!(30));
    assert_eq!(item.pending_quantity(), dec!(0));
    assert!(!item.is_fully_received());
}

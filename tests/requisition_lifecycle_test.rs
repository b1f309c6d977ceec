use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use procurement_engine::errors::ProcurementError;
use procurement_engine::models::requisition::NewRequisitionItem;
use procurement_engine::models::TenantContext;
use procurement_engine::services::requisitions::CreateRequisitionInput;
use procurement_engine::store::{DocumentFilter, PageRequest};
use procurement_engine::workflow::DocumentStatus;
use procurement_engine::{EngineConfig, Event, ProcurementEngine};

fn ctx() -> TenantContext {
    TenantContext::new(Uuid::new_v4(), "amira")
}

fn create_input(title: &str) -> CreateRequisitionInput {
    CreateRequisitionInput {
        title: title.to_string(),
        description: None,
        required_date: None,
        priority: None,
        department: Some("R&D".to_string()),
        cost_center: None,
        budget_code: Some("RND-2026".to_string()),
        currency: None,
        justification: Some("quarterly restock".to_string()),
        notes: None,
        preferred_supplier_id: None,
    }
}

fn beakers() -> NewRequisitionItem {
    NewRequisitionItem {
        product_id: None,
        item_name: "Beakers".to_string(),
        description: None,
        quantity: dec!(10),
        unit: "EA".to_string(),
        estimated_unit_price: dec!(5.00),
        specifications: None,
        notes: None,
    }
}

#[tokio::test]
async fn full_approval_path() {
    let (engine, mut events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();

    let req = engine
        .requisitions
        .create(&ctx, create_input("Lab restock"))
        .await
        .unwrap();
    assert!(req.number.starts_with("PR-"));
    assert_eq!(req.status(), DocumentStatus::Draft);

    let req = engine.requisitions.add_item(&ctx, req.id, beakers()).await.unwrap();
    assert_eq!(req.estimated_total(), dec!(50.00));

    let req = engine.requisitions.submit(&ctx, req.id).await.unwrap();
    assert_eq!(req.status(), DocumentStatus::Pending);

    let approver = TenantContext::new(ctx.tenant_id, "lena");
    let req = engine.requisitions.approve(&approver, req.id).await.unwrap();
    assert_eq!(req.status(), DocumentStatus::Approved);
    assert_eq!(req.approved_by(), Some("lena"));

    // Each transition published an event.
    assert_matches!(events.recv().await, Some(Event::RequisitionCreated(id)) if id == req.id);
    assert_matches!(events.recv().await, Some(Event::RequisitionSubmitted(_)));
    assert_matches!(events.recv().await, Some(Event::RequisitionApproved(_)));
}

#[tokio::test]
async fn rejected_requisitions_can_be_resubmitted() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();

    let req = engine
        .requisitions
        .create(&ctx, create_input("Over budget"))
        .await
        .unwrap();
    engine.requisitions.add_item(&ctx, req.id, beakers()).await.unwrap();
    engine.requisitions.submit(&ctx, req.id).await.unwrap();
    let req = engine
        .requisitions
        .reject(&ctx, req.id, "too expensive")
        .await
        .unwrap();
    assert_eq!(req.status(), DocumentStatus::Rejected);
    assert_eq!(req.rejection_reason(), Some("too expensive"));

    // Rejected requisitions stay editable for correction.
    engine.requisitions.add_item(&ctx, req.id, beakers()).await.unwrap();
    let req = engine.requisitions.submit(&ctx, req.id).await.unwrap();
    assert_eq!(req.status(), DocumentStatus::Pending);
}

#[tokio::test]
async fn approving_twice_fails_on_status() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();

    let req = engine
        .requisitions
        .create(&ctx, create_input("Once only"))
        .await
        .unwrap();
    engine.requisitions.add_item(&ctx, req.id, beakers()).await.unwrap();
    engine.requisitions.submit(&ctx, req.id).await.unwrap();
    engine.requisitions.approve(&ctx, req.id).await.unwrap();

    assert_matches!(
        engine.requisitions.approve(&ctx, req.id).await,
        Err(ProcurementError::NotModifiable {
            status: DocumentStatus::Approved,
            ..
        })
    );
}

#[tokio::test]
async fn numbers_are_sequential_per_tenant() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();

    let first = engine
        .requisitions
        .create(&ctx, create_input("First"))
        .await
        .unwrap();
    let second = engine
        .requisitions
        .create(&ctx, create_input("Second"))
        .await
        .unwrap();
    assert!(first.number.ends_with("000001"), "{}", first.number);
    assert!(second.number.ends_with("000002"), "{}", second.number);

    // A different tenant starts its own sequence.
    let other = TenantContext::new(Uuid::new_v4(), "kofi");
    let theirs = engine
        .requisitions
        .create(&other, create_input("Theirs"))
        .await
        .unwrap();
    assert!(theirs.number.ends_with("000001"), "{}", theirs.number);
}

#[tokio::test]
async fn cross_tenant_access_reads_as_missing() {
    let (engine, _events) = ProcurementEngine::in_memory(EngineConfig::default());
    let ctx = ctx();
    let req = engine
        .requisitions
        .create(&ctx, create_input("Private"))
        .await
        .unwrap();

    let outsider = TenantContext::new(Uuid::new_v4(), "mallory");
    assert_matches!(
        engine.requisitions.get(&outsider, req.id).await,
        Err(ProcurementError::NotFound(_))
    );

    let page = engine
        .requisitions
        .list(&outsider, DocumentFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

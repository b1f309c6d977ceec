//! Purchase requisition lifecycle.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::EngineConfig;
use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::requisition::NewRequisitionItem;
use crate::models::{PurchaseRequisition, TenantContext};
use crate::numbering::SequenceNumbers;
use crate::store::{DocumentFilter, Page, PageRequest, RequisitionStore};
use crate::workflow::Priority;

/// Input for opening a draft requisition.
#[derive(Debug, Clone, Validate)]
pub struct CreateRequisitionInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub budget_code: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub justification: Option<String>,
    pub notes: Option<String>,
    pub preferred_supplier_id: Option<Uuid>,
}

/// Service for managing purchase requisitions.
#[derive(Clone)]
pub struct RequisitionService {
    store: Arc<dyn RequisitionStore>,
    events: EventSender,
    numbers: Arc<SequenceNumbers>,
    config: Arc<EngineConfig>,
}

impl RequisitionService {
    pub fn new(
        store: Arc<dyn RequisitionStore>,
        events: EventSender,
        numbers: Arc<SequenceNumbers>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            events,
            numbers,
            config,
        }
    }

    /// Draws candidate numbers until one is free. A generator rebuilt after
    /// restart converges onto the tail of the taken range.
    async fn allocate_number(&self, tenant_id: Uuid) -> Result<String, ProcurementError> {
        loop {
            let candidate = self
                .numbers
                .next(tenant_id, &self.config.numbering.requisition_prefix);
            if !self.store.number_taken(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
    }

    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateRequisitionInput,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        input.validate()?;
        let number = self.allocate_number(ctx.tenant_id).await?;
        let mut requisition = PurchaseRequisition::new(
            ctx.tenant_id,
            number,
            input.title,
            Utc::now().date_naive(),
            ctx.actor.clone(),
        );
        requisition.description = input.description;
        requisition.required_date = input.required_date;
        if let Some(priority) = input.priority {
            requisition.priority = priority;
        }
        requisition.department = input.department;
        requisition.cost_center = input.cost_center;
        requisition.budget_code = input.budget_code;
        if let Some(currency) = input.currency {
            requisition.currency = currency;
        }
        requisition.justification = input.justification;
        requisition.notes = input.notes;
        requisition.preferred_supplier_id = input.preferred_supplier_id;

        let requisition = self.store.insert(requisition).await?;
        info!(requisition_id = %requisition.id, number = %requisition.number, "requisition created");
        self.events
            .emit(Event::RequisitionCreated(requisition.id))
            .await;
        Ok(requisition)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseRequisition>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    #[instrument(skip(self, item))]
    pub async fn add_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item: NewRequisitionItem,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.add_item(item, &ctx.actor)?;
        self.store.save(requisition).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.remove_item(item_id, &ctx.actor)?;
        self.store.save(requisition).await
    }

    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.submit(&ctx.actor)?;
        let requisition = self.store.save(requisition).await?;
        info!(requisition_id = %requisition.id, "requisition submitted");
        self.events
            .emit(Event::RequisitionSubmitted(requisition.id))
            .await;
        Ok(requisition)
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.approve(&ctx.actor)?;
        let requisition = self.store.save(requisition).await?;
        info!(requisition_id = %requisition.id, approver = %ctx.actor, "requisition approved");
        self.events
            .emit(Event::RequisitionApproved(requisition.id))
            .await;
        Ok(requisition)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.reject(&ctx.actor, reason)?;
        let requisition = self.store.save(requisition).await?;
        self.events
            .emit(Event::RequisitionRejected(requisition.id))
            .await;
        Ok(requisition)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        let mut requisition = self.store.find(ctx.tenant_id, id).await?;
        requisition.cancel(&ctx.actor, reason)?;
        let requisition = self.store.save(requisition).await?;
        self.events
            .emit(Event::RequisitionCancelled(requisition.id))
            .await;
        Ok(requisition)
    }
}

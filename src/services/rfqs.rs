//! RFQ lifecycle, including sourcing from approved requisitions.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::EngineConfig;
use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::rfq::NewRfqItem;
use crate::models::{RequestForQuotation, TenantContext};
use crate::numbering::SequenceNumbers;
use crate::store::{DocumentFilter, Page, PageRequest, RequisitionStore, RfqStore};
use crate::workflow::DocumentStatus;

/// Input for opening a draft RFQ. Omitted dates fall back to the configured
/// closing and validity windows.
#[derive(Debug, Clone, Validate)]
pub struct CreateRfqInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
    pub validity_date: Option<NaiveDate>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub delivery_requirements: Option<String>,
    pub payment_terms: Option<String>,
    pub evaluation_criteria: Option<String>,
    pub notes: Option<String>,
    pub supplier_id: Option<Uuid>,
}

/// Service for managing requests for quotation.
#[derive(Clone)]
pub struct RfqService {
    store: Arc<dyn RfqStore>,
    requisitions: Arc<dyn RequisitionStore>,
    events: EventSender,
    numbers: Arc<SequenceNumbers>,
    config: Arc<EngineConfig>,
}

impl RfqService {
    pub fn new(
        store: Arc<dyn RfqStore>,
        requisitions: Arc<dyn RequisitionStore>,
        events: EventSender,
        numbers: Arc<SequenceNumbers>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            requisitions,
            events,
            numbers,
            config,
        }
    }

    async fn allocate_number(&self, tenant_id: Uuid) -> Result<String, ProcurementError> {
        loop {
            let candidate = self
                .numbers
                .next(tenant_id, &self.config.numbering.rfq_prefix);
            if !self.store.number_taken(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
    }

    fn resolve_dates(
        &self,
        input_issue: Option<NaiveDate>,
        input_closing: Option<NaiveDate>,
        input_validity: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate, NaiveDate), ProcurementError> {
        let issue = input_issue.unwrap_or_else(|| Utc::now().date_naive());
        let closing = match input_closing {
            Some(date) => date,
            None => issue
                .checked_add_days(Days::new(self.config.rfq_closing_days as u64))
                .ok_or_else(|| {
                    ProcurementError::Validation("closing date out of range".to_string())
                })?,
        };
        let validity = match input_validity {
            Some(date) => date,
            None => closing
                .checked_add_days(Days::new(self.config.rfq_validity_days as u64))
                .ok_or_else(|| {
                    ProcurementError::Validation("validity date out of range".to_string())
                })?,
        };
        Ok((issue, closing, validity))
    }

    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateRfqInput,
    ) -> Result<RequestForQuotation, ProcurementError> {
        input.validate()?;
        let (issue, closing, validity) =
            self.resolve_dates(input.issue_date, input.closing_date, input.validity_date)?;
        let number = self.allocate_number(ctx.tenant_id).await?;
        let mut rfq = RequestForQuotation::new(
            ctx.tenant_id,
            number,
            input.title,
            issue,
            closing,
            validity,
            ctx.actor.clone(),
        )?;
        rfq.description = input.description;
        if let Some(currency) = input.currency {
            rfq.currency = currency;
        }
        rfq.terms_and_conditions = input.terms_and_conditions;
        rfq.delivery_requirements = input.delivery_requirements;
        rfq.payment_terms = input.payment_terms;
        rfq.evaluation_criteria = input.evaluation_criteria;
        rfq.notes = input.notes;
        rfq.supplier_id = input.supplier_id;

        let rfq = self.store.insert(rfq).await?;
        info!(rfq_id = %rfq.id, number = %rfq.number, "rfq created");
        Ok(rfq)
    }

    /// Sources an RFQ from an approved requisition, copying its lines as
    /// unpriced requirements.
    #[instrument(skip(self, input))]
    pub async fn create_from_requisition(
        &self,
        ctx: &TenantContext,
        requisition_id: Uuid,
        input: CreateRfqInput,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let requisition = self.requisitions.find(ctx.tenant_id, requisition_id).await?;
        if requisition.status() != DocumentStatus::Approved {
            return Err(ProcurementError::Validation(format!(
                "requisition {} must be approved before sourcing, currently {}",
                requisition.number,
                requisition.status()
            )));
        }
        let mut rfq = self.create(ctx, input).await?;
        rfq.requisition_id = Some(requisition.id);
        for line in requisition.items() {
            rfq.add_item(
                NewRfqItem {
                    product_id: line.product_id,
                    item_name: line.item_name.clone(),
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit: line.unit.clone(),
                    specifications: line.specifications.clone(),
                    technical_requirements: None,
                    notes: line.notes.clone(),
                },
                &ctx.actor,
            )?;
        }
        self.store.save(rfq).await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<RequestForQuotation>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    #[instrument(skip(self, item))]
    pub async fn add_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item: NewRfqItem,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let mut rfq = self.store.find(ctx.tenant_id, id).await?;
        rfq.add_item(item, &ctx.actor)?;
        self.store.save(rfq).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let mut rfq = self.store.find(ctx.tenant_id, id).await?;
        rfq.remove_item(item_id, &ctx.actor)?;
        self.store.save(rfq).await
    }

    #[instrument(skip(self))]
    pub async fn publish(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let mut rfq = self.store.find(ctx.tenant_id, id).await?;
        rfq.publish(&ctx.actor)?;
        let rfq = self.store.save(rfq).await?;
        info!(rfq_id = %rfq.id, "rfq published");
        self.events.emit(Event::RfqPublished(rfq.id)).await;
        Ok(rfq)
    }

    /// Closes the RFQ to further quotations once its closing date has passed.
    #[instrument(skip(self))]
    pub async fn close(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let mut rfq = self.store.find(ctx.tenant_id, id).await?;
        rfq.close(&ctx.actor, Utc::now().date_naive())?;
        let rfq = self.store.save(rfq).await?;
        info!(rfq_id = %rfq.id, "rfq closed");
        self.events.emit(Event::RfqClosed(rfq.id)).await;
        Ok(rfq)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<RequestForQuotation, ProcurementError> {
        let mut rfq = self.store.find(ctx.tenant_id, id).await?;
        rfq.cancel(&ctx.actor, reason)?;
        let rfq = self.store.save(rfq).await?;
        self.events.emit(Event::RfqCancelled(rfq.id)).await;
        Ok(rfq)
    }
}

//! Supplier quotation lifecycle: capture, evaluation, winner selection.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::EngineConfig;
use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::quotation::NewQuotationItem;
use crate::models::{SupplierQuotation, TenantContext};
use crate::numbering::SequenceNumbers;
use crate::store::{DocumentFilter, Page, PageRequest, QuotationStore, RfqStore};
use crate::workflow::DocumentStatus;

/// Input for capturing a supplier's quotation against a published RFQ.
#[derive(Debug, Clone, Validate)]
pub struct CreateQuotationInput {
    pub rfq_id: Uuid,
    pub supplier_id: Uuid,
    pub quotation_date: Option<NaiveDate>,
    pub validity_date: Option<NaiveDate>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    #[validate(range(max = 3650))]
    pub delivery_lead_time_days: Option<u32>,
    #[validate(range(max = 600))]
    pub warranty_period_months: Option<u32>,
    pub contact_person: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}

/// Service for managing supplier quotations.
#[derive(Clone)]
pub struct QuotationService {
    store: Arc<dyn QuotationStore>,
    rfqs: Arc<dyn RfqStore>,
    events: EventSender,
    numbers: Arc<SequenceNumbers>,
    config: Arc<EngineConfig>,
}

impl QuotationService {
    pub fn new(
        store: Arc<dyn QuotationStore>,
        rfqs: Arc<dyn RfqStore>,
        events: EventSender,
        numbers: Arc<SequenceNumbers>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            rfqs,
            events,
            numbers,
            config,
        }
    }

    async fn allocate_number(&self, tenant_id: Uuid) -> Result<String, ProcurementError> {
        loop {
            let candidate = self
                .numbers
                .next(tenant_id, &self.config.numbering.quotation_prefix);
            if !self.store.number_taken(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
    }

    /// Captures a draft quotation. The RFQ must be published and still open.
    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateQuotationInput,
    ) -> Result<SupplierQuotation, ProcurementError> {
        input.validate()?;
        let rfq = self.rfqs.find(ctx.tenant_id, input.rfq_id).await?;
        if rfq.status() != DocumentStatus::Pending {
            return Err(ProcurementError::Validation(format!(
                "rfq {} is not open for quotations, currently {}",
                rfq.number,
                rfq.status()
            )));
        }
        if let Some(target) = rfq.supplier_id {
            if target != input.supplier_id {
                return Err(ProcurementError::Validation(format!(
                    "rfq {} is addressed to a different supplier",
                    rfq.number
                )));
            }
        }

        let quotation_date = input.quotation_date.unwrap_or_else(|| Utc::now().date_naive());
        let validity_date = match input.validity_date {
            Some(date) => date,
            None => quotation_date
                .checked_add_days(Days::new(self.config.quotation_validity_days as u64))
                .ok_or_else(|| {
                    ProcurementError::Validation("validity date out of range".to_string())
                })?,
        };
        let number = self.allocate_number(ctx.tenant_id).await?;
        let mut quotation = SupplierQuotation::new(
            ctx.tenant_id,
            number,
            rfq.id,
            input.supplier_id,
            quotation_date,
            validity_date,
            ctx.actor.clone(),
        )?;
        if let Some(currency) = input.currency {
            quotation.currency = currency;
        }
        if let Some(rate) = input.exchange_rate {
            if rate <= Decimal::ZERO {
                return Err(ProcurementError::Validation(format!(
                    "exchange rate must be positive, got {}",
                    rate
                )));
            }
            quotation.exchange_rate = rate;
        }
        quotation.payment_terms = input.payment_terms;
        quotation.delivery_terms = input.delivery_terms;
        quotation.delivery_lead_time_days = input.delivery_lead_time_days;
        quotation.warranty_period_months = input.warranty_period_months;
        quotation.contact_person = input.contact_person;
        quotation.contact_email = input.contact_email;
        quotation.notes = input.notes;

        let quotation = self.store.insert(quotation).await?;
        info!(quotation_id = %quotation.id, number = %quotation.number, "quotation captured");
        Ok(quotation)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierQuotation, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierQuotation>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    /// All quotations received against one RFQ, for side-by-side comparison.
    #[instrument(skip(self))]
    pub async fn list_for_rfq(
        &self,
        ctx: &TenantContext,
        rfq_id: Uuid,
    ) -> Result<Vec<SupplierQuotation>, ProcurementError> {
        self.store.find_by_rfq(ctx.tenant_id, rfq_id).await
    }

    #[instrument(skip(self, item))]
    pub async fn add_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item: NewQuotationItem,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.add_item(item, self.config.quotation_tax_mode, &ctx.actor)?;
        self.store.save(quotation).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.remove_item(item_id, self.config.quotation_tax_mode, &ctx.actor)?;
        self.store.save(quotation).await
    }

    #[instrument(skip(self))]
    pub async fn set_charges(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        tax_rate: Decimal,
        shipping_cost: Decimal,
        discount_amount: Decimal,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.set_charges(
            tax_rate,
            shipping_cost,
            discount_amount,
            self.config.quotation_tax_mode,
            &ctx.actor,
        )?;
        self.store.save(quotation).await
    }

    /// Freezes the quotation's priced content. DRAFT -> PENDING.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.submit(self.config.quotation_tax_mode, &ctx.actor)?;
        let quotation = self.store.save(quotation).await?;
        info!(quotation_id = %quotation.id, "quotation submitted");
        self.events
            .emit(Event::QuotationSubmitted(quotation.id))
            .await;
        Ok(quotation)
    }

    /// Scores a submitted quotation. PENDING -> APPROVED.
    #[instrument(skip(self, notes))]
    pub async fn evaluate(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        technical: Decimal,
        commercial: Decimal,
        notes: Option<String>,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.evaluate(
            technical,
            commercial,
            notes,
            &self.config.quotation_score_weights,
            &ctx.actor,
        )?;
        let quotation = self.store.save(quotation).await?;
        if let Some(overall) = quotation.overall_score() {
            info!(quotation_id = %quotation.id, %overall, "quotation evaluated");
            self.events
                .emit(Event::QuotationEvaluated {
                    quotation_id: quotation.id,
                    overall_score: overall,
                })
                .await;
        }
        Ok(quotation)
    }

    /// Declares one quotation the RFQ's winner. The RFQ must be closed and
    /// still within its validity window, and the quotation itself must not
    /// have expired; any previously selected winner on the same RFQ is
    /// demoted in the same store operation.
    #[instrument(skip(self, reason))]
    pub async fn select_winner(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        let rfq = self.rfqs.find(ctx.tenant_id, quotation.rfq_id).await?;
        if !rfq.is_closed() {
            return Err(ProcurementError::Validation(format!(
                "rfq {} must be closed before selecting a winner, currently {}",
                rfq.number,
                rfq.status()
            )));
        }
        let today = Utc::now().date_naive();
        if rfq.is_expired(today) {
            return Err(ProcurementError::Validation(format!(
                "rfq {} expired on {}, winner selection is no longer possible",
                rfq.number, rfq.validity_date
            )));
        }
        if quotation.is_expired(today) {
            return Err(ProcurementError::Validation(format!(
                "quotation {} expired on {} and is no longer eligible for selection",
                quotation.number, quotation.validity_date
            )));
        }

        quotation.select_as_winner(&ctx.actor, reason)?;
        let quotation = self.store.save_winner(quotation).await?;
        info!(quotation_id = %quotation.id, rfq_id = %rfq.id, "winner selected");
        self.events
            .emit(Event::QuotationWinnerSelected {
                rfq_id: rfq.id,
                quotation_id: quotation.id,
            })
            .await;
        Ok(quotation)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.reject(&ctx.actor, reason)?;
        let quotation = self.store.save(quotation).await?;
        self.events
            .emit(Event::QuotationRejected(quotation.id))
            .await;
        Ok(quotation)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<SupplierQuotation, ProcurementError> {
        let mut quotation = self.store.find(ctx.tenant_id, id).await?;
        quotation.cancel(&ctx.actor, reason)?;
        let quotation = self.store.save(quotation).await?;
        self.events
            .emit(Event::QuotationCancelled(quotation.id))
            .await;
        Ok(quotation)
    }
}

//! Purchase order lifecycle: approval, transmission, shipping, receiving.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::EngineConfig;
use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::purchase_order::NewPurchaseOrderItem;
use crate::models::{PurchaseOrder, TenantContext};
use crate::numbering::SequenceNumbers;
use crate::store::{DocumentFilter, Page, PageRequest, PurchaseOrderStore, QuotationStore};
use crate::workflow::{DocumentStatus, Priority};

/// Input for opening a draft purchase order.
#[derive(Debug, Clone, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub delivery_address: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub budget_code: Option<String>,
    pub notes: Option<String>,
}

/// Service for managing purchase orders.
#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn PurchaseOrderStore>,
    quotations: Arc<dyn QuotationStore>,
    events: EventSender,
    numbers: Arc<SequenceNumbers>,
    config: Arc<EngineConfig>,
}

impl PurchaseOrderService {
    pub fn new(
        store: Arc<dyn PurchaseOrderStore>,
        quotations: Arc<dyn QuotationStore>,
        events: EventSender,
        numbers: Arc<SequenceNumbers>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            quotations,
            events,
            numbers,
            config,
        }
    }

    async fn allocate_number(&self, tenant_id: Uuid) -> Result<String, ProcurementError> {
        loop {
            let candidate = self
                .numbers
                .next(tenant_id, &self.config.numbering.purchase_order_prefix);
            if !self.store.number_taken(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
    }

    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrder, ProcurementError> {
        input.validate()?;
        let number = self.allocate_number(ctx.tenant_id).await?;
        let mut order = PurchaseOrder::new(
            ctx.tenant_id,
            number,
            input.supplier_id,
            input.order_date.unwrap_or_else(|| Utc::now().date_naive()),
            ctx.actor.clone(),
        );
        order.expected_delivery_date = input.expected_delivery_date;
        if let Some(priority) = input.priority {
            order.priority = priority;
        }
        if let Some(currency) = input.currency {
            order.currency = currency;
        }
        if let Some(rate) = input.exchange_rate {
            if rate <= Decimal::ZERO {
                return Err(ProcurementError::Validation(format!(
                    "exchange rate must be positive, got {}",
                    rate
                )));
            }
            order.exchange_rate = rate;
        }
        order.payment_terms = input.payment_terms;
        order.delivery_terms = input.delivery_terms;
        order.delivery_address = input.delivery_address;
        order.department = input.department;
        order.cost_center = input.cost_center;
        order.budget_code = input.budget_code;
        order.notes = input.notes;

        let order = self.store.insert(order).await?;
        info!(purchase_order_id = %order.id, number = %order.number, "purchase order created");
        self.events.emit(Event::PurchaseOrderCreated(order.id)).await;
        Ok(order)
    }

    /// Raises a purchase order from a winning quotation: supplier, pricing,
    /// terms, and lines carry over; quantities remain editable in DRAFT.
    #[instrument(skip(self, input))]
    pub async fn create_from_quotation(
        &self,
        ctx: &TenantContext,
        quotation_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let quotation = self.quotations.find(ctx.tenant_id, quotation_id).await?;
        if !quotation.is_selected() {
            return Err(ProcurementError::Validation(format!(
                "quotation {} is not the selected winner of its rfq",
                quotation.number
            )));
        }
        if input.supplier_id != quotation.supplier_id {
            return Err(ProcurementError::Validation(
                "purchase order supplier must match the winning quotation's supplier".to_string(),
            ));
        }

        let mut order = self.create(ctx, input).await?;
        order.quotation_id = Some(quotation.id);
        if order.payment_terms.is_none() {
            order.payment_terms = quotation.payment_terms.clone();
        }
        if order.delivery_terms.is_none() {
            order.delivery_terms = quotation.delivery_terms.clone();
        }
        order.currency = quotation.currency.clone();
        order.exchange_rate = quotation.exchange_rate;
        let expected_delivery_date = order.expected_delivery_date;
        for line in quotation.items() {
            order.add_item(
                NewPurchaseOrderItem {
                    quotation_item_id: Some(line.id),
                    product_id: line.product_id,
                    item_name: line.item_name.clone(),
                    description: line.description.clone(),
                    ordered_quantity: line.quantity,
                    unit: line.unit.clone(),
                    unit_price: line.unit_price,
                    discount_percentage: line.discount_percentage,
                    discount_amount: None,
                    tax_rate: line.tax_rate,
                    expected_delivery_date,
                    notes: line.notes.clone(),
                },
                self.config.purchase_order_tax_mode,
                &ctx.actor,
            )?;
        }
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrder>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    #[instrument(skip(self, item))]
    pub async fn add_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item: NewPurchaseOrderItem,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.add_item(item, self.config.purchase_order_tax_mode, &ctx.actor)?;
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.remove_item(item_id, self.config.purchase_order_tax_mode, &ctx.actor)?;
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn set_charges(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        tax_rate: Decimal,
        shipping_cost: Decimal,
        discount_amount: Decimal,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.set_charges(
            tax_rate,
            shipping_cost,
            discount_amount,
            self.config.purchase_order_tax_mode,
            &ctx.actor,
        )?;
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.submit(self.config.purchase_order_tax_mode, &ctx.actor)?;
        let order = self.store.save(order).await?;
        info!(purchase_order_id = %order.id, "purchase order submitted");
        self.events
            .emit(Event::PurchaseOrderSubmitted(order.id))
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.approve(&ctx.actor)?;
        let order = self.store.save(order).await?;
        info!(purchase_order_id = %order.id, approver = %ctx.actor, "purchase order approved");
        self.events
            .emit(Event::PurchaseOrderApproved(order.id))
            .await;
        Ok(order)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.reject(&ctx.actor, reason)?;
        let order = self.store.save(order).await?;
        self.events
            .emit(Event::PurchaseOrderRejected(order.id))
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn send_to_supplier(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.send_to_supplier(&ctx.actor)?;
        let order = self.store.save(order).await?;
        self.events
            .emit(Event::PurchaseOrderSentToSupplier(order.id))
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn acknowledge(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.acknowledge(&ctx.actor)?;
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn ship(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.ship(tracking_number, carrier, &ctx.actor)?;
        let order = self.store.save(order).await?;
        self.events.emit(Event::PurchaseOrderShipped(order.id)).await;
        Ok(order)
    }

    /// Records a receipt against one line. When the receipt closes the last
    /// open line the order completes and a delivery event follows.
    #[instrument(skip(self, notes))]
    pub async fn receive_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
        notes: Option<&str>,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.receive_item(item_id, quantity, notes, &ctx.actor)?;
        let completed = order.status() == DocumentStatus::Completed;
        let order = self.store.save(order).await?;
        info!(purchase_order_id = %order.id, %item_id, %quantity, "receipt recorded");
        self.events
            .emit(Event::PurchaseOrderItemReceived {
                purchase_order_id: order.id,
                item_id,
                quantity,
            })
            .await;
        if completed {
            self.events
                .emit(Event::PurchaseOrderDelivered(order.id))
                .await;
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn cancel_item_quantity(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.cancel_item_quantity(item_id, quantity, &ctx.actor)?;
        self.store.save(order).await
    }

    #[instrument(skip(self))]
    pub async fn deliver(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.deliver(&ctx.actor)?;
        let order = self.store.save(order).await?;
        info!(purchase_order_id = %order.id, "purchase order delivered");
        self.events
            .emit(Event::PurchaseOrderDelivered(order.id))
            .await;
        Ok(order)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<PurchaseOrder, ProcurementError> {
        let mut order = self.store.find(ctx.tenant_id, id).await?;
        order.cancel(&ctx.actor, reason)?;
        let order = self.store.save(order).await?;
        self.events
            .emit(Event::PurchaseOrderCancelled(order.id))
            .await;
        Ok(order)
    }
}

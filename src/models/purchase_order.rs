//! Purchase orders and their line items, including incremental receiving.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TaxMode;
use crate::errors::ProcurementError;
use crate::totals::{self, round_money, DocumentTotals};
use crate::workflow::{self, Action, DocumentKind, DocumentStatus, Priority};

const KIND: DocumentKind = DocumentKind::PurchaseOrder;

/// An ordered line on a purchase order. Receiving and cancellation are
/// tracked per line; `received + cancelled <= ordered` holds at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub line_number: u32,
    /// The winning quotation line this order line was drawn from, if any.
    pub quotation_item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub ordered_quantity: Decimal,
    received_quantity: Decimal,
    cancelled_quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount_percentage: Option<Decimal>,
    discount_amount: Decimal,
    pub tax_rate: Option<Decimal>,
    tax_amount: Decimal,
    total_price: Decimal,
    pub expected_delivery_date: Option<NaiveDate>,
    last_received_date: Option<NaiveDate>,
    receiving_notes: Option<String>,
    pub notes: Option<String>,
}

impl PurchaseOrderItem {
    pub fn received_quantity(&self) -> Decimal {
        self.received_quantity
    }

    pub fn cancelled_quantity(&self) -> Decimal {
        self.cancelled_quantity
    }

    /// Post-discount line total, excluding tax.
    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn last_received_date(&self) -> Option<NaiveDate> {
        self.last_received_date
    }

    pub fn receiving_notes(&self) -> Option<&str> {
        self.receiving_notes.as_deref()
    }

    /// Quantity still open: ordered minus received minus cancelled.
    pub fn pending_quantity(&self) -> Decimal {
        self.ordered_quantity - self.received_quantity - self.cancelled_quantity
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.ordered_quantity
    }

    pub fn is_partially_received(&self) -> bool {
        self.received_quantity > Decimal::ZERO && !self.is_fully_received()
    }

    /// No quantity left open, whether by receipt or cancellation.
    pub fn is_closed(&self) -> bool {
        self.pending_quantity() <= Decimal::ZERO
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.expected_delivery_date, Some(expected) if today > expected)
            && !self.is_closed()
    }
}

/// Fields for adding a purchase order line.
#[derive(Debug, Clone)]
pub struct NewPurchaseOrderItem {
    pub quotation_item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub ordered_quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Binding commitment to buy, derived from an approved requisition and/or a
/// winning quotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub supplier_id: Uuid,
    pub requisition_id: Option<Uuid>,
    pub quotation_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
    pub priority: Priority,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub delivery_address: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub budget_code: Option<String>,
    pub notes: Option<String>,

    status: DocumentStatus,
    items: Vec<PurchaseOrderItem>,

    tax_rate: Decimal,
    shipping_cost: Decimal,
    discount_amount: Decimal,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,

    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejection_reason: Option<String>,
    sent_to_supplier_at: Option<DateTime<Utc>>,
    sent_by: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    carrier: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl PurchaseOrder {
    pub fn new(
        tenant_id: Uuid,
        number: String,
        supplier_id: Uuid,
        order_date: NaiveDate,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            supplier_id,
            requisition_id: None,
            quotation_id: None,
            order_date,
            expected_delivery_date: None,
            priority: Priority::default(),
            currency: "USD".to_string(),
            exchange_rate: Decimal::ONE,
            payment_terms: None,
            delivery_terms: None,
            delivery_address: None,
            department: None,
            cost_center: None,
            budget_code: None,
            notes: None,
            status: DocumentStatus::Draft,
            items: Vec::new(),
            tax_rate: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            submitted_at: None,
            submitted_by: None,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            sent_to_supplier_at: None,
            sent_by: None,
            acknowledged_at: None,
            shipped_at: None,
            tracking_number: None,
            carrier: None,
            delivered_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[PurchaseOrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: Uuid) -> Option<&PurchaseOrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn sent_to_supplier_at(&self) -> Option<DateTime<Utc>> {
        self.sent_to_supplier_at
    }

    pub fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn is_modifiable(&self) -> bool {
        workflow::is_modifiable(KIND, self.status)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.expected_delivery_date, Some(expected) if today > expected)
            && !self.status.is_terminal()
    }

    pub fn add_item(
        &mut self,
        item: NewPurchaseOrderItem,
        mode: TaxMode,
        actor: &str,
    ) -> Result<Uuid, ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        if item.item_name.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "item name must not be empty".to_string(),
            ));
        }
        let line = totals::line_total(
            item.ordered_quantity,
            item.unit_price,
            item.discount_percentage,
            item.discount_amount,
            item.tax_rate,
        )?;
        let item_id = Uuid::new_v4();
        self.items.push(PurchaseOrderItem {
            id: item_id,
            line_number: self.items.len() as u32 + 1,
            quotation_item_id: item.quotation_item_id,
            product_id: item.product_id,
            item_name: item.item_name,
            description: item.description,
            ordered_quantity: item.ordered_quantity,
            received_quantity: Decimal::ZERO,
            cancelled_quantity: Decimal::ZERO,
            unit: item.unit,
            unit_price: item.unit_price,
            discount_percentage: item.discount_percentage,
            discount_amount: line.discount_applied,
            tax_rate: item.tax_rate,
            tax_amount: line.tax_applied,
            total_price: line.total,
            expected_delivery_date: item.expected_delivery_date,
            last_received_date: None,
            receiving_notes: None,
            notes: item.notes,
        });
        self.recompute_totals(mode)?;
        self.touch(actor);
        Ok(item_id)
    }

    pub fn remove_item(
        &mut self,
        item_id: Uuid,
        mode: TaxMode,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() == before {
            return Err(ProcurementError::not_found("purchase order item", item_id));
        }
        for (index, item) in self.items.iter_mut().enumerate() {
            item.line_number = index as u32 + 1;
        }
        self.recompute_totals(mode)?;
        self.touch(actor);
        Ok(())
    }

    /// Sets document-level tax rate, shipping, and discount, then recomputes.
    pub fn set_charges(
        &mut self,
        tax_rate: Decimal,
        shipping_cost: Decimal,
        discount_amount: Decimal,
        mode: TaxMode,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        self.tax_rate = tax_rate;
        self.shipping_cost = shipping_cost;
        self.discount_amount = discount_amount;
        self.recompute_totals(mode)?;
        self.touch(actor);
        Ok(())
    }

    /// DRAFT -> PENDING. Requires at least one line.
    pub fn submit(&mut self, mode: TaxMode, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Submit)?;
        if self.items.is_empty() {
            return Err(ProcurementError::Validation(
                "purchase order must have at least one item before submission".to_string(),
            ));
        }
        self.recompute_totals(mode)?;
        self.status = DocumentStatus::Pending;
        self.submitted_at = Some(Utc::now());
        self.submitted_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// PENDING -> APPROVED.
    pub fn approve(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Approve)?;
        self.status = DocumentStatus::Approved;
        self.approved_at = Some(Utc::now());
        self.approved_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// PENDING -> REJECTED.
    pub fn reject(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Reject)?;
        self.status = DocumentStatus::Rejected;
        self.rejected_at = Some(Utc::now());
        self.rejected_by = Some(actor.to_string());
        self.rejection_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Stamp-only: records transmission to the supplier. Requires APPROVED;
    /// the status does not change.
    pub fn send_to_supplier(&mut self, actor: &str) -> Result<(), ProcurementError> {
        if self.status != DocumentStatus::Approved {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        self.sent_to_supplier_at = Some(Utc::now());
        self.sent_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Stamp-only: the supplier acknowledged the order.
    pub fn acknowledge(&mut self, actor: &str) -> Result<(), ProcurementError> {
        if self.status.is_terminal() {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        self.acknowledged_at = Some(Utc::now());
        self.touch(actor);
        Ok(())
    }

    /// Stamp-only: records carrier and tracking for a shipment under way.
    /// Requires a tracking number and a non-terminal status.
    pub fn ship(
        &mut self,
        tracking_number: &str,
        carrier: &str,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        if self.status.is_terminal() {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        if tracking_number.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "tracking number is required to record a shipment".to_string(),
            ));
        }
        self.shipped_at = Some(Utc::now());
        self.tracking_number = Some(tracking_number.to_string());
        self.carrier = Some(carrier.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Any non-terminal status -> COMPLETED, stamping the delivery time.
    pub fn deliver(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Deliver)?;
        self.status = DocumentStatus::Completed;
        self.delivered_at = Some(Utc::now());
        self.touch(actor);
        Ok(())
    }

    /// Records a receipt against one line. Receiving beyond the open
    /// quantity is an invariant violation; nothing is recorded in that case.
    /// When the receipt closes the last open line, the order completes.
    pub fn receive_item(
        &mut self,
        item_id: Uuid,
        quantity: Decimal,
        notes: Option<&str>,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        if self.status != DocumentStatus::Approved {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        if quantity <= Decimal::ZERO {
            return Err(ProcurementError::Validation(format!(
                "received quantity must be positive, got {}",
                quantity
            )));
        }
        let today = Utc::now().date_naive();
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ProcurementError::not_found("purchase order item", item_id))?;
        if quantity > item.pending_quantity() {
            return Err(ProcurementError::InvariantViolation(format!(
                "receiving {} would exceed ordered quantity {} (received {}, cancelled {})",
                quantity, item.ordered_quantity, item.received_quantity, item.cancelled_quantity
            )));
        }
        item.received_quantity += quantity;
        item.last_received_date = Some(today);
        if let Some(note) = notes.filter(|n| !n.trim().is_empty()) {
            item.receiving_notes = Some(match item.receiving_notes.take() {
                Some(existing) => format!("{}\n{}: {}", existing, today, note),
                None => note.to_string(),
            });
        }
        self.touch(actor);
        if self.items.iter().all(|item| item.is_closed()) {
            self.deliver(actor)?;
        }
        Ok(())
    }

    /// Cancels part of a line's open quantity.
    pub fn cancel_item_quantity(
        &mut self,
        item_id: Uuid,
        quantity: Decimal,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        if self.status.is_terminal() {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        if quantity <= Decimal::ZERO {
            return Err(ProcurementError::Validation(format!(
                "cancelled quantity must be positive, got {}",
                quantity
            )));
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ProcurementError::not_found("purchase order item", item_id))?;
        if quantity > item.pending_quantity() {
            return Err(ProcurementError::InvariantViolation(format!(
                "cancelling {} would exceed ordered quantity {} (received {}, cancelled {})",
                quantity, item.ordered_quantity, item.received_quantity, item.cancelled_quantity
            )));
        }
        item.cancelled_quantity += quantity;
        self.touch(actor);
        Ok(())
    }

    pub fn cancel(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Cancel)?;
        self.status = DocumentStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        self.cancelled_by = Some(actor.to_string());
        self.cancellation_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    fn recompute_totals(&mut self, mode: TaxMode) -> Result<(), ProcurementError> {
        let item_totals: Vec<Decimal> = match mode {
            TaxMode::ItemLevel => self
                .items
                .iter()
                .map(|item| round_money(item.total_price + item.tax_amount))
                .collect(),
            TaxMode::DocumentLevel | TaxMode::None => {
                self.items.iter().map(|item| item.total_price).collect()
            }
        };
        let document_tax_rate = match mode {
            TaxMode::DocumentLevel => self.tax_rate,
            TaxMode::ItemLevel | TaxMode::None => Decimal::ZERO,
        };
        let DocumentTotals {
            subtotal,
            tax_amount,
            total_amount,
        } = totals::document_totals(
            &item_totals,
            document_tax_rate,
            self.shipping_cost,
            self.discount_amount,
        )?;
        self.subtotal = subtotal;
        self.tax_amount = tax_amount;
        self.total_amount = total_amount;
        Ok(())
    }

    fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn order_with_item(ordered: Decimal) -> (PurchaseOrder, Uuid) {
        let mut po = PurchaseOrder::new(
            Uuid::new_v4(),
            "PO-2026-000001".to_string(),
            Uuid::new_v4(),
            Utc::now().date_naive(),
            "buyer".to_string(),
        );
        let item = po
            .add_item(
                NewPurchaseOrderItem {
                    quotation_item_id: None,
                    product_id: None,
                    item_name: "Beakers".to_string(),
                    description: None,
                    ordered_quantity: ordered,
                    unit: "EA".to_string(),
                    unit_price: dec!(5.00),
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
        (po, item)
    }

    #[test]
    fn over_receiving_is_an_invariant_violation() {
        let (mut po, item_id) = order_with_item(dec!(100));
        po.receive_item(item_id, dec!(60), None, "warehouse").unwrap();
        assert_matches!(
            po.receive_item(item_id, dec!(50), None, "warehouse"),
            Err(ProcurementError::InvariantViolation(_))
        );
        // The failed receipt recorded nothing.
        assert_eq!(po.item(item_id).unwrap().received_quantity(), dec!(60));

        po.receive_item(item_id, dec!(40), None, "warehouse").unwrap();
        let item = po.item(item_id).unwrap();
        assert!(item.is_fully_received());
        assert_eq!(item.pending_quantity(), dec!(0));
    }

    #[test]
    fn receiving_the_last_open_line_completes_the_order() {
        let (mut po, item_id) = order_with_item(dec!(10));
        po.receive_item(item_id, dec!(10), Some("dock 3"), "warehouse")
            .unwrap();
        assert_eq!(po.status(), DocumentStatus::Completed);
        assert!(po.delivered_at().is_some());
        assert_eq!(po.item(item_id).unwrap().receiving_notes(), Some("dock 3"));
    }

    #[test]
    fn cancelled_quantity_counts_toward_closure() {
        let (mut po, item_id) = order_with_item(dec!(100));
        po.receive_item(item_id, dec!(60), None, "warehouse").unwrap();
        po.cancel_item_quantity(item_id, dec!(40), "buyer").unwrap();
        let item = po.item(item_id).unwrap();
        assert!(item.is_closed());
        assert!(!item.is_fully_received());
        assert_matches!(
            po.receive_item(item_id, dec!(1), None, "warehouse"),
            Err(ProcurementError::InvariantViolation(_)) | Err(ProcurementError::NotModifiable { .. })
        );
    }

    #[test]
    fn ship_requires_a_tracking_number() {
        let (mut po, _) = order_with_item(dec!(10));
        assert_matches!(
            po.ship("  ", "DHL", "buyer"),
            Err(ProcurementError::Validation(_))
        );
        po.ship("TRK-123", "DHL", "buyer").unwrap();
        assert_eq!(po.tracking_number(), Some("TRK-123"));
        // Shipping stamps but does not change status.
        assert_eq!(po.status(), DocumentStatus::Approved);
    }

    #[test]
    fn send_to_supplier_requires_approval() {
        let mut po = PurchaseOrder::new(
            Uuid::new_v4(),
            "PO-2026-000002".to_string(),
            Uuid::new_v4(),
            Utc::now().date_naive(),
            "buyer".to_string(),
        );
        assert_matches!(
            po.send_to_supplier("buyer"),
            Err(ProcurementError::NotModifiable { .. })
        );
    }

    #[test]
    fn deliver_completes_and_is_terminal() {
        let (mut po, _) = order_with_item(dec!(10));
        po.deliver("warehouse").unwrap();
        assert_eq!(po.status(), DocumentStatus::Completed);
        assert_matches!(
            po.deliver("warehouse"),
            Err(ProcurementError::NotModifiable { .. })
        );
    }
}

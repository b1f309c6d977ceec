//! Purchase requisitions and their line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ProcurementError;
use crate::totals::{self, round_money};
use crate::workflow::{self, Action, DocumentKind, DocumentStatus, Priority};

const KIND: DocumentKind = DocumentKind::Requisition;

/// A line on a requisition. Prices are estimates; the derived line total is
/// always quantity x estimated unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionItem {
    pub id: Uuid,
    pub line_number: u32,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_unit_price: Decimal,
    estimated_total_price: Decimal,
    pub specifications: Option<String>,
    pub notes: Option<String>,
}

impl RequisitionItem {
    pub fn estimated_total_price(&self) -> Decimal {
        self.estimated_total_price
    }
}

/// Fields for adding a requisition line.
#[derive(Debug, Clone)]
pub struct NewRequisitionItem {
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_unit_price: Decimal,
    pub specifications: Option<String>,
    pub notes: Option<String>,
}

/// Internal request to purchase goods or services, precursor to sourcing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequisition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub requested_date: NaiveDate,
    pub required_date: Option<NaiveDate>,
    pub priority: Priority,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub budget_code: Option<String>,
    pub currency: String,
    pub justification: Option<String>,
    pub notes: Option<String>,
    pub preferred_supplier_id: Option<Uuid>,

    status: DocumentStatus,
    items: Vec<RequisitionItem>,
    estimated_total: Decimal,

    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejection_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl PurchaseRequisition {
    pub fn new(
        tenant_id: Uuid,
        number: String,
        title: String,
        requested_date: NaiveDate,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            title,
            description: None,
            requested_date,
            required_date: None,
            priority: Priority::default(),
            department: None,
            cost_center: None,
            budget_code: None,
            currency: "USD".to_string(),
            justification: None,
            notes: None,
            preferred_supplier_id: None,
            status: DocumentStatus::Draft,
            items: Vec::new(),
            estimated_total: Decimal::ZERO,
            submitted_at: None,
            submitted_by: None,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
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

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn items(&self) -> &[RequisitionItem] {
        &self.items
    }

    /// Derived sum of line estimates, recomputed on every item mutation.
    pub fn estimated_total(&self) -> Decimal {
        self.estimated_total
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Requisitions are editable in DRAFT and, for correction-and-resubmit,
    /// in REJECTED.
    pub fn is_modifiable(&self) -> bool {
        workflow::is_modifiable(KIND, self.status)
    }

    pub fn add_item(
        &mut self,
        item: NewRequisitionItem,
        actor: &str,
    ) -> Result<Uuid, ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        if item.item_name.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "item name must not be empty".to_string(),
            ));
        }
        // Reuses the line-total guards for quantity/price validation.
        let line = totals::line_total(item.quantity, item.estimated_unit_price, None, None, None)?;
        let item_id = Uuid::new_v4();
        self.items.push(RequisitionItem {
            id: item_id,
            line_number: self.items.len() as u32 + 1,
            product_id: item.product_id,
            item_name: item.item_name,
            description: item.description,
            quantity: item.quantity,
            unit: item.unit,
            estimated_unit_price: item.estimated_unit_price,
            estimated_total_price: line.total,
            specifications: item.specifications,
            notes: item.notes,
        });
        self.recompute_totals();
        self.touch(actor);
        Ok(item_id)
    }

    pub fn remove_item(&mut self, item_id: Uuid, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() == before {
            return Err(ProcurementError::not_found("requisition item", item_id));
        }
        for (index, item) in self.items.iter_mut().enumerate() {
            item.line_number = index as u32 + 1;
        }
        self.recompute_totals();
        self.touch(actor);
        Ok(())
    }

    /// DRAFT (or REJECTED) -> PENDING. Requires at least one line item.
    pub fn submit(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Submit)?;
        if self.items.is_empty() {
            return Err(ProcurementError::Validation(
                "requisition must have at least one item before submission".to_string(),
            ));
        }
        self.recompute_totals();
        self.status = DocumentStatus::Pending;
        self.submitted_at = Some(Utc::now());
        self.submitted_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// PENDING -> APPROVED. Approver authorization is the caller's concern.
    pub fn approve(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Approve)?;
        self.status = DocumentStatus::Approved;
        self.approved_at = Some(Utc::now());
        self.approved_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// PENDING -> REJECTED. The requisition may then be edited and resubmitted.
    pub fn reject(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Reject)?;
        self.status = DocumentStatus::Rejected;
        self.rejected_at = Some(Utc::now());
        self.rejected_by = Some(actor.to_string());
        self.rejection_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Any non-terminal status -> CANCELLED. Cancellation is terminal; the
    /// document is retained for audit, never deleted.
    pub fn cancel(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Cancel)?;
        self.status = DocumentStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        self.cancelled_by = Some(actor.to_string());
        self.cancellation_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    fn recompute_totals(&mut self) {
        self.estimated_total = round_money(
            self.items
                .iter()
                .map(|item| item.estimated_total_price)
                .sum(),
        );
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

    fn requisition() -> PurchaseRequisition {
        PurchaseRequisition::new(
            Uuid::new_v4(),
            "PR-2026-000001".to_string(),
            "Lab restock".to_string(),
            Utc::now().date_naive(),
            "amira".to_string(),
        )
    }

    fn item(name: &str, quantity: Decimal, price: Decimal) -> NewRequisitionItem {
        NewRequisitionItem {
            product_id: None,
            item_name: name.to_string(),
            description: None,
            quantity,
            unit: "EA".to_string(),
            estimated_unit_price: price,
            specifications: None,
            notes: None,
        }
    }

    #[test]
    fn estimated_total_follows_items() {
        let mut req = requisition();
        req.add_item(item("Beakers", dec!(10), dec!(5.00)), "amira").unwrap();
        req.add_item(item("Filters", dec!(5), dec!(2.00)), "amira").unwrap();
        assert_eq!(req.estimated_total(), dec!(60.00));

        let first = req.items()[0].id;
        req.remove_item(first, "amira").unwrap();
        assert_eq!(req.estimated_total(), dec!(10.00));
        assert_eq!(req.items()[0].line_number, 1);
    }

    #[test]
    fn submit_requires_items() {
        let mut req = requisition();
        assert_matches!(req.submit("amira"), Err(ProcurementError::Validation(_)));

        req.add_item(item("Beakers", dec!(1), dec!(5.00)), "amira").unwrap();
        req.submit("amira").unwrap();
        assert_eq!(req.status(), DocumentStatus::Pending);
        assert!(req.submitted_at().is_some());
    }

    #[test]
    fn approved_requisition_refuses_new_items() {
        let mut req = requisition();
        req.add_item(item("Beakers", dec!(1), dec!(5.00)), "amira").unwrap();
        req.submit("amira").unwrap();
        req.approve("lena").unwrap();

        let err = req
            .add_item(item("Extra", dec!(1), dec!(1.00)), "amira")
            .unwrap_err();
        assert_matches!(
            err,
            ProcurementError::NotModifiable {
                status: DocumentStatus::Approved,
                ..
            }
        );
    }

    #[test]
    fn rejected_requisition_can_be_corrected_and_resubmitted() {
        let mut req = requisition();
        req.add_item(item("Beakers", dec!(1), dec!(5.00)), "amira").unwrap();
        req.submit("amira").unwrap();
        req.reject("lena", "over budget").unwrap();
        assert_eq!(req.rejection_reason(), Some("over budget"));

        req.add_item(item("Cheaper beakers", dec!(1), dec!(2.00)), "amira")
            .unwrap();
        req.submit("amira").unwrap();
        assert_eq!(req.status(), DocumentStatus::Pending);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut req = requisition();
        req.cancel("amira", "no longer needed").unwrap();
        assert_eq!(req.status(), DocumentStatus::Cancelled);
        assert_matches!(
            req.cancel("amira", "again"),
            Err(ProcurementError::NotModifiable { .. })
        );
    }
}

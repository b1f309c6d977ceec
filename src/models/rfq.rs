//! Requests for quotation and their line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ProcurementError;
use crate::workflow::{self, Action, DocumentKind, DocumentStatus};

const KIND: DocumentKind = DocumentKind::Rfq;

/// A requirement line on an RFQ. Carries no pricing; suppliers price their
/// quotations against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfqItem {
    pub id: Uuid,
    pub line_number: u32,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub specifications: Option<String>,
    pub technical_requirements: Option<String>,
    pub notes: Option<String>,
}

/// Fields for adding an RFQ requirement line.
#[derive(Debug, Clone)]
pub struct NewRfqItem {
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub specifications: Option<String>,
    pub technical_requirements: Option<String>,
    pub notes: Option<String>,
}

/// Formal solicitation of priced offers from suppliers for requisitioned
/// items. May target a single supplier or be broadcast (no target supplier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestForQuotation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub closing_date: NaiveDate,
    pub validity_date: NaiveDate,
    pub currency: String,
    pub terms_and_conditions: Option<String>,
    pub delivery_requirements: Option<String>,
    pub payment_terms: Option<String>,
    pub evaluation_criteria: Option<String>,
    pub notes: Option<String>,
    /// Originating requisition, when sourced from one.
    pub requisition_id: Option<Uuid>,
    /// Target supplier; `None` means broadcast.
    pub supplier_id: Option<Uuid>,

    status: DocumentStatus,
    items: Vec<RfqItem>,

    published_at: Option<DateTime<Utc>>,
    published_by: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl RequestForQuotation {
    /// Creates a draft RFQ. The closing date must not precede the issue date
    /// and the validity date must not precede the closing date.
    pub fn new(
        tenant_id: Uuid,
        number: String,
        title: String,
        issue_date: NaiveDate,
        closing_date: NaiveDate,
        validity_date: NaiveDate,
        created_by: String,
    ) -> Result<Self, ProcurementError> {
        if closing_date < issue_date {
            return Err(ProcurementError::Validation(format!(
                "closing date {} precedes issue date {}",
                closing_date, issue_date
            )));
        }
        if validity_date < closing_date {
            return Err(ProcurementError::Validation(format!(
                "validity date {} precedes closing date {}",
                validity_date, closing_date
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            title,
            description: None,
            issue_date,
            closing_date,
            validity_date,
            currency: "USD".to_string(),
            terms_and_conditions: None,
            delivery_requirements: None,
            payment_terms: None,
            evaluation_criteria: None,
            notes: None,
            requisition_id: None,
            supplier_id: None,
            status: DocumentStatus::Draft,
            items: Vec::new(),
            published_at: None,
            published_by: None,
            closed_at: None,
            closed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[RfqItem] {
        &self.items
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_modifiable(&self) -> bool {
        workflow::is_modifiable(KIND, self.status)
    }

    /// Derived predicate, never a stored transition: whether the RFQ's
    /// validity window has lapsed regardless of stored status.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.validity_date
    }

    /// Whether the RFQ is closed and its quotations may be compared.
    pub fn is_closed(&self) -> bool {
        self.status == DocumentStatus::Completed
    }

    pub fn add_item(&mut self, item: NewRfqItem, actor: &str) -> Result<Uuid, ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        if item.item_name.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "item name must not be empty".to_string(),
            ));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(ProcurementError::Validation(format!(
                "quantity must be positive, got {}",
                item.quantity
            )));
        }
        let item_id = Uuid::new_v4();
        self.items.push(RfqItem {
            id: item_id,
            line_number: self.items.len() as u32 + 1,
            product_id: item.product_id,
            item_name: item.item_name,
            description: item.description,
            quantity: item.quantity,
            unit: item.unit,
            specifications: item.specifications,
            technical_requirements: item.technical_requirements,
            notes: item.notes,
        });
        self.touch(actor);
        Ok(item_id)
    }

    pub fn remove_item(&mut self, item_id: Uuid, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() == before {
            return Err(ProcurementError::not_found("rfq item", item_id));
        }
        for (index, item) in self.items.iter_mut().enumerate() {
            item.line_number = index as u32 + 1;
        }
        self.touch(actor);
        Ok(())
    }

    /// DRAFT -> PENDING. Requires at least one requirement line.
    pub fn publish(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Publish)?;
        if self.items.is_empty() {
            return Err(ProcurementError::Validation(
                "rfq must have at least one item before publication".to_string(),
            ));
        }
        self.status = DocumentStatus::Pending;
        self.published_at = Some(Utc::now());
        self.published_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// PENDING -> COMPLETED, once the closing date has passed.
    pub fn close(&mut self, actor: &str, today: NaiveDate) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Close)?;
        if today <= self.closing_date {
            return Err(ProcurementError::Validation(format!(
                "rfq cannot close before its closing date {}",
                self.closing_date
            )));
        }
        self.status = DocumentStatus::Completed;
        self.closed_at = Some(Utc::now());
        self.closed_by = Some(actor.to_string());
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

    fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Days;
    use rust_decimal_macros::dec;

    fn rfq_with_dates(issue: NaiveDate, closing: NaiveDate, validity: NaiveDate) -> RequestForQuotation {
        RequestForQuotation::new(
            Uuid::new_v4(),
            "RFQ-2026-000001".to_string(),
            "Glassware sourcing".to_string(),
            issue,
            closing,
            validity,
            "amira".to_string(),
        )
        .unwrap()
    }

    fn item() -> NewRfqItem {
        NewRfqItem {
            product_id: None,
            item_name: "Beakers".to_string(),
            description: None,
            quantity: dec!(100),
            unit: "EA".to_string(),
            specifications: Some("borosilicate, 250ml".to_string()),
            technical_requirements: None,
            notes: None,
        }
    }

    #[test]
    fn date_order_is_validated() {
        let today = Utc::now().date_naive();
        let earlier = today.checked_sub_days(Days::new(5)).unwrap();
        assert_matches!(
            RequestForQuotation::new(
                Uuid::new_v4(),
                "RFQ-2026-000002".to_string(),
                "Bad dates".to_string(),
                today,
                earlier,
                today,
                "amira".to_string(),
            ),
            Err(ProcurementError::Validation(_))
        );
    }

    #[test]
    fn close_succeeds_once_past_closing_date_and_only_once() {
        let today = Utc::now().date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap();
        let week_ago = today.checked_sub_days(Days::new(8)).unwrap();
        let mut rfq = rfq_with_dates(week_ago, yesterday, today);
        rfq.add_item(item(), "amira").unwrap();
        rfq.publish("amira").unwrap();

        rfq.close("amira", today).unwrap();
        assert_eq!(rfq.status(), DocumentStatus::Completed);
        assert!(rfq.is_closed());

        // Closing again is refused: the RFQ is no longer PENDING.
        assert_matches!(
            rfq.close("amira", today),
            Err(ProcurementError::NotModifiable { .. })
        );
    }

    #[test]
    fn close_before_closing_date_is_refused() {
        let today = Utc::now().date_naive();
        let next_week = today.checked_add_days(Days::new(7)).unwrap();
        let validity = next_week.checked_add_days(Days::new(30)).unwrap();
        let mut rfq = rfq_with_dates(today, next_week, validity);
        rfq.add_item(item(), "amira").unwrap();
        rfq.publish("amira").unwrap();
        assert_matches!(
            rfq.close("amira", today),
            Err(ProcurementError::Validation(_))
        );
    }

    #[test]
    fn publish_requires_items() {
        let today = Utc::now().date_naive();
        let closing = today.checked_add_days(Days::new(14)).unwrap();
        let validity = closing.checked_add_days(Days::new(30)).unwrap();
        let mut rfq = rfq_with_dates(today, closing, validity);
        assert_matches!(rfq.publish("amira"), Err(ProcurementError::Validation(_)));
    }

    #[test]
    fn expiry_is_a_derived_predicate() {
        let today = Utc::now().date_naive();
        let week_ago = today.checked_sub_days(Days::new(10)).unwrap();
        let closing = today.checked_sub_days(Days::new(5)).unwrap();
        let validity = today.checked_sub_days(Days::new(1)).unwrap();
        let rfq = rfq_with_dates(week_ago, closing, validity);
        assert!(rfq.is_expired(today));
        assert_eq!(rfq.status(), DocumentStatus::Draft);
    }
}

//! Supplier quotations and their priced line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{QuotationScoreWeights, TaxMode};
use crate::errors::ProcurementError;
use crate::evaluation;
use crate::totals::{self, round_money, DocumentTotals};
use crate::workflow::{self, Action, DocumentKind, DocumentStatus};

const KIND: DocumentKind = DocumentKind::Quotation;

/// A priced line on a quotation, answering an RFQ requirement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub id: Uuid,
    pub line_number: u32,
    /// The RFQ requirement this line answers, when it maps to one.
    pub rfq_item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount_percentage: Option<Decimal>,
    discount_amount: Decimal,
    pub tax_rate: Option<Decimal>,
    tax_amount: Decimal,
    total_price: Decimal,
    pub delivery_lead_time_days: Option<u32>,
    pub notes: Option<String>,
}

impl QuotationItem {
    /// Post-discount line total, excluding tax.
    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }
}

/// Fields for adding a quotation line.
#[derive(Debug, Clone)]
pub struct NewQuotationItem {
    pub rfq_item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub delivery_lead_time_days: Option<u32>,
    pub notes: Option<String>,
}

/// A supplier's priced response to an RFQ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierQuotation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub rfq_id: Uuid,
    pub supplier_id: Uuid,
    pub quotation_date: NaiveDate,
    pub validity_date: NaiveDate,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub delivery_lead_time_days: Option<u32>,
    pub warranty_period_months: Option<u32>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,

    status: DocumentStatus,
    items: Vec<QuotationItem>,

    // Document-level charges; effective per the configured tax mode.
    tax_rate: Decimal,
    shipping_cost: Decimal,
    discount_amount: Decimal,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,

    technical_score: Option<Decimal>,
    commercial_score: Option<Decimal>,
    overall_score: Option<Decimal>,
    evaluation_notes: Option<String>,
    evaluated_at: Option<DateTime<Utc>>,
    evaluated_by: Option<String>,

    is_selected: bool,
    selected_at: Option<DateTime<Utc>>,
    selected_by: Option<String>,
    selection_reason: Option<String>,

    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<String>,
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

impl SupplierQuotation {
    pub fn new(
        tenant_id: Uuid,
        number: String,
        rfq_id: Uuid,
        supplier_id: Uuid,
        quotation_date: NaiveDate,
        validity_date: NaiveDate,
        created_by: String,
    ) -> Result<Self, ProcurementError> {
        if validity_date < quotation_date {
            return Err(ProcurementError::Validation(format!(
                "validity date {} precedes quotation date {}",
                validity_date, quotation_date
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            rfq_id,
            supplier_id,
            quotation_date,
            validity_date,
            currency: "USD".to_string(),
            exchange_rate: Decimal::ONE,
            payment_terms: None,
            delivery_terms: None,
            delivery_lead_time_days: None,
            warranty_period_months: None,
            contact_person: None,
            contact_email: None,
            notes: None,
            status: DocumentStatus::Draft,
            items: Vec::new(),
            tax_rate: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            technical_score: None,
            commercial_score: None,
            overall_score: None,
            evaluation_notes: None,
            evaluated_at: None,
            evaluated_by: None,
            is_selected: false,
            selected_at: None,
            selected_by: None,
            selection_reason: None,
            submitted_at: None,
            submitted_by: None,
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
        })
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[QuotationItem] {
        &self.items
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

    pub fn technical_score(&self) -> Option<Decimal> {
        self.technical_score
    }

    pub fn commercial_score(&self) -> Option<Decimal> {
        self.commercial_score
    }

    pub fn overall_score(&self) -> Option<Decimal> {
        self.overall_score
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn selected_by(&self) -> Option<&str> {
        self.selected_by.as_deref()
    }

    pub fn selection_reason(&self) -> Option<&str> {
        self.selection_reason.as_deref()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn submitted_by(&self) -> Option<&str> {
        self.submitted_by.as_deref()
    }

    pub fn is_modifiable(&self) -> bool {
        workflow::is_modifiable(KIND, self.status)
    }

    /// Derived predicate: an expired quotation is ineligible for selection
    /// regardless of stored status.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.validity_date
    }

    /// Whether this quotation has been submitted and may be compared against
    /// its siblings (PENDING or already evaluated to APPROVED).
    pub fn is_open_for_selection(&self) -> bool {
        matches!(
            self.status,
            DocumentStatus::Pending | DocumentStatus::Approved
        )
    }

    pub fn add_item(
        &mut self,
        item: NewQuotationItem,
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
            item.quantity,
            item.unit_price,
            item.discount_percentage,
            item.discount_amount,
            item.tax_rate,
        )?;
        let item_id = Uuid::new_v4();
        self.items.push(QuotationItem {
            id: item_id,
            line_number: self.items.len() as u32 + 1,
            rfq_item_id: item.rfq_item_id,
            product_id: item.product_id,
            item_name: item.item_name,
            description: item.description,
            quantity: item.quantity,
            unit: item.unit,
            unit_price: item.unit_price,
            discount_percentage: item.discount_percentage,
            discount_amount: line.discount_applied,
            tax_rate: item.tax_rate,
            tax_amount: line.tax_applied,
            total_price: line.total,
            delivery_lead_time_days: item.delivery_lead_time_days,
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
            return Err(ProcurementError::not_found("quotation item", item_id));
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

    /// DRAFT -> PENDING. Requires at least one priced line.
    pub fn submit(&mut self, mode: TaxMode, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Submit)?;
        if self.items.is_empty() {
            return Err(ProcurementError::Validation(
                "quotation must have at least one item before submission".to_string(),
            ));
        }
        self.recompute_totals(mode)?;
        self.status = DocumentStatus::Pending;
        self.submitted_at = Some(Utc::now());
        self.submitted_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Records externally supplied technical and commercial scores and the
    /// combined overall score. PENDING -> APPROVED.
    pub fn evaluate(
        &mut self,
        technical: Decimal,
        commercial: Decimal,
        notes: Option<String>,
        weights: &QuotationScoreWeights,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Approve)?;
        let overall = evaluation::overall_score(technical, commercial, weights)?;
        self.technical_score = Some(technical);
        self.commercial_score = Some(commercial);
        self.overall_score = Some(overall);
        self.evaluation_notes = notes;
        self.evaluated_at = Some(Utc::now());
        self.evaluated_by = Some(actor.to_string());
        self.status = DocumentStatus::Approved;
        self.touch(actor);
        Ok(())
    }

    /// Marks this quotation as the RFQ's winner. Eligibility (closed RFQ, not
    /// expired, single winner per RFQ) is enforced by the quotation service
    /// and the store's atomic winner swap.
    pub fn select_as_winner(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        if !self.is_open_for_selection() {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        self.is_selected = true;
        self.selected_at = Some(Utc::now());
        self.selected_by = Some(actor.to_string());
        self.selection_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    /// Clears a previously recorded win; used when a new winner replaces
    /// this quotation.
    pub(crate) fn clear_selection(&mut self) {
        self.is_selected = false;
        self.selected_at = None;
        self.selected_by = None;
        self.selection_reason = None;
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
            // Item totals already embed item tax; no document tax on top.
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
    use chrono::Days;
    use rust_decimal_macros::dec;

    fn quotation() -> SupplierQuotation {
        let today = Utc::now().date_naive();
        SupplierQuotation::new(
            Uuid::new_v4(),
            "QUO-2026-000001".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            today,
            today.checked_add_days(Days::new(30)).unwrap(),
            "supplier-portal".to_string(),
        )
        .unwrap()
    }

    fn item(quantity: Decimal, unit_price: Decimal) -> NewQuotationItem {
        NewQuotationItem {
            rfq_item_id: None,
            product_id: None,
            item_name: "Beakers".to_string(),
            description: None,
            quantity,
            unit: "EA".to_string(),
            unit_price,
            discount_percentage: None,
            discount_amount: None,
            tax_rate: None,
            delivery_lead_time_days: Some(14),
            notes: None,
        }
    }

    #[test]
    fn document_level_tax_applies_to_subtotal() {
        let mut quote = quotation();
        quote
            .add_item(item(dec!(10), dec!(5.00)), TaxMode::DocumentLevel, "sup")
            .unwrap();
        quote
            .set_charges(dec!(10), dec!(3.00), dec!(1.00), TaxMode::DocumentLevel, "sup")
            .unwrap();
        assert_eq!(quote.subtotal(), dec!(50.00));
        assert_eq!(quote.tax_amount(), dec!(5.00));
        assert_eq!(quote.total_amount(), dec!(57.00));
    }

    #[test]
    fn item_level_mode_ignores_document_tax_rate() {
        let mut quote = quotation();
        let mut line = item(dec!(10), dec!(5.00));
        line.tax_rate = Some(dec!(20));
        quote.add_item(line, TaxMode::ItemLevel, "sup").unwrap();
        quote
            .set_charges(dec!(10), dec!(0), dec!(0), TaxMode::ItemLevel, "sup")
            .unwrap();
        // Item tax (10.00) is inside the subtotal; the document rate is inert.
        assert_eq!(quote.subtotal(), dec!(60.00));
        assert_eq!(quote.tax_amount(), dec!(0));
        assert_eq!(quote.total_amount(), dec!(60.00));
    }

    #[test]
    fn evaluate_combines_scores_and_approves() {
        let mut quote = quotation();
        quote
            .add_item(item(dec!(1), dec!(10.00)), TaxMode::DocumentLevel, "sup")
            .unwrap();
        quote.submit(TaxMode::DocumentLevel, "sup").unwrap();
        quote
            .evaluate(
                dec!(80),
                dec!(60),
                Some("solid technical offer".to_string()),
                &QuotationScoreWeights::default(),
                "buyer",
            )
            .unwrap();
        assert_eq!(quote.overall_score(), Some(dec!(72.00)));
        assert_eq!(quote.status(), DocumentStatus::Approved);
    }

    #[test]
    fn draft_quotation_cannot_be_selected() {
        let mut quote = quotation();
        assert_matches!(
            quote.select_as_winner("buyer", "best price"),
            Err(ProcurementError::NotModifiable { .. })
        );
    }

    #[test]
    fn items_are_frozen_after_submission() {
        let mut quote = quotation();
        quote
            .add_item(item(dec!(1), dec!(10.00)), TaxMode::DocumentLevel, "sup")
            .unwrap();
        quote.submit(TaxMode::DocumentLevel, "sup").unwrap();
        assert_matches!(
            quote.add_item(item(dec!(1), dec!(2.00)), TaxMode::DocumentLevel, "sup"),
            Err(ProcurementError::NotModifiable { .. })
        );
    }

    #[test]
    fn submission_stamps_actor_and_time() {
        let mut quote = quotation();
        quote
            .add_item(item(dec!(1), dec!(10.00)), TaxMode::DocumentLevel, "sup")
            .unwrap();
        quote.submit(TaxMode::DocumentLevel, "sup").unwrap();
        assert!(quote.submitted_at().is_some());
        assert_eq!(quote.submitted_by(), Some("sup"));
    }
}

//! Supplier master records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ProcurementError;
use crate::workflow::SupplierStatus;

/// A vendor the tenant buys from. Suppliers carry no workflow; they are
/// activated, suspended, or deactivated directly. Code and email are unique
/// per tenant, which the store enforces on insert and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Tenant-unique short code, e.g. "ACME-01".
    pub code: String,
    pub name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub contact_person: Option<String>,
    pub payment_terms: Option<String>,
    pub currency: String,
    pub credit_limit: Option<Decimal>,
    pub notes: Option<String>,

    status: SupplierStatus,
    /// Rolling 0-5 rating, refreshed from approved evaluations.
    rating: Option<Decimal>,
    last_evaluated: Option<NaiveDate>,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl Supplier {
    pub fn new(
        tenant_id: Uuid,
        code: String,
        name: String,
        email: String,
        created_by: String,
    ) -> Result<Self, ProcurementError> {
        if code.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "supplier code must not be empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(ProcurementError::Validation(
                "supplier name must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            code,
            name,
            legal_name: None,
            tax_id: None,
            email,
            phone: None,
            website: None,
            address: None,
            city: None,
            country: None,
            postal_code: None,
            contact_person: None,
            payment_terms: None,
            currency: "USD".to_string(),
            credit_limit: None,
            notes: None,
            status: SupplierStatus::Active,
            rating: None,
            last_evaluated: None,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rating(&self) -> Option<Decimal> {
        self.rating
    }

    pub fn last_evaluated(&self) -> Option<NaiveDate> {
        self.last_evaluated
    }

    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }

    pub fn activate(&mut self, actor: &str) {
        self.status = SupplierStatus::Active;
        self.touch(actor);
    }

    pub fn suspend(&mut self, actor: &str) {
        self.status = SupplierStatus::Suspended;
        self.touch(actor);
    }

    pub fn deactivate(&mut self, actor: &str) {
        self.status = SupplierStatus::Inactive;
        self.touch(actor);
    }

    /// Records the outcome of an approved evaluation on the master record.
    pub fn record_evaluation(
        &mut self,
        rating: Decimal,
        evaluated_on: NaiveDate,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        if rating < Decimal::ZERO || rating > Decimal::from(5) {
            return Err(ProcurementError::Validation(format!(
                "supplier rating must be between 0 and 5, got {}",
                rating
            )));
        }
        self.rating = Some(rating);
        self.last_evaluated = Some(evaluated_on);
        self.touch(actor);
        Ok(())
    }

    pub(crate) fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn supplier() -> Supplier {
        Supplier::new(
            Uuid::new_v4(),
            "ACME-01".to_string(),
            "Acme Labs".to_string(),
            "sales@acme.test".to_string(),
            "amira".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn new_suppliers_start_active_without_a_rating() {
        let s = supplier();
        assert!(s.is_active());
        assert_eq!(s.rating(), None);
        assert_eq!(s.version(), 0);
    }

    #[test]
    fn blank_code_is_rejected() {
        assert_matches!(
            Supplier::new(
                Uuid::new_v4(),
                "  ".to_string(),
                "Acme".to_string(),
                "sales@acme.test".to_string(),
                "amira".to_string(),
            ),
            Err(ProcurementError::Validation(_))
        );
    }

    #[test]
    fn evaluation_outcome_updates_rating_and_date() {
        let mut s = supplier();
        let today = Utc::now().date_naive();
        s.record_evaluation(dec!(4.25), today, "lena").unwrap();
        assert_eq!(s.rating(), Some(dec!(4.25)));
        assert_eq!(s.last_evaluated(), Some(today));

        assert_matches!(
            s.record_evaluation(dec!(5.5), today, "lena"),
            Err(ProcurementError::Validation(_))
        );
    }

    #[test]
    fn suspension_round_trips() {
        let mut s = supplier();
        s.suspend("amira");
        assert_eq!(s.status(), SupplierStatus::Suspended);
        s.activate("amira");
        assert!(s.is_active());
    }
}

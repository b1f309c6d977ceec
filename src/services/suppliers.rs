//! Supplier master data management.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::{Supplier, TenantContext};
use crate::store::{Page, PageRequest, SupplierFilter, SupplierStore};

/// Input for registering a supplier.
#[derive(Debug, Clone, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub contact_person: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for updating a supplier's descriptive fields. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub contact_person: Option<String>,
    pub payment_terms: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub notes: Option<String>,
}

/// Service for managing suppliers.
#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn SupplierStore>,
    events: EventSender,
}

impl SupplierService {
    pub fn new(store: Arc<dyn SupplierStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    /// Registers a supplier. Code and email must be unique within the tenant.
    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateSupplierInput,
    ) -> Result<Supplier, ProcurementError> {
        input.validate()?;
        if self
            .store
            .code_taken(ctx.tenant_id, &input.code, None)
            .await?
        {
            return Err(ProcurementError::Conflict(format!(
                "supplier code {} is already in use",
                input.code
            )));
        }
        if self
            .store
            .email_taken(ctx.tenant_id, &input.email, None)
            .await?
        {
            return Err(ProcurementError::Conflict(format!(
                "supplier email {} is already in use",
                input.email
            )));
        }

        let mut supplier = Supplier::new(
            ctx.tenant_id,
            input.code,
            input.name,
            input.email,
            ctx.actor.clone(),
        )?;
        supplier.legal_name = input.legal_name;
        supplier.tax_id = input.tax_id;
        supplier.phone = input.phone;
        supplier.website = input.website;
        supplier.address = input.address;
        supplier.city = input.city;
        supplier.country = input.country;
        supplier.postal_code = input.postal_code;
        supplier.contact_person = input.contact_person;
        supplier.payment_terms = input.payment_terms;
        if let Some(currency) = input.currency {
            supplier.currency = currency;
        }
        supplier.credit_limit = input.credit_limit;
        supplier.notes = input.notes;

        let supplier = self.store.insert(supplier).await?;
        info!(supplier_id = %supplier.id, code = %supplier.code, "supplier created");
        self.events.emit(Event::SupplierCreated(supplier.id)).await;
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Supplier, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> Result<Page<Supplier>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    /// Updates descriptive fields. An email change re-checks uniqueness.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateSupplierInput,
    ) -> Result<Supplier, ProcurementError> {
        input.validate()?;
        let mut supplier = self.store.find(ctx.tenant_id, id).await?;
        if let Some(email) = &input.email {
            if !supplier.email.eq_ignore_ascii_case(email)
                && self
                    .store
                    .email_taken(ctx.tenant_id, email, Some(id))
                    .await?
            {
                return Err(ProcurementError::Conflict(format!(
                    "supplier email {} is already in use",
                    email
                )));
            }
        }

        if let Some(name) = input.name {
            supplier.name = name;
        }
        if let Some(email) = input.email {
            supplier.email = email;
        }
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if input.$field.is_some() {
                    supplier.$field = input.$field;
                })*
            };
        }
        apply!(
            legal_name, tax_id, phone, website, address, city, country, postal_code,
            contact_person, payment_terms, credit_limit, notes
        );
        supplier.touch(&ctx.actor);

        let supplier = self.store.save(supplier).await?;
        self.events.emit(Event::SupplierUpdated(supplier.id)).await;
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Supplier, ProcurementError> {
        let mut supplier = self.store.find(ctx.tenant_id, id).await?;
        supplier.activate(&ctx.actor);
        let supplier = self.store.save(supplier).await?;
        self.events.emit(Event::SupplierUpdated(supplier.id)).await;
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn suspend(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Supplier, ProcurementError> {
        let mut supplier = self.store.find(ctx.tenant_id, id).await?;
        supplier.suspend(&ctx.actor);
        let supplier = self.store.save(supplier).await?;
        self.events.emit(Event::SupplierUpdated(supplier.id)).await;
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Supplier, ProcurementError> {
        let mut supplier = self.store.find(ctx.tenant_id, id).await?;
        supplier.deactivate(&ctx.actor);
        let supplier = self.store.save(supplier).await?;
        self.events.emit(Event::SupplierUpdated(supplier.id)).await;
        Ok(supplier)
    }
}

//! Persistence ports for procurement documents.
//!
//! Each document type gets its own store trait so backends can map them to
//! separate tables or collections. All lookups are tenant-scoped; a document
//! belonging to another tenant is indistinguishable from a missing one and
//! surfaces as [`ProcurementError::NotFound`].
//!
//! `save` implements optimistic concurrency: it succeeds only when the
//! incoming document's version matches the stored one, and bumps the version
//! on success. A mismatch surfaces as
//! [`ProcurementError::ConcurrentModification`] and the caller retries from a
//! fresh read.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ProcurementError;
use crate::models::{
    PurchaseOrder, PurchaseRequisition, RequestForQuotation, Supplier, SupplierEvaluation,
    SupplierQuotation,
};
use crate::workflow::{DocumentStatus, SupplierStatus};

pub use memory::InMemoryStore;

/// Page selector for list operations. Pages are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 500),
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Status and ownership filters shared by the document list operations.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub supplier_id: Option<Uuid>,
    pub created_by: Option<String>,
}

/// Filters for supplier listings.
#[derive(Debug, Clone, Default)]
pub struct SupplierFilter {
    pub status: Option<SupplierStatus>,
    /// Case-insensitive substring match on name or code.
    pub search: Option<String>,
}

#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn insert(&self, supplier: Supplier) -> Result<Supplier, ProcurementError>;
    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Supplier, ProcurementError>;
    async fn save(&self, supplier: Supplier) -> Result<Supplier, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> Result<Page<Supplier>, ProcurementError>;
    /// Whether another supplier of the tenant already uses this code.
    async fn code_taken(
        &self,
        tenant_id: Uuid,
        code: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ProcurementError>;
    /// Whether another supplier of the tenant already uses this email.
    async fn email_taken(
        &self,
        tenant_id: Uuid,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ProcurementError>;
}

#[async_trait]
pub trait RequisitionStore: Send + Sync {
    async fn insert(
        &self,
        requisition: PurchaseRequisition,
    ) -> Result<PurchaseRequisition, ProcurementError>;
    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError>;
    async fn save(
        &self,
        requisition: PurchaseRequisition,
    ) -> Result<PurchaseRequisition, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseRequisition>, ProcurementError>;
    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError>;
}

#[async_trait]
pub trait RfqStore: Send + Sync {
    async fn insert(
        &self,
        rfq: RequestForQuotation,
    ) -> Result<RequestForQuotation, ProcurementError>;
    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError>;
    async fn save(
        &self,
        rfq: RequestForQuotation,
    ) -> Result<RequestForQuotation, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<RequestForQuotation>, ProcurementError>;
    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError>;
}

#[async_trait]
pub trait QuotationStore: Send + Sync {
    async fn insert(
        &self,
        quotation: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError>;
    async fn find(&self, tenant_id: Uuid, id: Uuid)
        -> Result<SupplierQuotation, ProcurementError>;
    async fn save(
        &self,
        quotation: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierQuotation>, ProcurementError>;
    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError>;
    /// All quotations submitted against one RFQ.
    async fn find_by_rfq(
        &self,
        tenant_id: Uuid,
        rfq_id: Uuid,
    ) -> Result<Vec<SupplierQuotation>, ProcurementError>;
    /// Persists a newly selected winner and clears the selection from every
    /// other quotation on the same RFQ in one atomic step, so no observer
    /// sees two winners.
    async fn save_winner(
        &self,
        winner: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError>;
}

#[async_trait]
pub trait PurchaseOrderStore: Send + Sync {
    async fn insert(&self, order: PurchaseOrder) -> Result<PurchaseOrder, ProcurementError>;
    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<PurchaseOrder, ProcurementError>;
    async fn save(&self, order: PurchaseOrder) -> Result<PurchaseOrder, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrder>, ProcurementError>;
    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError>;
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn insert(
        &self,
        evaluation: SupplierEvaluation,
    ) -> Result<SupplierEvaluation, ProcurementError>;
    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError>;
    async fn save(
        &self,
        evaluation: SupplierEvaluation,
    ) -> Result<SupplierEvaluation, ProcurementError>;
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierEvaluation>, ProcurementError>;
    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError>;
}

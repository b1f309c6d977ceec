//! Procurement document model.
//!
//! Documents are plain data holders whose invariant-bearing fields (status,
//! items, derived totals, workflow stamps) are private and change only
//! through the guarded transition methods defined alongside each type.
//! Documents reference each other by id only; the store resolves references
//! on demand.

pub mod purchase_order;
pub mod quotation;
pub mod requisition;
pub mod rfq;
pub mod supplier;
pub mod supplier_evaluation;

pub use purchase_order::{NewPurchaseOrderItem, PurchaseOrder, PurchaseOrderItem};
pub use quotation::{NewQuotationItem, QuotationItem, SupplierQuotation};
pub use requisition::{NewRequisitionItem, PurchaseRequisition, RequisitionItem};
pub use rfq::{NewRfqItem, RequestForQuotation, RfqItem};
pub use supplier::Supplier;
pub use supplier_evaluation::{DimensionComments, PerformanceStats, SupplierEvaluation};

use uuid::Uuid;

/// Already-authenticated identity under which an operation runs. The engine
/// never authenticates; callers resolve tenant and actor before invoking it.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub actor: String,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid, actor: impl Into<String>) -> Self {
        Self {
            tenant_id,
            actor: actor.into(),
        }
    }
}

//! Application services: one per document type.
//!
//! Services own the cross-document rules (uniqueness, sourcing, winner
//! eligibility), allocate document numbers, and publish domain events after
//! successful transitions. Single-document rules live on the models; the
//! services load, invoke a guarded transition, and save through the stores'
//! version-checked `save`.

pub mod evaluations;
pub mod purchase_orders;
pub mod quotations;
pub mod requisitions;
pub mod rfqs;
pub mod suppliers;

pub use evaluations::EvaluationService;
pub use purchase_orders::PurchaseOrderService;
pub use quotations::QuotationService;
pub use requisitions::RequisitionService;
pub use rfqs::RfqService;
pub use suppliers::SupplierService;

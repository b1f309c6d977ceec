//! Procurement lifecycle engine.
//!
//! Covers the source-to-receipt flow: purchase requisitions, requests for
//! quotation, supplier quotations with evaluation and winner selection,
//! purchase orders with incremental receiving, and periodic supplier
//! evaluations. Documents move through a centralized workflow state machine,
//! persist through async store ports with optimistic concurrency, and emit
//! domain events on every transition.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod evaluation;
pub mod events;
pub mod logging;
pub mod models;
pub mod numbering;
pub mod scoring;
pub mod services;
pub mod store;
pub mod totals;
pub mod workflow;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use config::{EngineConfig, TaxMode};
pub use errors::ProcurementError;
pub use events::{Event, EventSender};
pub use models::TenantContext;
pub use workflow::{DocumentKind, DocumentStatus, Priority, SupplierStatus};

use numbering::SequenceNumbers;
use services::{
    EvaluationService, PurchaseOrderService, QuotationService, RequisitionService, RfqService,
    SupplierService,
};
use store::InMemoryStore;

/// The assembled engine: one service per document type, sharing a store, an
/// event channel, a number generator, and the engine configuration.
#[derive(Clone)]
pub struct ProcurementEngine {
    pub suppliers: SupplierService,
    pub requisitions: RequisitionService,
    pub rfqs: RfqService,
    pub quotations: QuotationService,
    pub purchase_orders: PurchaseOrderService,
    pub evaluations: EvaluationService,
}

impl ProcurementEngine {
    /// Wires the engine against the in-memory store. Returns the receiving
    /// half of the event channel; dropping it is fine, events are
    /// best-effort.
    pub fn in_memory(config: EngineConfig) -> (Self, mpsc::Receiver<Event>) {
        let store = Arc::new(InMemoryStore::new());
        let (events, receiver) = EventSender::channel(1024);
        let engine = Self::with_store(store, events, config);
        (engine, receiver)
    }

    /// Wires the engine against a shared [`InMemoryStore`] and an existing
    /// event sender.
    pub fn with_store(store: Arc<InMemoryStore>, events: EventSender, config: EngineConfig) -> Self {
        let numbers = Arc::new(SequenceNumbers::new());
        let config = Arc::new(config);
        Self {
            suppliers: SupplierService::new(store.clone(), events.clone()),
            requisitions: RequisitionService::new(
                store.clone(),
                events.clone(),
                numbers.clone(),
                config.clone(),
            ),
            rfqs: RfqService::new(
                store.clone(),
                store.clone(),
                events.clone(),
                numbers.clone(),
                config.clone(),
            ),
            quotations: QuotationService::new(
                store.clone(),
                store.clone(),
                events.clone(),
                numbers.clone(),
                config.clone(),
            ),
            purchase_orders: PurchaseOrderService::new(
                store.clone(),
                store.clone(),
                events.clone(),
                numbers.clone(),
                config.clone(),
            ),
            evaluations: EvaluationService::new(
                store.clone(),
                store,
                events,
                numbers,
                config,
            ),
        }
    }
}

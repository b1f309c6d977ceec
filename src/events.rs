//! Domain events emitted on workflow transitions.
//!
//! Events are a best-effort side channel for notification delivery: a failed
//! send is logged and never rolls back the transition that produced it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// The events that can occur across the procurement lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SupplierCreated(Uuid),
    SupplierUpdated(Uuid),

    RequisitionCreated(Uuid),
    RequisitionSubmitted(Uuid),
    RequisitionApproved(Uuid),
    RequisitionRejected(Uuid),
    RequisitionCancelled(Uuid),

    RfqPublished(Uuid),
    RfqClosed(Uuid),
    RfqCancelled(Uuid),

    QuotationSubmitted(Uuid),
    QuotationEvaluated {
        quotation_id: Uuid,
        overall_score: Decimal,
    },
    QuotationWinnerSelected {
        rfq_id: Uuid,
        quotation_id: Uuid,
    },
    QuotationRejected(Uuid),
    QuotationCancelled(Uuid),

    PurchaseOrderCreated(Uuid),
    PurchaseOrderSubmitted(Uuid),
    PurchaseOrderApproved(Uuid),
    PurchaseOrderRejected(Uuid),
    PurchaseOrderSentToSupplier(Uuid),
    PurchaseOrderShipped(Uuid),
    PurchaseOrderItemReceived {
        purchase_order_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    },
    PurchaseOrderDelivered(Uuid),
    PurchaseOrderCancelled(Uuid),

    EvaluationCompleted {
        evaluation_id: Uuid,
        supplier_id: Uuid,
    },
    EvaluationApproved(Uuid),

    /// Catch-all for adapters that forward events elsewhere.
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

/// Cloneable handle for publishing domain events.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }

    /// Publishes an event without failing the surrounding operation.
    pub(crate) async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            tracing::warn!("dropping domain event: {}", e);
        }
    }
}

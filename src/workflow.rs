//! Workflow state machine shared by all procurement documents.
//!
//! Every status change in the engine goes through [`ensure`] (or the
//! modifiability checks below) from a transition method on the owning
//! document. No other code path writes a status field.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::errors::ProcurementError;

/// Lifecycle status shared by requisitions, RFQs, quotations, purchase
/// orders, and supplier evaluations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    /// Stored only for documents whose validity lapse is made explicit by a
    /// caller-driven sweep; expiry is otherwise a derived predicate.
    Expired,
}

impl DocumentStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Expired)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// The document types governed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    Requisition,
    Rfq,
    Quotation,
    PurchaseOrder,
    Evaluation,
}

/// Guarded transitions from the workflow table. Stamp-only operations
/// (send-to-supplier, ship, acknowledge, review) are not listed here because
/// they do not change status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Submit,
    Approve,
    Reject,
    Publish,
    Close,
    Cancel,
    Deliver,
    Complete,
}

/// Returns whether `action` is allowed from `from` for the given document
/// kind. Data-dependent guards (item presence, closing date, tracking number)
/// are checked by the transition methods themselves.
fn is_allowed(kind: DocumentKind, from: DocumentStatus, action: Action) -> bool {
    use Action::*;
    use DocumentStatus::*;

    match (kind, from, action) {
        // Cancellation is allowed from any non-terminal status, for every kind.
        (_, from, Cancel) => !from.is_terminal(),

        (DocumentKind::Requisition, Draft, Submit) => true,
        // Rejected requisitions may be corrected and resubmitted.
        (DocumentKind::Requisition, Rejected, Submit) => true,
        (DocumentKind::Requisition, Pending, Approve) => true,
        (DocumentKind::Requisition, Pending, Reject) => true,

        (DocumentKind::Rfq, Draft, Publish) => true,
        (DocumentKind::Rfq, Pending, Close) => true,

        (DocumentKind::Quotation, Draft, Submit) => true,
        (DocumentKind::Quotation, Pending, Approve) => true,
        (DocumentKind::Quotation, Pending, Reject) => true,

        (DocumentKind::PurchaseOrder, Draft, Submit) => true,
        (DocumentKind::PurchaseOrder, Pending, Approve) => true,
        (DocumentKind::PurchaseOrder, Pending, Reject) => true,
        (DocumentKind::PurchaseOrder, from, Deliver) => !from.is_terminal(),

        (DocumentKind::Evaluation, Draft, Complete) => true,
        (DocumentKind::Evaluation, Completed, Approve) => true,

        _ => false,
    }
}

/// Checks the transition table, returning `NotModifiable` when the action is
/// not allowed from the document's current status.
pub(crate) fn ensure(
    kind: DocumentKind,
    id: Uuid,
    from: DocumentStatus,
    action: Action,
) -> Result<(), ProcurementError> {
    if is_allowed(kind, from, action) {
        Ok(())
    } else {
        tracing::debug!(kind = %kind, %id, status = %from, action = %action, "transition refused");
        Err(ProcurementError::NotModifiable { id, status: from })
    }
}

/// Whether items and core fields of the document may still be edited.
/// Requisitions additionally allow edits in REJECTED for correct-and-resubmit.
pub(crate) fn is_modifiable(kind: DocumentKind, status: DocumentStatus) -> bool {
    match status {
        DocumentStatus::Draft => true,
        DocumentStatus::Rejected => kind == DocumentKind::Requisition,
        _ => false,
    }
}

pub(crate) fn ensure_modifiable(
    kind: DocumentKind,
    id: Uuid,
    status: DocumentStatus,
) -> Result<(), ProcurementError> {
    if is_modifiable(kind, status) {
        Ok(())
    } else {
        Err(ProcurementError::NotModifiable { id, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DocumentStatus::*;

    #[test]
    fn cancel_is_allowed_from_any_non_terminal_status() {
        for kind in [
            DocumentKind::Requisition,
            DocumentKind::Rfq,
            DocumentKind::Quotation,
            DocumentKind::PurchaseOrder,
            DocumentKind::Evaluation,
        ] {
            for from in [Draft, Pending, Approved, Rejected] {
                assert!(is_allowed(kind, from, Action::Cancel), "{kind} {from}");
            }
            for from in [Cancelled, Completed, Expired] {
                assert!(!is_allowed(kind, from, Action::Cancel), "{kind} {from}");
            }
        }
    }

    #[test]
    fn requisition_resubmit_after_rejection() {
        assert!(is_allowed(
            DocumentKind::Requisition,
            Rejected,
            Action::Submit
        ));
        assert!(!is_allowed(DocumentKind::Rfq, Rejected, Action::Submit));
    }

    #[test]
    fn close_only_from_pending() {
        assert!(is_allowed(DocumentKind::Rfq, Pending, Action::Close));
        assert!(!is_allowed(DocumentKind::Rfq, Completed, Action::Close));
        assert!(!is_allowed(DocumentKind::Rfq, Draft, Action::Close));
    }

    #[test]
    fn approved_documents_are_not_modifiable() {
        assert!(!is_modifiable(DocumentKind::Requisition, Approved));
        assert!(is_modifiable(DocumentKind::Requisition, Rejected));
        assert!(!is_modifiable(DocumentKind::Quotation, Rejected));
        assert!(is_modifiable(DocumentKind::PurchaseOrder, Draft));
    }

    #[test]
    fn deliver_refused_after_terminal_status() {
        assert!(is_allowed(DocumentKind::PurchaseOrder, Approved, Action::Deliver));
        assert!(!is_allowed(DocumentKind::PurchaseOrder, Cancelled, Action::Deliver));
        assert!(!is_allowed(DocumentKind::PurchaseOrder, Completed, Action::Deliver));
    }
}

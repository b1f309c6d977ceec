use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::workflow::DocumentStatus;

/// Error type for every engine operation.
///
/// Errors are local to a single operation: an operation either fully commits
/// its new state and version through the store, or leaves nothing behind.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ProcurementError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Also returned for cross-tenant access, so existence never leaks.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("document {id} is not modifiable in status {status}")]
    NotModifiable { id: Uuid, status: DocumentStatus },

    /// Optimistic-lock version mismatch. The caller should reload and retry.
    #[error("concurrent modification of document {0}")]
    ConcurrentModification(Uuid),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl ProcurementError {
    pub fn not_found(kind: &str, id: Uuid) -> Self {
        Self::NotFound(format!("{} {} not found", kind, id))
    }
}

impl From<validator::ValidationErrors> for ProcurementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

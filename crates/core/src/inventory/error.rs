//! Inventory error types for DID lifecycle management.

use thiserror::Error;

use numera_shared::types::DidId;

use crate::inventory::types::DidStatus;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Attempted an invalid lifecycle transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// The current status.
        from: DidStatus,
        /// The attempted target status.
        to: DidStatus,
    },

    /// The record changed between the precondition read and the commit.
    #[error("DID {0} state changed concurrently; retry with fresh state")]
    StateConflict(DidId),

    /// The DID is reserved, but for a different customer.
    #[error("DID {0} is reserved for a different customer")]
    ReservationMismatch(DidId),

    /// The reservation deadline has passed.
    #[error("Reservation for DID {0} has expired")]
    ReservationExpired(DidId),

    /// Customer-verified numbers cannot be released through this path.
    #[error("BYON numbers can only be released by an administrator")]
    ByonNotReleasable,

    /// DID not found.
    #[error("DID {0} not found")]
    DidNotFound(DidId),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl InventoryError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidStateTransition { .. }
            | Self::StateConflict(_)
            | Self::ReservationMismatch(_)
            | Self::ReservationExpired(_) => 409,
            Self::ByonNotReleasable => 422,
            Self::DidNotFound(_) => 404,
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::StateConflict(_) => "STATE_CONFLICT",
            Self::ReservationMismatch(_) => "RESERVATION_MISMATCH",
            Self::ReservationExpired(_) => "RESERVATION_EXPIRED",
            Self::ByonNotReleasable => "BYON_NOT_RELEASABLE",
            Self::DidNotFound(_) => "DID_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

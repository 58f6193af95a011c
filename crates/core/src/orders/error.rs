//! Order workflow error types.

use thiserror::Error;

use numera_shared::types::DidOrderId;

use crate::inventory::InventoryError;
use crate::orders::types::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order is no longer awaiting approval.
    #[error("Order is not pending approval (current status: {current})")]
    OrderNotPending {
        /// The status the order actually holds.
        current: OrderStatus,
    },

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Order not found.
    #[error("Order {0} not found")]
    OrderNotFound(DidOrderId),

    /// Inventory transition failure.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::OrderNotPending { .. } => 409,
            Self::RejectionReasonRequired => 400,
            Self::OrderNotFound(_) => 404,
            Self::Inventory(e) => e.status_code(),
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OrderNotPending { .. } => "ORDER_NOT_PENDING",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::Inventory(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

//! Billing error types.

use rust_decimal::Decimal;
use thiserror::Error;

use numera_shared::types::{CustomerId, DidId};

use crate::inventory::InventoryError;

/// Errors that can occur during purchase and renewal settlement.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The account balance does not cover the charge.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// The amount the operation needs.
        required: Decimal,
        /// The balance at evaluation time.
        available: Decimal,
    },

    /// The balance was reported sufficient but the debit did not commit
    /// (raced with a concurrent debit). No inventory mutation was performed.
    #[error("Balance deduction failed: {0}")]
    BalanceDeductionFailed(String),

    /// The debit committed but the DID assignment failed afterwards.
    ///
    /// The charge is NOT rolled back; this error carries enough context for
    /// manual reconciliation.
    #[error("DID {did} assignment failed after a committed debit of {amount} for customer {customer}")]
    AssignmentFailedAfterDebit {
        /// The DID that could not be assigned.
        did: DidId,
        /// The customer whose balance was debited.
        customer: CustomerId,
        /// The committed debit amount.
        amount: Decimal,
    },

    /// The balance ledger service is unreachable.
    #[error("Balance ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Inventory transition failure.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InsufficientBalance { .. } => 422,
            Self::BalanceDeductionFailed(_) | Self::LedgerUnavailable(_) => 502,
            Self::Inventory(e) => e.status_code(),
            Self::AssignmentFailedAfterDebit { .. } | Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::BalanceDeductionFailed(_) => "BALANCE_DEDUCTION_FAILED",
            Self::AssignmentFailedAfterDebit { .. } => "ASSIGNMENT_FAILED_AFTER_DEBIT",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            Self::Inventory(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

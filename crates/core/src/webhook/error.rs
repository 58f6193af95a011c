//! Webhook gateway error types.

use thiserror::Error;

use numera_shared::types::InvoiceId;

use crate::inventory::InventoryError;

/// Errors that can occur while handling a gateway webhook.
///
/// Security failures (signature, timestamp) carry no detail that could aid
/// forgery; the specific cause is logged server-side only.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required header is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// The timestamp header is not a unix timestamp.
    #[error("Invalid webhook timestamp")]
    MalformedTimestamp,

    /// The request falls outside the replay window.
    #[error("Webhook timestamp outside the allowed window")]
    TimestampOutOfRange,

    /// The signature does not match the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The body is not valid JSON for the expected event.
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// The notes field carries no parsable `Provider:{id}` reference.
    #[error("No invoice reference found in webhook payload")]
    UnresolvableReference,

    /// The referenced invoice does not exist.
    #[error("Invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    /// The balance ledger could not apply a credit.
    #[error("Balance ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Inventory failure while releasing a DID.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingHeader(_)
            | Self::MalformedTimestamp
            | Self::TimestampOutOfRange
            | Self::InvalidSignature => 401,
            Self::MalformedPayload(_) | Self::UnresolvableReference => 400,
            Self::InvoiceNotFound(_) => 404,
            Self::LedgerUnavailable(_) => 502,
            Self::Inventory(e) => e.status_code(),
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingHeader(_) => "MISSING_HEADER",
            Self::MalformedTimestamp => "INVALID_TIMESTAMP",
            Self::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnresolvableReference => "UNRESOLVABLE_REFERENCE",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            Self::Inventory(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

//! Billing domain: invoices, ledger movements, and proration.
//!
//! The balance-first settlement strategy itself lives in the service layer;
//! this module owns the money math and the invoice/movement types it writes.

pub mod error;
pub mod proration;
pub mod types;

#[cfg(test)]
mod proration_props;

pub use error::BillingError;
pub use proration::{Proration, ProrationCalculator};
pub use types::{
    Invoice, InvoiceStatus, InvoiceType, LedgerMovement, MovementReason, PaidVia, SyncStatus,
};

//! Billing gateway webhook handling: authentication and reference parsing.
//!
//! Inbound events (payment confirmation, overdue notice) are authenticated
//! with an HMAC-SHA256 signature over `timestamp + "." + raw_body` and a
//! replay window on the timestamp. The target invoice is located by scanning
//! a free-text reference field. Dispatch and idempotent application live in
//! the service layer.

pub mod error;
pub mod reference;
pub mod signature;
pub mod types;

pub use error::WebhookError;
pub use reference::extract_invoice_reference;
pub use signature::{sign, verify_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use types::{OverdueNotice, PaymentConfirmation, WebhookAck};

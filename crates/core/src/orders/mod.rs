//! Deferred-billing order approval workflow.
//!
//! Customers on deferred billing place an order that reserves a DID for 24
//! hours; an administrator approves or rejects it, or an expiry sweep times
//! it out. Order statuses are monotonic: no transition leaves a terminal
//! status.

pub mod error;
pub mod types;
pub mod workflow;

pub use error::OrderError;
pub use types::{DidOrder, OrderAction, OrderStatus};
pub use workflow::OrderWorkflow;

/// How long an order holds its DID reservation.
pub const RESERVATION_HOURS: i64 = 24;

//! Orchestrating services.
//!
//! Each service composes repositories, external clients, and the pure core
//! logic into one request-scoped flow: re-read, validate, commit.

pub mod billing;
pub mod byon;
pub mod inventory;
pub mod orders;
pub mod webhook;

pub use billing::{BillingService, PurchaseOutcome, RenewalOutcome};
pub use byon::ByonService;
pub use inventory::InventoryManager;
pub use orders::OrderService;
pub use webhook::WebhookService;

//! DID inventory lifecycle state machine.
//!
//! A DID (phone number resource) moves through a fixed set of lifecycle
//! states. This module owns the transition rules; persistence and the
//! re-read-before-commit discipline live in the service layer.

pub mod error;
pub mod service;
pub mod types;

pub use error::InventoryError;
pub use service::InventoryService;
pub use types::{Did, DidStatus, InventoryAction, ReleaseKind};

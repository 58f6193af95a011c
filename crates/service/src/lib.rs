//! Service layer for Numera.
//!
//! This crate owns everything between the pure domain logic in
//! `numera-core` and the HTTP boundary:
//! - Repository traits (the narrow persistence interface) and an in-memory
//!   implementation backing tests and the demo server
//! - External-client traits and HTTP implementations for the balance ledger
//!   and the OTP provider
//! - The orchestrating services: purchase/renewal settlement, order
//!   workflow, webhook gateway, and BYON verification
//!
//! Every mutating flow follows the same discipline: re-read authoritative
//! state, validate the transition through the core services, then commit
//! with a status-conditional update so concurrent writers get exactly one
//! winner.

pub mod clients;
pub mod repositories;
pub mod services;

pub use repositories::memory::MemoryStore;
pub use repositories::{
    DidRepository, InvoiceRepository, OrderRepository, StoreError, StoreResult,
    VerificationRepository,
};

//! Repository traits: the narrow persistence interface.
//!
//! Persistence is an external collaborator. The engine only needs find-by-id,
//! a couple of filtered finds, atomic insert/update per entity, and — for the
//! two entities whose transitions race — a status-conditional update that
//! commits the re-read-and-check atomically against the store.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use numera_core::billing::Invoice;
use numera_core::byon::ByonVerification;
use numera_core::inventory::{Did, DidStatus};
use numera_core::orders::{DidOrder, OrderStatus};
use numera_shared::types::{CustomerId, DidId, DidOrderId, InvoiceId, VerificationId};

pub mod memory;

/// Result type alias for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist.
    #[error("record not found")]
    NotFound,

    /// The record's status no longer matches the expected precondition.
    #[error("record status changed concurrently")]
    StatusConflict,

    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence interface for DIDs.
#[async_trait]
pub trait DidRepository: Send + Sync {
    /// Finds a DID by id.
    async fn find_by_id(&self, id: DidId) -> StoreResult<Option<Did>>;

    /// Finds a DID by its E.164 number.
    async fn find_by_e164(&self, e164: &str) -> StoreResult<Option<Did>>;

    /// Finds all assigned DIDs whose renewal cursor is due on or before the
    /// given date.
    async fn find_due_for_renewal(&self, on_or_before: NaiveDate) -> StoreResult<Vec<Did>>;

    /// Counts BYON numbers held by a customer.
    async fn count_byon_for_customer(&self, customer: CustomerId) -> StoreResult<u32>;

    /// Inserts a new DID.
    async fn insert(&self, did: Did) -> StoreResult<Did>;

    /// Replaces a DID iff its stored status still equals `expected`.
    ///
    /// This is the optimistic-check commit point: the caller re-reads,
    /// validates the transition, and the store rejects the write with
    /// [`StoreError::StatusConflict`] if another writer got there first.
    async fn update_if_status(&self, did: Did, expected: DidStatus) -> StoreResult<Did>;
}

/// Persistence interface for invoices.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Finds an invoice by id.
    async fn find_by_id(&self, id: InvoiceId) -> StoreResult<Option<Invoice>>;

    /// Finds an unpaid pending-sync renewal invoice for a customer covering
    /// the given period end, if one exists.
    async fn find_unpaid_renewal(
        &self,
        customer: CustomerId,
        period_end: NaiveDate,
    ) -> StoreResult<Option<Invoice>>;

    /// Inserts a new invoice.
    async fn insert(&self, invoice: Invoice) -> StoreResult<Invoice>;

    /// Replaces an invoice.
    async fn update(&self, invoice: Invoice) -> StoreResult<Invoice>;
}

/// Persistence interface for DID orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Finds an order by id.
    async fn find_by_id(&self, id: DidOrderId) -> StoreResult<Option<DidOrder>>;

    /// Finds all orders awaiting approval.
    async fn find_pending(&self) -> StoreResult<Vec<DidOrder>>;

    /// Inserts a new order.
    async fn insert(&self, order: DidOrder) -> StoreResult<DidOrder>;

    /// Replaces an order iff its stored status still equals `expected`.
    async fn update_if_status(
        &self,
        order: DidOrder,
        expected: OrderStatus,
    ) -> StoreResult<DidOrder>;
}

/// Persistence interface for BYON verifications.
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Finds a verification by id.
    async fn find_by_id(&self, id: VerificationId) -> StoreResult<Option<ByonVerification>>;

    /// Finds the newest pending verification for a customer and number.
    async fn find_newest_pending(
        &self,
        customer: CustomerId,
        e164: &str,
    ) -> StoreResult<Option<ByonVerification>>;

    /// Counts verifications a customer initiated on the given UTC day.
    async fn count_created_on(&self, customer: CustomerId, day: NaiveDate) -> StoreResult<u32>;

    /// Inserts a new verification.
    async fn insert(&self, verification: ByonVerification) -> StoreResult<ByonVerification>;

    /// Replaces a verification.
    async fn update(&self, verification: ByonVerification) -> StoreResult<ByonVerification>;
}

//! In-memory store backing tests and the demo server.
//!
//! Entity maps are sharded `DashMap`s; the status-conditional updates run
//! under the entry lock, so the check-and-replace is atomic per record.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use numera_core::billing::{Invoice, InvoiceType, SyncStatus};
use numera_core::byon::ByonVerification;
use numera_core::inventory::{Did, DidStatus};
use numera_core::orders::{DidOrder, OrderStatus};
use numera_shared::types::{CustomerId, DidId, DidOrderId, InvoiceId, VerificationId};

use super::{
    DidRepository, InvoiceRepository, OrderRepository, StoreError, StoreResult,
    VerificationRepository,
};

/// In-memory entity store implementing every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    dids: DashMap<DidId, Did>,
    invoices: DashMap<InvoiceId, Invoice>,
    orders: DashMap<DidOrderId, DidOrder>,
    verifications: DashMap<VerificationId, ByonVerification>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of DIDs currently stored. Used by the server at startup.
    #[must_use]
    pub fn did_count(&self) -> usize {
        self.dids.len()
    }
}

#[async_trait]
impl DidRepository for MemoryStore {
    async fn find_by_id(&self, id: DidId) -> StoreResult<Option<Did>> {
        Ok(self.dids.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_e164(&self, e164: &str) -> StoreResult<Option<Did>> {
        Ok(self
            .dids
            .iter()
            .find(|entry| entry.e164.as_e164() == e164)
            .map(|entry| entry.clone()))
    }

    async fn find_due_for_renewal(&self, on_or_before: NaiveDate) -> StoreResult<Vec<Did>> {
        Ok(self
            .dids
            .iter()
            .filter(|entry| {
                entry.status == DidStatus::Assigned
                    && entry
                        .next_renewal_at
                        .is_some_and(|due| due <= on_or_before)
            })
            .map(|entry| entry.clone())
            .collect())
    }

    async fn count_byon_for_customer(&self, customer: CustomerId) -> StoreResult<u32> {
        let count = self
            .dids
            .iter()
            .filter(|entry| entry.is_byon && entry.customer_id == Some(customer))
            .count();
        u32::try_from(count).map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn insert(&self, did: Did) -> StoreResult<Did> {
        self.dids.insert(did.id, did.clone());
        Ok(did)
    }

    async fn update_if_status(&self, did: Did, expected: DidStatus) -> StoreResult<Did> {
        match self.dids.entry(did.id) {
            Entry::Occupied(mut entry) => {
                if entry.get().status != expected {
                    return Err(StoreError::StatusConflict);
                }
                entry.insert(did.clone());
                Ok(did)
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn find_by_id(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices.get(&id).map(|entry| entry.clone()))
    }

    async fn find_unpaid_renewal(
        &self,
        customer: CustomerId,
        period_end: NaiveDate,
    ) -> StoreResult<Option<Invoice>> {
        Ok(self
            .invoices
            .iter()
            .find(|entry| {
                entry.customer_id == customer
                    && entry.invoice_type == InvoiceType::DidRenewal
                    && entry.sync_status == SyncStatus::Pending
                    && entry.paid_via.is_none()
                    && entry.period_end == Some(period_end)
            })
            .map(|entry| entry.clone()))
    }

    async fn insert(&self, invoice: Invoice) -> StoreResult<Invoice> {
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, invoice: Invoice) -> StoreResult<Invoice> {
        match self.invoices.entry(invoice.id) {
            Entry::Occupied(mut entry) => {
                entry.insert(invoice.clone());
                Ok(invoice)
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_by_id(&self, id: DidOrderId) -> StoreResult<Option<DidOrder>> {
        Ok(self.orders.get(&id).map(|entry| entry.clone()))
    }

    async fn find_pending(&self) -> StoreResult<Vec<DidOrder>> {
        Ok(self
            .orders
            .iter()
            .filter(|entry| entry.status == OrderStatus::PendingApproval)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn insert(&self, order: DidOrder) -> StoreResult<DidOrder> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_if_status(
        &self,
        order: DidOrder,
        expected: OrderStatus,
    ) -> StoreResult<DidOrder> {
        match self.orders.entry(order.id) {
            Entry::Occupied(mut entry) => {
                if entry.get().status != expected {
                    return Err(StoreError::StatusConflict);
                }
                entry.insert(order.clone());
                Ok(order)
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn find_by_id(&self, id: VerificationId) -> StoreResult<Option<ByonVerification>> {
        Ok(self.verifications.get(&id).map(|entry| entry.clone()))
    }

    async fn find_newest_pending(
        &self,
        customer: CustomerId,
        e164: &str,
    ) -> StoreResult<Option<ByonVerification>> {
        Ok(self
            .verifications
            .iter()
            .filter(|entry| {
                entry.customer_id == customer
                    && entry.phone.as_e164() == e164
                    && entry.is_pending()
            })
            .max_by_key(|entry| entry.created_at)
            .map(|entry| entry.clone()))
    }

    async fn count_created_on(&self, customer: CustomerId, day: NaiveDate) -> StoreResult<u32> {
        let count = self
            .verifications
            .iter()
            .filter(|entry| {
                entry.customer_id == customer && entry.created_at.date_naive() == day
            })
            .count();
        u32::try_from(count).map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn insert(&self, verification: ByonVerification) -> StoreResult<ByonVerification> {
        self.verifications
            .insert(verification.id, verification.clone());
        Ok(verification)
    }

    async fn update(&self, verification: ByonVerification) -> StoreResult<ByonVerification> {
        match self.verifications.entry(verification.id) {
            Entry::Occupied(mut entry) => {
                entry.insert(verification.clone());
                Ok(verification)
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }
}

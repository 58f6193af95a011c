//! Deferred-billing order orchestration.
//!
//! Customers who pay on invoice place an order instead of purchasing from
//! balance: the DID is reserved for 24 hours and an administrator approves
//! or rejects the order, or the expiry sweep times it out. Approval creates
//! a `did_purchase` invoice pending gateway collection; no balance is
//! touched on this path.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use numera_core::billing::{Invoice, InvoiceType, ProrationCalculator};
use numera_core::inventory::{Did, DidStatus, InventoryError, InventoryService};
use numera_core::orders::{DidOrder, OrderError, OrderStatus, OrderWorkflow, RESERVATION_HOURS};
use numera_shared::types::{CustomerId, DidId, DidOrderId, InvoiceId, TenantId};
use numera_shared::Clock;

use crate::repositories::{DidRepository, InvoiceRepository, OrderRepository, StoreError};

/// Order workflow orchestration.
pub struct OrderService {
    dids: Arc<dyn DidRepository>,
    orders: Arc<dyn OrderRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        dids: Arc<dyn DidRepository>,
        orders: Arc<dyn OrderRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dids,
            orders,
            invoices,
            clock,
        }
    }

    /// Places an order: reserves the DID for 24 hours and records a
    /// `pending_approval` order with a fee snapshot.
    ///
    /// # Errors
    ///
    /// - `Inventory` conflicts when the DID is not (or no longer) available
    /// - `Storage` when the order cannot be persisted
    pub async fn create_order(
        &self,
        tenant: TenantId,
        customer: CustomerId,
        did_id: DidId,
    ) -> Result<DidOrder, OrderError> {
        let now = self.clock.now();

        let did = self
            .dids
            .find_by_id(did_id)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?
            .ok_or(InventoryError::DidNotFound(did_id))?;

        let reserved_until = now + Duration::hours(RESERVATION_HOURS);
        let action = InventoryService::reserve(&did, customer, reserved_until)?;

        // Claim the DID first; the reservation is the contended resource.
        let mut reserved = did.clone();
        action.apply_to(&mut reserved, now);
        match self
            .dids
            .update_if_status(reserved, DidStatus::Available)
            .await
        {
            Ok(_) => {}
            Err(StoreError::StatusConflict) => {
                return Err(InventoryError::StateConflict(did_id).into());
            }
            Err(StoreError::NotFound) => {
                return Err(InventoryError::DidNotFound(did_id).into());
            }
            Err(StoreError::Backend(e)) => return Err(OrderError::Storage(e)),
        }

        let order = DidOrder::new_pending(
            tenant,
            customer,
            did_id,
            did.setup_price,
            did.monthly_price,
            now,
        );
        match self.orders.insert(order).await {
            Ok(order) => {
                info!(order = %order.id, did = %did_id, customer = %customer, "order placed");
                Ok(order)
            }
            Err(e) => {
                // Free the reservation so the DID does not stay parked
                // behind an order that never existed.
                warn!(did = %did_id, error = %e, "order insert failed; releasing reservation");
                self.release_reservation_best_effort(did_id, customer).await;
                Err(OrderError::Storage(e.to_string()))
            }
        }
    }

    /// Approves a pending order: assigns the DID to the ordering customer
    /// and creates a `did_purchase` invoice pending gateway collection,
    /// priced from the order's fee snapshot.
    ///
    /// # Errors
    ///
    /// - `OrderNotPending` when the order left `pending_approval`
    /// - `Inventory` conflicts when the reservation lapsed or was taken over
    pub async fn approve(
        &self,
        order_id: DidOrderId,
    ) -> Result<(DidOrder, Did, Option<InvoiceId>), OrderError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let order = self
            .orders
            .find_by_id(order_id)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let order_action = OrderWorkflow::approve(order.status, now)?;

        // Re-validate the DID is still reserved for the *same* customer;
        // the reservation can expire between page load and click.
        let did = self
            .dids
            .find_by_id(order.did_id)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?
            .ok_or(InventoryError::DidNotFound(order.did_id))?;

        // Price from the snapshot: the order is immune to later changes.
        let proration =
            ProrationCalculator::calculate(order.setup_fee, order.monthly_fee, today);
        let did_action = InventoryService::assign_reserved(
            &did,
            order.customer_id,
            proration.next_renewal_date,
            now,
        )?;

        let mut assigned = did.clone();
        did_action.apply_to(&mut assigned, now);
        let assigned = match self
            .dids
            .update_if_status(assigned, DidStatus::Reserved)
            .await
        {
            Ok(did) => did,
            Err(StoreError::StatusConflict) => {
                return Err(InventoryError::StateConflict(order.did_id).into());
            }
            Err(StoreError::NotFound) => {
                return Err(InventoryError::DidNotFound(order.did_id).into());
            }
            Err(StoreError::Backend(e)) => return Err(OrderError::Storage(e)),
        };

        let mut approved = order.clone();
        order_action.apply_to(&mut approved, now);
        let approved = match self
            .orders
            .update_if_status(approved, OrderStatus::PendingApproval)
            .await
        {
            Ok(order) => order,
            Err(StoreError::StatusConflict) => {
                // Another admin approved or rejected concurrently; the DID
                // claim above means this should not happen, so make it loud.
                error!(order = %order_id, "order status changed after DID assignment");
                return Err(self.order_not_pending(order_id).await);
            }
            Err(e) => return Err(OrderError::Storage(e.to_string())),
        };

        let invoice = Invoice::pending_gateway(
            order.tenant_id,
            order.customer_id,
            InvoiceType::DidPurchase,
            proration.total_due_now,
            Some(assigned.e164.as_e164().to_string()),
            None,
            now,
        );
        let invoice_id = match self.invoices.insert(invoice).await {
            Ok(invoice) => Some(invoice.id),
            Err(e) => {
                // The customer keeps the assignment; billing follows up.
                error!(
                    order = %order_id,
                    customer = %order.customer_id,
                    error = %e,
                    "invoice creation failed after order approval; continuing without rollback"
                );
                None
            }
        };

        info!(order = %order_id, did = %order.did_id, "order approved");
        Ok((approved, assigned, invoice_id))
    }

    /// Rejects a pending order and releases the reservation.
    ///
    /// # Errors
    ///
    /// - `OrderNotPending` when the order left `pending_approval`
    /// - `RejectionReasonRequired` when the reason is empty
    pub async fn reject(
        &self,
        order_id: DidOrderId,
        reason: String,
    ) -> Result<DidOrder, OrderError> {
        let now = self.clock.now();

        let order = self
            .orders
            .find_by_id(order_id)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let action = OrderWorkflow::reject(order.status, reason, now)?;

        let mut rejected = order.clone();
        action.apply_to(&mut rejected, now);
        let rejected = match self
            .orders
            .update_if_status(rejected, OrderStatus::PendingApproval)
            .await
        {
            Ok(order) => order,
            Err(StoreError::StatusConflict) => {
                return Err(self.order_not_pending(order_id).await);
            }
            Err(e) => return Err(OrderError::Storage(e.to_string())),
        };

        self.release_reservation_best_effort(order.did_id, order.customer_id)
            .await;

        info!(order = %order_id, "order rejected");
        Ok(rejected)
    }

    /// Expires every pending order whose reservation lapsed, releasing the
    /// DIDs back to stock. Returns the number of orders expired.
    pub async fn run_expiry_sweep(&self) -> Result<u32, OrderError> {
        let now = self.clock.now();
        let pending = self
            .orders
            .find_pending()
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?;

        let mut expired = 0u32;
        for order in pending {
            let did = match self.dids.find_by_id(order.did_id).await {
                Ok(Some(did)) => did,
                Ok(None) => {
                    warn!(order = %order.id, did = %order.did_id, "pending order references missing DID");
                    continue;
                }
                Err(e) => {
                    warn!(order = %order.id, error = %e, "DID lookup failed during expiry sweep");
                    continue;
                }
            };

            // Only reservations that actually lapsed expire the order.
            let lapsed = did.status == DidStatus::Reserved
                && did.reserved_for_customer == Some(order.customer_id)
                && did.reserved_until.is_some_and(|until| until <= now);
            if !lapsed {
                continue;
            }

            let Ok(action) = OrderWorkflow::expire(order.status, now) else {
                continue;
            };
            let mut update = order.clone();
            action.apply_to(&mut update, now);
            match self
                .orders
                .update_if_status(update, OrderStatus::PendingApproval)
                .await
            {
                Ok(_) => {
                    self.release_reservation_best_effort(order.did_id, order.customer_id)
                        .await;
                    expired += 1;
                }
                Err(StoreError::StatusConflict) => {
                    debug!(order = %order.id, "order left pending during expiry sweep");
                }
                Err(e) => {
                    warn!(order = %order.id, error = %e, "order expiry write failed");
                }
            }
        }

        if expired > 0 {
            info!(expired, "order expiry sweep finished");
        }
        Ok(expired)
    }

    /// Releases a reservation if it is still held for the given customer.
    ///
    /// Used on rejection, expiry, and compensation paths; a reservation that
    /// already lapsed back to stock is not an error.
    async fn release_reservation_best_effort(&self, did_id: DidId, customer: CustomerId) {
        let now = self.clock.now();
        let did = match self.dids.find_by_id(did_id).await {
            Ok(Some(did)) => did,
            Ok(None) => {
                warn!(did = %did_id, "DID vanished while releasing reservation");
                return;
            }
            Err(e) => {
                warn!(did = %did_id, error = %e, "DID lookup failed while releasing reservation");
                return;
            }
        };

        if did.status != DidStatus::Reserved || did.reserved_for_customer != Some(customer) {
            debug!(did = %did_id, "reservation already released or taken over");
            return;
        }

        let Ok(action) = InventoryService::release_reservation(&did) else {
            return;
        };
        let mut released = did.clone();
        action.apply_to(&mut released, now);
        if let Err(e) = self
            .dids
            .update_if_status(released, DidStatus::Reserved)
            .await
        {
            warn!(did = %did_id, error = %e, "reservation release write failed");
        }
    }

    /// Re-reads an order to report its current status in `OrderNotPending`.
    async fn order_not_pending(&self, order_id: DidOrderId) -> OrderError {
        match self.orders.find_by_id(order_id).await {
            Ok(Some(order)) => OrderError::OrderNotPending {
                current: order.status,
            },
            _ => OrderError::OrderNotFound(order_id),
        }
    }
}

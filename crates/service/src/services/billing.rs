//! Balance-first billing orchestration: purchase and renewal.
//!
//! Purchase and renewal share one strategy: settle from the internal balance
//! first, and only fall back to gateway invoicing when balance is
//! insufficient. Purchase fails outright on insufficient balance; renewal
//! emits a pending invoice for external collection instead.
//!
//! The debit and the subsequent invoice/inventory writes are not one
//! transaction. A debit that commits while the final assignment conflicts
//! surfaces as `AssignmentFailedAfterDebit` and is never silently dropped;
//! an invoice-creation failure after a committed debit is logged and does
//! not roll the provisioning back.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use numera_core::billing::{
    BillingError, Invoice, InvoiceType, LedgerMovement, MovementReason, ProrationCalculator,
};
use numera_core::inventory::{Did, DidStatus, InventoryError, InventoryService};
use numera_shared::types::{CustomerId, DidId, InvoiceId, TenantId};
use numera_shared::Clock;

use crate::clients::{BalanceLedger, LedgerClientError};
use crate::repositories::{DidRepository, InvoiceRepository, StoreError};

/// Result of a successful purchase.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// The assigned DID.
    pub did: Did,
    /// The settlement invoice, when invoice creation succeeded.
    pub invoice_id: Option<InvoiceId>,
    /// The amount debited (setup + prorated first month).
    pub charged: Decimal,
    /// Balance after the debit.
    pub balance_after: Decimal,
}

/// Result of one renewal sweep run.
#[derive(Debug, Clone, Default)]
pub struct RenewalOutcome {
    /// DIDs whose renewal cursor was advanced after a balance debit.
    pub renewed: Vec<DidId>,
    /// Pending invoices created for customers whose balance fell short.
    pub invoiced: Vec<InvoiceId>,
    /// Customer groups skipped because a dependent system failed.
    pub failures: u32,
}

/// Balance-first billing orchestrator.
pub struct BillingService {
    dids: Arc<dyn DidRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    ledger: Arc<dyn BalanceLedger>,
    clock: Arc<dyn Clock>,
}

impl BillingService {
    /// Creates the orchestrator.
    #[must_use]
    pub fn new(
        dids: Arc<dyn DidRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        ledger: Arc<dyn BalanceLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dids,
            invoices,
            ledger,
            clock,
        }
    }

    /// Purchases an available DID for a customer, settling from balance.
    ///
    /// Flow: re-read the DID → compute the prorated cost → check balance →
    /// debit → append movement → create the settlement invoice → assign the
    /// DID. No inventory mutation happens unless the debit committed.
    ///
    /// # Errors
    ///
    /// - `Inventory` conflicts when the DID is not (or no longer) available
    /// - `InsufficientBalance` when the balance does not cover the charge
    /// - `BalanceDeductionFailed` when the debit raced a concurrent spend
    /// - `AssignmentFailedAfterDebit` when the final claim lost a race after
    ///   the money moved
    pub async fn purchase_did(
        &self,
        tenant: TenantId,
        customer: CustomerId,
        did_id: DidId,
    ) -> Result<PurchaseOutcome, BillingError> {
        let now = self.clock.now();
        let today = now.date_naive();

        // Re-read; the caller's view may be stale.
        let did = self
            .dids
            .find_by_id(did_id)
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?
            .ok_or(InventoryError::DidNotFound(did_id))?;

        let proration = ProrationCalculator::calculate(did.setup_price, did.monthly_price, today);
        let action =
            InventoryService::assign(&did, customer, proration.next_renewal_date, now)?;
        let total = proration.total_due_now;

        let available = self
            .ledger
            .balance(tenant, customer)
            .await
            .map_err(|e| BillingError::LedgerUnavailable(e.to_string()))?;
        if available < total {
            return Err(BillingError::InsufficientBalance {
                required: total,
                available,
            });
        }

        // The debit is the point of no return: nothing was written yet, and
        // everything after it must either complete or surface loudly.
        let balance_after = match self.ledger.debit(customer, total).await {
            Ok(balance) => balance,
            Err(e @ LedgerClientError::InsufficientFunds { .. }) => {
                return Err(BillingError::BalanceDeductionFailed(e.to_string()));
            }
            Err(LedgerClientError::Unavailable(e)) => {
                return Err(BillingError::BalanceDeductionFailed(e));
            }
        };

        if let Err(e) = self
            .ledger
            .append_movement(LedgerMovement::debit(
                customer,
                total,
                balance_after,
                MovementReason::DidPurchase,
                now,
            ))
            .await
        {
            warn!(customer = %customer, error = %e, "ledger movement append failed after debit");
        }

        let invoice = Invoice::paid_from_balance(
            tenant,
            customer,
            InvoiceType::DidPurchase,
            total,
            Some(did.e164.as_e164().to_string()),
            None,
            now,
        );
        let invoice_id = match self.invoices.insert(invoice).await {
            Ok(invoice) => Some(invoice.id),
            Err(e) => {
                // Deliberate asymmetry: the customer keeps the resource and
                // the debit stands; billing needs manual follow-up.
                error!(
                    customer = %customer,
                    did = %did_id,
                    amount = %total,
                    error = %e,
                    "invoice creation failed after debit; continuing without rollback"
                );
                None
            }
        };

        let mut assigned = did.clone();
        action.apply_to(&mut assigned, now);
        match self
            .dids
            .update_if_status(assigned, DidStatus::Available)
            .await
        {
            Ok(did) => {
                info!(
                    customer = %customer,
                    did = %did_id,
                    charged = %total,
                    "DID purchased from balance"
                );
                Ok(PurchaseOutcome {
                    did,
                    invoice_id,
                    charged: total,
                    balance_after,
                })
            }
            Err(StoreError::StatusConflict | StoreError::NotFound) => {
                error!(
                    customer = %customer,
                    did = %did_id,
                    amount = %total,
                    "DID claim lost a race after the debit committed"
                );
                Err(BillingError::AssignmentFailedAfterDebit {
                    did: did_id,
                    customer,
                    amount: total,
                })
            }
            Err(StoreError::Backend(e)) => {
                error!(
                    customer = %customer,
                    did = %did_id,
                    amount = %total,
                    error = %e,
                    "DID assignment write failed after the debit committed"
                );
                Err(BillingError::AssignmentFailedAfterDebit {
                    did: did_id,
                    customer,
                    amount: total,
                })
            }
        }
    }

    /// Runs the renewal sweep for every DID whose cursor is due.
    ///
    /// DIDs are grouped per customer. A group whose balance covers the
    /// summed monthly prices is debited once and every cursor advances by
    /// one month; otherwise one pending `did_renewal` invoice is created for
    /// the customer and all cursors stay put, so a second sweep before
    /// payment re-evaluates the same unadvanced cursors.
    pub async fn run_renewal_sweep(&self) -> Result<RenewalOutcome, BillingError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let due = self
            .dids
            .find_due_for_renewal(today)
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?;

        let mut groups: HashMap<(TenantId, CustomerId), Vec<Did>> = HashMap::new();
        for did in due {
            let Some(customer) = did.customer_id else {
                warn!(did = %did.id, "due DID has no owner; skipping");
                continue;
            };
            groups.entry((did.tenant_id, customer)).or_default().push(did);
        }

        let period_end = Self::period_end(today);
        let mut outcome = RenewalOutcome::default();

        for ((tenant, customer), group) in groups {
            let total: Decimal = group.iter().map(|d| d.monthly_price).sum();

            let available = match self.ledger.balance(tenant, customer).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!(customer = %customer, error = %e, "balance lookup failed; skipping group");
                    outcome.failures += 1;
                    continue;
                }
            };

            if available >= total {
                match self
                    .renew_group_from_balance(tenant, customer, &group, total, now)
                    .await
                {
                    Ok(renewed) => outcome.renewed.extend(renewed),
                    Err(e) => {
                        warn!(customer = %customer, error = %e, "balance renewal failed; skipping group");
                        outcome.failures += 1;
                    }
                }
            } else {
                match self
                    .invoice_group_via_gateway(tenant, customer, total, period_end, now)
                    .await
                {
                    Ok(Some(invoice_id)) => outcome.invoiced.push(invoice_id),
                    Ok(None) => {} // already invoiced by an earlier sweep
                    Err(e) => {
                        warn!(customer = %customer, error = %e, "renewal invoicing failed");
                        outcome.failures += 1;
                    }
                }
            }
        }

        info!(
            renewed = outcome.renewed.len(),
            invoiced = outcome.invoiced.len(),
            failures = outcome.failures,
            "renewal sweep finished"
        );
        Ok(outcome)
    }

    /// Debits the group total once and advances every cursor.
    async fn renew_group_from_balance(
        &self,
        tenant: TenantId,
        customer: CustomerId,
        group: &[Did],
        total: Decimal,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<DidId>, BillingError> {
        let balance_after = match self.ledger.debit(customer, total).await {
            Ok(balance) => balance,
            Err(LedgerClientError::InsufficientFunds { .. }) => {
                // Raced a concurrent spend; fall back to gateway collection.
                let period_end = Self::period_end(now.date_naive());
                let _invoice = self
                    .invoice_group_via_gateway(tenant, customer, total, period_end, now)
                    .await?;
                return Ok(Vec::new());
            }
            Err(LedgerClientError::Unavailable(e)) => {
                return Err(BillingError::LedgerUnavailable(e));
            }
        };

        if let Err(e) = self
            .ledger
            .append_movement(LedgerMovement::debit(
                customer,
                total,
                balance_after,
                MovementReason::DidRenewal,
                now,
            ))
            .await
        {
            warn!(customer = %customer, error = %e, "ledger movement append failed after renewal debit");
        }

        let invoice = Invoice::paid_from_balance(
            tenant,
            customer,
            InvoiceType::DidRenewal,
            total,
            None,
            Some(Self::period_end(now.date_naive())),
            now,
        );
        if let Err(e) = self.invoices.insert(invoice).await {
            error!(
                customer = %customer,
                amount = %total,
                error = %e,
                "renewal invoice creation failed after debit; continuing without rollback"
            );
        }

        let mut renewed = Vec::with_capacity(group.len());
        for did in group {
            let Some(cursor) = did.next_renewal_at else {
                continue;
            };
            let mut advanced = did.clone();
            advanced.next_renewal_at = Some(ProrationCalculator::advance_one_month(cursor));
            advanced.updated_at = now;
            match self
                .dids
                .update_if_status(advanced, DidStatus::Assigned)
                .await
            {
                Ok(_) => renewed.push(did.id),
                Err(e) => {
                    // The money moved for the whole group; a cursor that
                    // cannot advance needs manual reconciliation.
                    error!(
                        customer = %customer,
                        did = %did.id,
                        error = %e,
                        "cursor advance failed after renewal debit"
                    );
                }
            }
        }
        Ok(renewed)
    }

    /// Creates one pending renewal invoice per customer, deduplicating
    /// against an invoice from an earlier sweep.
    async fn invoice_group_via_gateway(
        &self,
        tenant: TenantId,
        customer: CustomerId,
        total: Decimal,
        period_end: chrono::NaiveDate,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<InvoiceId>, BillingError> {
        let existing = self
            .invoices
            .find_unpaid_renewal(customer, period_end)
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?;
        if let Some(invoice) = existing {
            info!(
                customer = %customer,
                invoice = %invoice.id,
                "pending renewal invoice already exists; sweep is a no-op"
            );
            return Ok(None);
        }

        let invoice = Invoice::pending_gateway(
            tenant,
            customer,
            InvoiceType::DidRenewal,
            total,
            None,
            Some(period_end),
            now,
        );
        let invoice = self
            .invoices
            .insert(invoice)
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?;
        info!(
            customer = %customer,
            invoice = %invoice.id,
            amount = %total,
            "created pending renewal invoice for gateway collection"
        );
        Ok(Some(invoice.id))
    }

    /// Last day of the month containing `today`: the end of the period a
    /// renewal sweep bills for.
    fn period_end(today: chrono::NaiveDate) -> chrono::NaiveDate {
        ProrationCalculator::first_of_next_month(today)
            .pred_opt()
            .expect("a first-of-month always has a predecessor")
    }
}

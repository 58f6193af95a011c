//! Webhook gateway: authenticated, idempotent reconciliation of gateway
//! events.
//!
//! Two event kinds arrive from the billing gateway, asynchronously and
//! possibly out of order: payment confirmations and overdue notices. Both
//! are authenticated (HMAC + replay window) before the body is even parsed,
//! resolved to an invoice through the free-text reference, checked for
//! idempotency, and dispatched to the handler selected by the invoice type.
//! Duplicate deliveries after a successful application are safe no-ops.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use numera_core::billing::{Invoice, InvoiceType, LedgerMovement, MovementReason};
use numera_core::inventory::{DidStatus, InventoryService, ReleaseKind};
use numera_core::webhook::{
    extract_invoice_reference, verify_signature, OverdueNotice, PaymentConfirmation, WebhookAck,
    WebhookError,
};
use numera_shared::types::CustomerId;
use numera_shared::Clock;

use crate::clients::BalanceLedger;
use crate::repositories::{DidRepository, InvoiceRepository};

/// Webhook gateway service.
pub struct WebhookService {
    invoices: Arc<dyn InvoiceRepository>,
    dids: Arc<dyn DidRepository>,
    ledger: Arc<dyn BalanceLedger>,
    clock: Arc<dyn Clock>,
    secret: String,
    tolerance_secs: i64,
}

impl WebhookService {
    /// Creates the gateway with the shared webhook secret and replay window.
    #[must_use]
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        dids: Arc<dyn DidRepository>,
        ledger: Arc<dyn BalanceLedger>,
        clock: Arc<dyn Clock>,
        secret: String,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            invoices,
            dids,
            ledger,
            clock,
            secret,
            tolerance_secs,
        }
    }

    /// Handles a payment confirmation event.
    ///
    /// Idempotent: an invoice already marked paid acknowledges with
    /// `already_processed` and changes nothing.
    pub async fn handle_payment(
        &self,
        timestamp: &str,
        signature: &str,
        raw_body: &str,
    ) -> Result<WebhookAck, WebhookError> {
        self.authenticate(timestamp, signature, raw_body)?;

        let event: PaymentConfirmation = serde_json::from_str(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let invoice = self.resolve_invoice(&event.notes).await?;

        if invoice.is_paid() {
            info!(invoice = %invoice.id, "duplicate payment confirmation; no-op");
            return Ok(WebhookAck::for_invoice(
                "already_processed",
                invoice.id,
                invoice.invoice_type,
            ));
        }

        let now = self.clock.now();
        let mut paid = invoice.clone();
        paid.mark_paid_via_gateway(
            Some(event.external_invoice_id.clone()),
            event.paid_at.unwrap_or(now),
        );
        let paid = self
            .invoices
            .update(paid)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?;

        let detail = self.dispatch_paid(&paid).await?;
        info!(invoice = %paid.id, invoice_type = %paid.invoice_type, "payment confirmation applied");
        Ok(WebhookAck::for_invoice("processed", paid.id, paid.invoice_type).with_detail(detail))
    }

    /// Handles an overdue notice event.
    ///
    /// Idempotent: an invoice already paid acknowledges with `already_paid`.
    /// Only renewal invoices have an overdue handler (non-payment release);
    /// other types acknowledge with `no_handler` so the gateway never
    /// retries a structurally unrecognized event.
    pub async fn handle_overdue(
        &self,
        timestamp: &str,
        signature: &str,
        raw_body: &str,
    ) -> Result<WebhookAck, WebhookError> {
        self.authenticate(timestamp, signature, raw_body)?;

        let event: OverdueNotice = serde_json::from_str(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let invoice = self.resolve_invoice(&event.notes).await?;

        if invoice.is_paid() {
            info!(invoice = %invoice.id, "overdue notice for settled invoice; no-op");
            return Ok(WebhookAck::for_invoice(
                "already_paid",
                invoice.id,
                invoice.invoice_type,
            ));
        }

        if invoice.invoice_type != InvoiceType::DidRenewal {
            warn!(
                invoice = %invoice.id,
                invoice_type = %invoice.invoice_type,
                "no overdue handler for invoice type"
            );
            return Ok(WebhookAck::for_invoice(
                "no_handler",
                invoice.id,
                invoice.invoice_type,
            ));
        }

        let now = self.clock.now();
        let bound = invoice
            .period_end
            .or(event.period_end)
            .unwrap_or_else(|| now.date_naive());
        let released = self.release_due_dids(invoice.customer_id, bound).await?;

        // Keep a trace of the notice on the invoice for reconciliation.
        let mut noticed = invoice.clone();
        noticed.sync_error = Some("overdue notice received".to_string());
        noticed.updated_at = now;
        if let Err(e) = self.invoices.update(noticed).await {
            warn!(invoice = %invoice.id, error = %e, "failed to record overdue notice on invoice");
        }

        info!(invoice = %invoice.id, released, "overdue notice applied");
        Ok(
            WebhookAck::for_invoice("processed", invoice.id, invoice.invoice_type)
                .with_detail(json!({ "released": released })),
        )
    }

    /// Verifies the signature and replay window before anything else runs.
    fn authenticate(
        &self,
        timestamp: &str,
        signature: &str,
        raw_body: &str,
    ) -> Result<(), WebhookError> {
        verify_signature(
            &self.secret,
            timestamp,
            raw_body,
            signature,
            self.clock.now(),
            self.tolerance_secs,
        )
        .inspect_err(|e| {
            // Log the specific cause; the response stays generic.
            warn!(error = %e, "webhook authentication failed");
        })
    }

    /// Resolves the target invoice from the free-text notes field.
    async fn resolve_invoice(&self, notes: &str) -> Result<Invoice, WebhookError> {
        let invoice_id =
            extract_invoice_reference(notes).ok_or(WebhookError::UnresolvableReference)?;
        self.invoices
            .find_by_id(invoice_id)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?
            .ok_or(WebhookError::InvoiceNotFound(invoice_id))
    }

    /// Dispatches the paid-handler selected by the invoice type.
    async fn dispatch_paid(&self, invoice: &Invoice) -> Result<serde_json::Value, WebhookError> {
        match invoice.invoice_type {
            InvoiceType::BalanceTopup => {
                let balance = self
                    .ledger
                    .credit(invoice.customer_id, invoice.amount)
                    .await
                    .map_err(|e| WebhookError::LedgerUnavailable(e.to_string()))?;
                let now = self.clock.now();
                if let Err(e) = self
                    .ledger
                    .append_movement(LedgerMovement::credit(
                        invoice.customer_id,
                        invoice.amount,
                        balance,
                        MovementReason::BalanceTopup,
                        now,
                    ))
                    .await
                {
                    warn!(customer = %invoice.customer_id, error = %e, "movement append failed after top-up credit");
                }
                Ok(json!({ "credited": invoice.amount, "balance": balance }))
            }
            InvoiceType::DidRenewal => {
                let bound = invoice
                    .period_end
                    .unwrap_or_else(|| self.clock.now().date_naive());
                let advanced = self.advance_due_cursors(invoice.customer_id, bound).await;
                Ok(json!({ "advanced": advanced }))
            }
            InvoiceType::DidPurchase => {
                info!(
                    invoice = %invoice.id,
                    ddi = invoice.ddi_e164.as_deref().unwrap_or(""),
                    "gateway collected a purchase invoice"
                );
                Ok(json!({ "ddi": invoice.ddi_e164 }))
            }
            InvoiceType::Standard => {
                info!(invoice = %invoice.id, "gateway collected a standard invoice");
                Ok(serde_json::Value::Null)
            }
        }
    }

    /// Advances the renewal cursor by one month for every DID of the
    /// customer still due by `bound`. The cursors were deliberately left
    /// unadvanced when the pending invoice was created.
    async fn advance_due_cursors(&self, customer: CustomerId, bound: chrono::NaiveDate) -> u32 {
        let now = self.clock.now();
        let due = match self.dids.find_due_for_renewal(bound).await {
            Ok(dids) => dids,
            Err(e) => {
                warn!(customer = %customer, error = %e, "due-DID lookup failed after renewal payment");
                return 0;
            }
        };

        let mut advanced = 0u32;
        for did in due.into_iter().filter(|d| d.customer_id == Some(customer)) {
            let Some(cursor) = did.next_renewal_at else {
                continue;
            };
            let mut update = did.clone();
            update.next_renewal_at =
                Some(numera_core::billing::ProrationCalculator::advance_one_month(cursor));
            update.updated_at = now;
            match self.dids.update_if_status(update, DidStatus::Assigned).await {
                Ok(_) => advanced += 1,
                Err(e) => {
                    warn!(did = %did.id, error = %e, "cursor advance failed after renewal payment");
                }
            }
        }
        advanced
    }

    /// Releases every DID of the customer still due by `bound`
    /// (non-payment release). Duplicate deliveries release nothing further
    /// because released DIDs no longer carry a due cursor.
    async fn release_due_dids(
        &self,
        customer: CustomerId,
        bound: chrono::NaiveDate,
    ) -> Result<u32, WebhookError> {
        let now = self.clock.now();
        let due = self
            .dids
            .find_due_for_renewal(bound)
            .await
            .map_err(|e| WebhookError::Storage(e.to_string()))?;

        let mut released = 0u32;
        for did in due.into_iter().filter(|d| d.customer_id == Some(customer)) {
            let action = match InventoryService::release(&did, ReleaseKind::NonPayment) {
                Ok(action) => action,
                Err(e) => {
                    // BYON numbers never carry renewal invoices; log and move on.
                    warn!(did = %did.id, error = %e, "skipping non-payment release");
                    continue;
                }
            };
            let mut update = did.clone();
            action.apply_to(&mut update, now);
            match self.dids.update_if_status(update, DidStatus::Assigned).await {
                Ok(_) => released += 1,
                Err(e) => {
                    warn!(did = %did.id, error = %e, "non-payment release write failed");
                }
            }
        }
        Ok(released)
    }
}

//! Billing domain types: invoices and ledger movements.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use numera_shared::types::{CustomerId, InvoiceId, LedgerMovementId, TenantId};

/// Invoice generation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Queued for generation.
    Waiting,
    /// Generation in progress.
    Processing,
    /// Generated successfully.
    Created,
    /// Generation failed.
    Error,
}

/// Discriminator selecting the webhook handler for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Ordinary service invoice.
    Standard,
    /// One-time DID purchase (setup + prorated first month).
    DidPurchase,
    /// Monthly DID renewal.
    DidRenewal,
    /// Customer balance top-up.
    BalanceTopup,
}

impl InvoiceType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::DidPurchase => "did_purchase",
            Self::DidRenewal => "did_renewal",
            Self::BalanceTopup => "balance_topup",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing gateway synchronization status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Settled internally; the gateway never sees this invoice.
    NotApplicable,
    /// Awaiting collection through the gateway.
    Pending,
    /// Acknowledged by the gateway.
    Synced,
    /// Gateway synchronization failed.
    Failed,
}

/// How an invoice was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidVia {
    /// Settled silently from the internal account balance.
    Balance,
    /// Collected through the external billing gateway.
    Gateway,
}

/// An invoice. Never deleted; `ddi_e164` preserves the billed number even if
/// the DID record is later released or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier.
    pub id: InvoiceId,
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Billed customer.
    pub customer_id: CustomerId,
    /// Net amount.
    pub amount: Decimal,
    /// Tax amount (computed elsewhere).
    pub tax: Decimal,
    /// Generation status.
    pub status: InvoiceStatus,
    /// Handler discriminator.
    pub invoice_type: InvoiceType,
    /// Identifier assigned by the billing gateway.
    pub external_invoice_id: Option<String>,
    /// Gateway synchronization status.
    pub sync_status: SyncStatus,
    /// When the gateway acknowledged the invoice.
    pub synced_at: Option<DateTime<Utc>>,
    /// When the invoice was paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Last gateway synchronization error.
    pub sync_error: Option<String>,
    /// Number of gateway synchronization attempts.
    pub sync_attempts: u32,
    /// How the invoice was settled; `None` means unpaid.
    pub paid_via: Option<PaidVia>,
    /// Denormalized E.164 of the billed DID, written at creation time.
    pub ddi_e164: Option<String>,
    /// End of the billed period, for renewal invoices.
    pub period_end: Option<NaiveDate>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates an invoice already settled from the internal balance.
    ///
    /// Balance-paid invoices are never synchronized to the gateway.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn paid_from_balance(
        tenant_id: TenantId,
        customer_id: CustomerId,
        invoice_type: InvoiceType,
        amount: Decimal,
        ddi_e164: Option<String>,
        period_end: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            tenant_id,
            customer_id,
            amount,
            tax: Decimal::ZERO,
            status: InvoiceStatus::Created,
            invoice_type,
            external_invoice_id: None,
            sync_status: SyncStatus::NotApplicable,
            synced_at: None,
            paid_at: Some(now),
            sync_error: None,
            sync_attempts: 0,
            paid_via: Some(PaidVia::Balance),
            ddi_e164,
            period_end,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an unpaid invoice pending collection through the gateway.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn pending_gateway(
        tenant_id: TenantId,
        customer_id: CustomerId,
        invoice_type: InvoiceType,
        amount: Decimal,
        ddi_e164: Option<String>,
        period_end: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            tenant_id,
            customer_id,
            amount,
            tax: Decimal::ZERO,
            status: InvoiceStatus::Created,
            invoice_type,
            external_invoice_id: None,
            sync_status: SyncStatus::Pending,
            synced_at: None,
            paid_at: None,
            sync_error: None,
            sync_attempts: 0,
            paid_via: None,
            ddi_e164,
            period_end,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the invoice has been settled by either path.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.paid_via.is_some()
    }

    /// Returns true if the invoice is already settled through the gateway.
    #[must_use]
    pub fn is_paid_via_gateway(&self) -> bool {
        self.paid_via == Some(PaidVia::Gateway)
    }

    /// Marks the invoice paid through the gateway.
    pub fn mark_paid_via_gateway(
        &mut self,
        external_invoice_id: Option<String>,
        paid_at: DateTime<Utc>,
    ) {
        self.paid_via = Some(PaidVia::Gateway);
        self.paid_at = Some(paid_at);
        self.sync_status = SyncStatus::Synced;
        self.synced_at = Some(paid_at);
        if external_invoice_id.is_some() {
            self.external_invoice_id = external_invoice_id;
        }
        self.updated_at = paid_at;
    }

    /// Returns true if the settlement/sync fields are mutually consistent:
    /// balance-paid implies no gateway sync, and pending sync implies unpaid.
    #[must_use]
    pub fn settlement_consistent(&self) -> bool {
        match self.paid_via {
            Some(PaidVia::Balance) => self.sync_status == SyncStatus::NotApplicable,
            Some(PaidVia::Gateway) => true,
            None => true,
        }
    }
}

/// Why a ledger movement was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Debit for a DID purchase.
    DidPurchase,
    /// Debit for a DID renewal batch.
    DidRenewal,
    /// Credit from a gateway-confirmed balance top-up.
    BalanceTopup,
}

impl MovementReason {
    /// Returns the string representation of the reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DidPurchase => "did_purchase",
            Self::DidRenewal => "did_renewal",
            Self::BalanceTopup => "balance_topup",
        }
    }
}

/// An append-only record of a balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerMovement {
    /// Unique identifier.
    pub id: LedgerMovementId,
    /// Customer whose balance moved.
    pub customer_id: CustomerId,
    /// Signed delta: negative for debits, positive for credits.
    pub delta: Decimal,
    /// Balance immediately after the mutation.
    pub balance_after: Decimal,
    /// Why the balance moved.
    pub reason: MovementReason,
    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerMovement {
    /// Records a debit (negative delta).
    #[must_use]
    pub fn debit(
        customer_id: CustomerId,
        amount: Decimal,
        balance_after: Decimal,
        reason: MovementReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerMovementId::new(),
            customer_id,
            delta: -amount,
            balance_after,
            reason,
            created_at: now,
        }
    }

    /// Records a credit (positive delta).
    #[must_use]
    pub fn credit(
        customer_id: CustomerId,
        amount: Decimal,
        balance_after: Decimal,
        reason: MovementReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerMovementId::new(),
            customer_id,
            delta: amount,
            balance_after,
            reason,
            created_at: now,
        }
    }
}

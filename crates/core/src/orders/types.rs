//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use numera_shared::types::{CustomerId, DidId, DidOrderId, TenantId};

/// Status of a DID order.
///
/// The valid transitions are:
/// - PendingApproval → Approved (admin approval)
/// - PendingApproval → Rejected (admin rejection)
/// - PendingApproval → Expired (reservation lapsed)
///
/// Approved, Rejected, and Expired are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting administrator review.
    PendingApproval,
    /// Approved; the DID was assigned.
    Approved,
    /// Rejected; the reservation was released.
    Rejected,
    /// The reservation lapsed before review.
    Expired,
}

impl OrderStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Returns true if no further transition may leave this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PendingApproval)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deferred-billing order for a DID.
///
/// The fee snapshot locks the prices at order time; later price changes on
/// the DID do not affect the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidOrder {
    /// Unique identifier.
    pub id: DidOrderId,
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Ordering customer.
    pub customer_id: CustomerId,
    /// The reserved DID.
    pub did_id: DidId,
    /// Current status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub requested_at: DateTime<Utc>,
    /// When the order was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the order was rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Why the order was rejected.
    pub rejection_reason: Option<String>,
    /// When the reservation lapsed.
    pub expired_at: Option<DateTime<Utc>>,
    /// Locked-in setup fee.
    pub setup_fee: Decimal,
    /// Locked-in monthly fee.
    pub monthly_fee: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl DidOrder {
    /// Creates a new order in `PendingApproval` with a fee snapshot.
    #[must_use]
    pub fn new_pending(
        tenant_id: TenantId,
        customer_id: CustomerId,
        did_id: DidId,
        setup_fee: Decimal,
        monthly_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DidOrderId::new(),
            tenant_id,
            customer_id,
            did_id,
            status: OrderStatus::PendingApproval,
            requested_at: now,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            expired_at: None,
            setup_fee,
            monthly_fee,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A validated order transition with its audit fields.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// PendingApproval → Approved.
    Approve {
        /// The new status (`Approved`).
        new_status: OrderStatus,
        /// Approval timestamp.
        approved_at: DateTime<Utc>,
    },
    /// PendingApproval → Rejected.
    Reject {
        /// The new status (`Rejected`).
        new_status: OrderStatus,
        /// Rejection timestamp.
        rejected_at: DateTime<Utc>,
        /// Why the order was rejected.
        rejection_reason: String,
    },
    /// PendingApproval → Expired.
    Expire {
        /// The new status (`Expired`).
        new_status: OrderStatus,
        /// Expiry timestamp.
        expired_at: DateTime<Utc>,
    },
}

impl OrderAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> OrderStatus {
        match self {
            Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Expire { new_status, .. } => *new_status,
        }
    }

    /// Applies the field mutations of this action to an order.
    pub fn apply_to(&self, order: &mut DidOrder, now: DateTime<Utc>) {
        match self {
            Self::Approve {
                new_status,
                approved_at,
            } => {
                order.status = *new_status;
                order.approved_at = Some(*approved_at);
            }
            Self::Reject {
                new_status,
                rejected_at,
                rejection_reason,
            } => {
                order.status = *new_status;
                order.rejected_at = Some(*rejected_at);
                order.rejection_reason = Some(rejection_reason.clone());
            }
            Self::Expire {
                new_status,
                expired_at,
            } => {
                order.status = *new_status;
                order.expired_at = Some(*expired_at);
            }
        }
        order.updated_at = now;
    }
}

//! Inventory domain types for DID lifecycle management.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use numera_shared::types::{CustomerId, DidId, PhoneNumber, TenantId, VerificationId};

/// Lifecycle status of a DID.
///
/// The valid transitions are:
/// - Available → Reserved (order placed)
/// - Available → Assigned (immediate purchase)
/// - Reserved → Assigned (order approved)
/// - Reserved → Available (order rejected or expired)
/// - Assigned → Available (voluntary or non-payment release)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidStatus {
    /// In stock, purchasable by any customer.
    Available,
    /// Held for a specific customer pending order approval.
    Reserved,
    /// Owned by a customer and billed monthly.
    Assigned,
    /// Temporarily out of service (administrative action).
    Suspended,
    /// Permanently out of service.
    Disabled,
}

impl DidStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Assigned => "assigned",
            Self::Suspended => "suspended",
            Self::Disabled => "disabled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            "assigned" => Some(Self::Assigned),
            "suspended" => Some(Self::Suspended),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for DidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an assigned DID is being released back to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    /// The owning customer gave the number up.
    Voluntary,
    /// The renewal invoice went overdue.
    NonPayment,
    /// An administrator forced the release.
    Administrative,
}

/// A DID: a phone number resource in the marketplace inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Did {
    /// Unique identifier.
    pub id: DidId,
    /// Tenant this DID belongs to.
    pub tenant_id: TenantId,
    /// Full number in E.164 form.
    pub e164: PhoneNumber,
    /// Number without the country dialing prefix.
    pub national_number: String,
    /// ISO country code derived from the dialing prefix.
    pub country: Option<String>,
    /// Owning customer; set iff status is `Assigned`.
    pub customer_id: Option<CustomerId>,
    /// Current lifecycle status.
    pub status: DidStatus,
    /// One-time setup price. Non-negative.
    pub setup_price: Decimal,
    /// Recurring monthly price. Non-negative.
    pub monthly_price: Decimal,
    /// Billing cursor: next date the monthly fee is due.
    pub next_renewal_at: Option<NaiveDate>,
    /// When the DID was assigned to its current owner.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Customer holding the reservation, while `Reserved`.
    pub reserved_for_customer: Option<CustomerId>,
    /// Reservation deadline, while `Reserved`.
    pub reserved_until: Option<DateTime<Utc>>,
    /// True for customer-verified (zero-cost) numbers.
    pub is_byon: bool,
    /// Verification record backing a BYON number.
    pub verification_id: Option<VerificationId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Did {
    /// Creates a fresh marketplace DID in `Available` status.
    #[must_use]
    pub fn new_available(
        tenant_id: TenantId,
        e164: PhoneNumber,
        setup_price: Decimal,
        monthly_price: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let national_number = e164.national_number().to_string();
        let country = e164.country().map(|m| m.iso.to_string());
        Self {
            id: DidId::new(),
            tenant_id,
            e164,
            national_number,
            country,
            customer_id: None,
            status: DidStatus::Available,
            setup_price,
            monthly_price,
            next_renewal_at: None,
            assigned_at: None,
            reserved_for_customer: None,
            reserved_until: None,
            is_byon: false,
            verification_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a customer-verified BYON DID directly in `Assigned` status at
    /// zero cost.
    #[must_use]
    pub fn new_byon(
        tenant_id: TenantId,
        e164: PhoneNumber,
        customer_id: CustomerId,
        verification_id: VerificationId,
        next_renewal_at: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let national_number = e164.national_number().to_string();
        let country = e164.country().map(|m| m.iso.to_string());
        Self {
            id: DidId::new(),
            tenant_id,
            e164,
            national_number,
            country,
            customer_id: Some(customer_id),
            status: DidStatus::Assigned,
            setup_price: Decimal::ZERO,
            monthly_price: Decimal::ZERO,
            next_renewal_at: Some(next_renewal_at),
            assigned_at: Some(now),
            reserved_for_customer: None,
            reserved_until: None,
            is_byon: true,
            verification_id: Some(verification_id),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the record satisfies the lifecycle invariants:
    /// the owner is set iff the DID is assigned, a reservation carries a
    /// holder and deadline, and an assignment carries a renewal cursor.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        match self.status {
            DidStatus::Assigned => self.customer_id.is_some() && self.next_renewal_at.is_some(),
            DidStatus::Reserved => {
                self.customer_id.is_none()
                    && self.reserved_for_customer.is_some()
                    && self.reserved_until.is_some()
            }
            DidStatus::Available => {
                self.customer_id.is_none()
                    && self.reserved_for_customer.is_none()
                    && self.reserved_until.is_none()
            }
            DidStatus::Suspended | DidStatus::Disabled => true,
        }
    }
}

/// A validated state transition with the field mutations it implies.
///
/// Produced by [`super::InventoryService`]; applied to the freshly re-read
/// record immediately before the conditional store update.
#[derive(Debug, Clone)]
pub enum InventoryAction {
    /// Available → Reserved.
    Reserve {
        /// The new status (`Reserved`).
        new_status: DidStatus,
        /// Customer the reservation is held for.
        reserved_for: CustomerId,
        /// Reservation deadline.
        reserved_until: DateTime<Utc>,
    },
    /// Available → Assigned, or Reserved → Assigned.
    Assign {
        /// The new status (`Assigned`).
        new_status: DidStatus,
        /// The new owner.
        customer_id: CustomerId,
        /// Assignment timestamp.
        assigned_at: DateTime<Utc>,
        /// First renewal due date.
        next_renewal_at: NaiveDate,
    },
    /// Reserved → Available.
    ReleaseReservation {
        /// The new status (`Available`).
        new_status: DidStatus,
    },
    /// Assigned → Available.
    Release {
        /// The new status (`Available`).
        new_status: DidStatus,
        /// Why the DID is being released.
        kind: ReleaseKind,
    },
}

impl InventoryAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> DidStatus {
        match self {
            Self::Reserve { new_status, .. }
            | Self::Assign { new_status, .. }
            | Self::ReleaseReservation { new_status }
            | Self::Release { new_status, .. } => *new_status,
        }
    }

    /// Applies the field mutations of this action to a record.
    pub fn apply_to(&self, did: &mut Did, now: DateTime<Utc>) {
        match self {
            Self::Reserve {
                new_status,
                reserved_for,
                reserved_until,
            } => {
                did.status = *new_status;
                did.reserved_for_customer = Some(*reserved_for);
                did.reserved_until = Some(*reserved_until);
            }
            Self::Assign {
                new_status,
                customer_id,
                assigned_at,
                next_renewal_at,
            } => {
                did.status = *new_status;
                did.customer_id = Some(*customer_id);
                did.assigned_at = Some(*assigned_at);
                did.next_renewal_at = Some(*next_renewal_at);
                did.reserved_for_customer = None;
                did.reserved_until = None;
            }
            Self::ReleaseReservation { new_status } | Self::Release { new_status, .. } => {
                did.status = *new_status;
                did.customer_id = None;
                did.assigned_at = None;
                did.next_renewal_at = None;
                did.reserved_for_customer = None;
                did.reserved_until = None;
            }
        }
        did.updated_at = now;
    }
}

//! Inventory service for DID state transitions.
//!
//! Stateless transition validation: each method takes the freshly re-read
//! record and returns the `InventoryAction` to apply, or an error. Callers
//! must re-fetch the DID immediately before validating; the record they held
//! at the start of a request may be stale by commit time.

use chrono::{DateTime, NaiveDate, Utc};

use numera_shared::types::CustomerId;

use crate::inventory::error::InventoryError;
use crate::inventory::types::{Did, DidStatus, InventoryAction, ReleaseKind};

/// Stateless service validating DID lifecycle transitions.
pub struct InventoryService;

impl InventoryService {
    /// Reserve an available DID for a customer pending order approval.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the DID is not `Available`.
    pub fn reserve(
        did: &Did,
        customer: CustomerId,
        reserved_until: DateTime<Utc>,
    ) -> Result<InventoryAction, InventoryError> {
        match did.status {
            DidStatus::Available => Ok(InventoryAction::Reserve {
                new_status: DidStatus::Reserved,
                reserved_for: customer,
                reserved_until,
            }),
            from => Err(InventoryError::InvalidStateTransition {
                from,
                to: DidStatus::Reserved,
            }),
        }
    }

    /// Assign an available DID to a customer (immediate purchase).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the DID is not `Available`.
    pub fn assign(
        did: &Did,
        customer: CustomerId,
        next_renewal_at: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<InventoryAction, InventoryError> {
        match did.status {
            DidStatus::Available => Ok(InventoryAction::Assign {
                new_status: DidStatus::Assigned,
                customer_id: customer,
                assigned_at: now,
                next_renewal_at,
            }),
            from => Err(InventoryError::InvalidStateTransition {
                from,
                to: DidStatus::Assigned,
            }),
        }
    }

    /// Assign a reserved DID to the customer holding the reservation
    /// (order approved).
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the DID is not `Reserved`
    /// - `ReservationMismatch` if it is reserved for a different customer
    /// - `ReservationExpired` if the reservation deadline has passed
    pub fn assign_reserved(
        did: &Did,
        customer: CustomerId,
        next_renewal_at: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<InventoryAction, InventoryError> {
        if did.status != DidStatus::Reserved {
            return Err(InventoryError::InvalidStateTransition {
                from: did.status,
                to: DidStatus::Assigned,
            });
        }
        if did.reserved_for_customer != Some(customer) {
            return Err(InventoryError::ReservationMismatch(did.id));
        }
        if did.reserved_until.is_none_or(|until| until <= now) {
            return Err(InventoryError::ReservationExpired(did.id));
        }

        Ok(InventoryAction::Assign {
            new_status: DidStatus::Assigned,
            customer_id: customer,
            assigned_at: now,
            next_renewal_at,
        })
    }

    /// Return a reserved DID to stock (order rejected or expired).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the DID is not `Reserved`.
    pub fn release_reservation(did: &Did) -> Result<InventoryAction, InventoryError> {
        match did.status {
            DidStatus::Reserved => Ok(InventoryAction::ReleaseReservation {
                new_status: DidStatus::Available,
            }),
            from => Err(InventoryError::InvalidStateTransition {
                from,
                to: DidStatus::Available,
            }),
        }
    }

    /// Release an assigned DID back to stock.
    ///
    /// BYON numbers represent customer-owned numbers, not inventory; only the
    /// administrative release path applies to them.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the DID is not `Assigned`
    /// - `ByonNotReleasable` for a non-administrative release of a BYON DID
    pub fn release(did: &Did, kind: ReleaseKind) -> Result<InventoryAction, InventoryError> {
        if did.status != DidStatus::Assigned {
            return Err(InventoryError::InvalidStateTransition {
                from: did.status,
                to: DidStatus::Available,
            });
        }
        if did.is_byon && kind != ReleaseKind::Administrative {
            return Err(InventoryError::ByonNotReleasable);
        }

        Ok(InventoryAction::Release {
            new_status: DidStatus::Available,
            kind,
        })
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Available → Reserved (order placed)
    /// - Available → Assigned (immediate purchase)
    /// - Reserved → Assigned (order approved)
    /// - Reserved → Available (order rejected/expired)
    /// - Assigned → Available (release)
    #[must_use]
    pub fn is_valid_transition(from: DidStatus, to: DidStatus) -> bool {
        matches!(
            (from, to),
            (
                DidStatus::Available,
                DidStatus::Reserved | DidStatus::Assigned
            ) | (
                DidStatus::Reserved,
                DidStatus::Assigned | DidStatus::Available
            ) | (DidStatus::Assigned, DidStatus::Available)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use numera_shared::types::{PhoneNumber, TenantId};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap()
    }

    fn renewal_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    fn available_did() -> Did {
        Did::new_available(
            TenantId::new(),
            PhoneNumber::parse("+31201234567").unwrap(),
            dec!(10),
            dec!(30),
            now(),
        )
    }

    fn reserved_did(customer: CustomerId) -> Did {
        let mut did = available_did();
        let action = InventoryService::reserve(&did, customer, now() + chrono::Duration::hours(24))
            .unwrap();
        action.apply_to(&mut did, now());
        did
    }

    fn assigned_did(customer: CustomerId) -> Did {
        let mut did = available_did();
        let action = InventoryService::assign(&did, customer, renewal_date(), now()).unwrap();
        action.apply_to(&mut did, now());
        did
    }

    #[test]
    fn test_reserve_from_available() {
        let did = available_did();
        let customer = CustomerId::new();
        let action =
            InventoryService::reserve(&did, customer, now() + chrono::Duration::hours(24)).unwrap();
        assert_eq!(action.new_status(), DidStatus::Reserved);
    }

    #[test]
    fn test_reserve_from_assigned_fails() {
        let did = assigned_did(CustomerId::new());
        let result =
            InventoryService::reserve(&did, CustomerId::new(), now() + chrono::Duration::hours(24));
        assert!(matches!(
            result,
            Err(InventoryError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_assign_from_available() {
        let did = available_did();
        let customer = CustomerId::new();
        let action = InventoryService::assign(&did, customer, renewal_date(), now()).unwrap();
        assert_eq!(action.new_status(), DidStatus::Assigned);
    }

    #[test]
    fn test_assign_from_reserved_fails() {
        let customer = CustomerId::new();
        let did = reserved_did(customer);
        let result = InventoryService::assign(&did, customer, renewal_date(), now());
        assert!(matches!(
            result,
            Err(InventoryError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_assign_reserved_same_customer() {
        let customer = CustomerId::new();
        let did = reserved_did(customer);
        let action =
            InventoryService::assign_reserved(&did, customer, renewal_date(), now()).unwrap();
        assert_eq!(action.new_status(), DidStatus::Assigned);
    }

    #[test]
    fn test_assign_reserved_other_customer_fails() {
        let did = reserved_did(CustomerId::new());
        let result =
            InventoryService::assign_reserved(&did, CustomerId::new(), renewal_date(), now());
        assert!(matches!(result, Err(InventoryError::ReservationMismatch(_))));
    }

    #[test]
    fn test_assign_reserved_after_deadline_fails() {
        let customer = CustomerId::new();
        let did = reserved_did(customer);
        let late = now() + chrono::Duration::hours(25);
        let result = InventoryService::assign_reserved(&did, customer, renewal_date(), late);
        assert!(matches!(result, Err(InventoryError::ReservationExpired(_))));
    }

    #[test]
    fn test_release_reservation_from_reserved() {
        let did = reserved_did(CustomerId::new());
        let action = InventoryService::release_reservation(&did).unwrap();
        assert_eq!(action.new_status(), DidStatus::Available);
    }

    #[test]
    fn test_release_reservation_from_available_fails() {
        let did = available_did();
        let result = InventoryService::release_reservation(&did);
        assert!(matches!(
            result,
            Err(InventoryError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_release_assigned() {
        let did = assigned_did(CustomerId::new());
        let action = InventoryService::release(&did, ReleaseKind::Voluntary).unwrap();
        assert_eq!(action.new_status(), DidStatus::Available);
    }

    #[test]
    fn test_release_byon_voluntary_fails() {
        let mut did = assigned_did(CustomerId::new());
        did.is_byon = true;
        let result = InventoryService::release(&did, ReleaseKind::Voluntary);
        assert!(matches!(result, Err(InventoryError::ByonNotReleasable)));

        let result = InventoryService::release(&did, ReleaseKind::NonPayment);
        assert!(matches!(result, Err(InventoryError::ByonNotReleasable)));
    }

    #[test]
    fn test_release_byon_administrative_succeeds() {
        let mut did = assigned_did(CustomerId::new());
        did.is_byon = true;
        let action = InventoryService::release(&did, ReleaseKind::Administrative).unwrap();
        assert_eq!(action.new_status(), DidStatus::Available);
    }

    #[test]
    fn test_release_from_available_fails() {
        let did = available_did();
        let result = InventoryService::release(&did, ReleaseKind::Voluntary);
        assert!(matches!(
            result,
            Err(InventoryError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_is_valid_transition() {
        // Valid transitions
        assert!(InventoryService::is_valid_transition(
            DidStatus::Available,
            DidStatus::Reserved
        ));
        assert!(InventoryService::is_valid_transition(
            DidStatus::Available,
            DidStatus::Assigned
        ));
        assert!(InventoryService::is_valid_transition(
            DidStatus::Reserved,
            DidStatus::Assigned
        ));
        assert!(InventoryService::is_valid_transition(
            DidStatus::Reserved,
            DidStatus::Available
        ));
        assert!(InventoryService::is_valid_transition(
            DidStatus::Assigned,
            DidStatus::Available
        ));

        // Invalid transitions
        assert!(!InventoryService::is_valid_transition(
            DidStatus::Assigned,
            DidStatus::Reserved
        ));
        assert!(!InventoryService::is_valid_transition(
            DidStatus::Disabled,
            DidStatus::Available
        ));
        assert!(!InventoryService::is_valid_transition(
            DidStatus::Suspended,
            DidStatus::Assigned
        ));
    }
}

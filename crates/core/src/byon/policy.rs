//! BYON verification policy: eligibility, limits, expiry, and attempts.

use chrono::{DateTime, Duration, Utc};

use numera_shared::types::CustomerId;

use crate::byon::error::ByonError;
use crate::byon::types::ByonVerification;
use crate::inventory::Did;

/// Maximum wrong-code attempts before a verification is failed.
pub const MAX_ATTEMPTS: u32 = 3;

/// Minutes a verification code stays valid.
pub const EXPIRY_MINUTES: i64 = 10;

/// Stateless BYON policy checks.
pub struct ByonPolicy;

impl ByonPolicy {
    /// Checks whether a number may start verification for a customer.
    ///
    /// A number already verified as BYON by a different customer is
    /// permanently blocked across tenants; a number present as marketplace
    /// inventory (including the customer's own) can never be re-registered.
    ///
    /// # Errors
    ///
    /// - `NumberAlreadyByon` if another customer verified the number
    /// - `NumberInInventory` if the number exists as inventory
    pub fn check_number_eligible(
        existing: Option<&Did>,
        customer: CustomerId,
    ) -> Result<(), ByonError> {
        match existing {
            None => Ok(()),
            Some(did) if did.is_byon && did.customer_id != Some(customer) => {
                Err(ByonError::NumberAlreadyByon)
            }
            Some(_) => Err(ByonError::NumberInInventory),
        }
    }

    /// Checks the per-customer daily OTP send allowance (UTC calendar day).
    ///
    /// # Errors
    ///
    /// Returns `DailySendLimitReached` once `sent_today` hits the limit.
    pub fn check_send_allowance(sent_today: u32, daily_limit: u32) -> Result<(), ByonError> {
        if sent_today >= daily_limit {
            return Err(ByonError::DailySendLimitReached { limit: daily_limit });
        }
        Ok(())
    }

    /// Checks the per-customer BYON number allowance.
    ///
    /// # Errors
    ///
    /// Returns `NumberLimitReached` once `byon_count` hits the limit.
    pub fn check_number_allowance(byon_count: u32, limit: u32) -> Result<(), ByonError> {
        if byon_count >= limit {
            return Err(ByonError::NumberLimitReached { limit });
        }
        Ok(())
    }

    /// Checks whether a pending verification may consume another attempt.
    ///
    /// Expiry is evaluated before the attempt counter, and the counter before
    /// any provider call: a correct code on the 4th attempt still fails.
    ///
    /// # Errors
    ///
    /// - `Expired` past the verification deadline
    /// - `MaxAttemptsReached` once the counter hits [`MAX_ATTEMPTS`]
    pub fn check_attempt_allowed(
        verification: &ByonVerification,
        now: DateTime<Utc>,
    ) -> Result<(), ByonError> {
        if now > verification.expires_at {
            return Err(ByonError::Expired);
        }
        if verification.attempts >= MAX_ATTEMPTS {
            return Err(ByonError::MaxAttemptsReached);
        }
        Ok(())
    }

    /// Returns the verification deadline for a code sent at `now`.
    #[must_use]
    pub fn expiry(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(EXPIRY_MINUTES)
    }

    /// Attempts remaining after `attempts` have been consumed.
    #[must_use]
    pub fn attempts_remaining(attempts: u32) -> u32 {
        MAX_ATTEMPTS.saturating_sub(attempts)
    }
}

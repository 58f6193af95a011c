//! BYON verification orchestration.
//!
//! `initiate` gates a number through eligibility and rate-limit policy, then
//! opens a provider verification session; `verify` consumes attempts against
//! the newest pending record and, on a provider-confirmed match, creates the
//! DID directly in assigned state at zero cost.

use std::sync::Arc;

use tracing::{info, warn};

use numera_core::billing::ProrationCalculator;
use numera_core::byon::{ByonError, ByonPolicy, ByonVerification, VerificationStatus};
use numera_core::inventory::Did;
use numera_shared::config::ByonConfig;
use numera_shared::types::{CustomerId, PhoneNumber, TenantId};
use numera_shared::Clock;

use crate::clients::OtpProvider;
use crate::repositories::{DidRepository, StoreError, VerificationRepository};

/// BYON verification service.
pub struct ByonService {
    dids: Arc<dyn DidRepository>,
    verifications: Arc<dyn VerificationRepository>,
    otp: Arc<dyn OtpProvider>,
    clock: Arc<dyn Clock>,
    config: ByonConfig,
}

impl ByonService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        dids: Arc<dyn DidRepository>,
        verifications: Arc<dyn VerificationRepository>,
        otp: Arc<dyn OtpProvider>,
        clock: Arc<dyn Clock>,
        config: ByonConfig,
    ) -> Self {
        Self {
            dids,
            verifications,
            otp,
            clock,
            config,
        }
    }

    /// Starts verification of a customer-supplied number.
    ///
    /// # Errors
    ///
    /// - `InvalidPhoneNumber` for a malformed number
    /// - `NumberAlreadyByon` / `NumberInInventory` for ineligible numbers
    /// - `DailySendLimitReached` / `NumberLimitReached` for exhausted quotas
    /// - `ProviderUnavailable` when the OTP provider fails (the record is
    ///   marked `failed`)
    pub async fn initiate(
        &self,
        tenant: TenantId,
        customer: CustomerId,
        phone: &str,
    ) -> Result<ByonVerification, ByonError> {
        let phone = PhoneNumber::parse(phone)?;
        let now = self.clock.now();

        let existing = self
            .dids
            .find_by_e164(phone.as_e164())
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;
        ByonPolicy::check_number_eligible(existing.as_ref(), customer)?;

        let sent_today = self
            .verifications
            .count_created_on(customer, now.date_naive())
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;
        ByonPolicy::check_send_allowance(sent_today, self.config.daily_send_limit)?;

        let byon_count = self
            .dids
            .count_byon_for_customer(customer)
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;
        ByonPolicy::check_number_allowance(byon_count, self.config.number_limit)?;

        let verification = ByonVerification::new_pending(
            tenant,
            customer,
            phone.clone(),
            ByonPolicy::expiry(now),
            now,
        );
        let mut verification = self
            .verifications
            .insert(verification)
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;

        match self.otp.send_verification(phone.as_e164()).await {
            Ok(session_id) => {
                verification.session_id = Some(session_id);
                let verification = self
                    .verifications
                    .update(verification)
                    .await
                    .map_err(|e| ByonError::Storage(e.to_string()))?;
                info!(
                    customer = %customer,
                    verification = %verification.id,
                    "BYON verification initiated"
                );
                Ok(verification)
            }
            Err(_) => {
                verification.status = VerificationStatus::Failed;
                if let Err(e) = self.verifications.update(verification).await {
                    warn!(customer = %customer, error = %e, "failed to mark verification failed");
                }
                Err(ByonError::ProviderUnavailable)
            }
        }
    }

    /// Checks a code against the newest pending verification.
    ///
    /// Expiry and the attempt ceiling are evaluated before the provider is
    /// called, so a correct code past the 3rd attempt still fails with
    /// `MaxAttemptsReached` and the record flips to `failed`.
    ///
    /// # Errors
    ///
    /// - `VerificationNotFound` when no pending record matches
    /// - `Expired` / `MaxAttemptsReached` / `InvalidCode` per policy
    /// - `ProviderUnavailable` when the provider check fails
    pub async fn verify(
        &self,
        customer: CustomerId,
        phone: &str,
        code: &str,
    ) -> Result<Did, ByonError> {
        let phone = PhoneNumber::parse(phone)?;
        let now = self.clock.now();

        let verification = self
            .verifications
            .find_newest_pending(customer, phone.as_e164())
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?
            .ok_or(ByonError::VerificationNotFound)?;

        if let Err(policy_error) = ByonPolicy::check_attempt_allowed(&verification, now) {
            let mut settled = verification;
            settled.status = match policy_error {
                ByonError::Expired => VerificationStatus::Expired,
                _ => VerificationStatus::Failed,
            };
            if let Err(e) = self.verifications.update(settled).await {
                warn!(customer = %customer, error = %e, "failed to settle verification status");
            }
            return Err(policy_error);
        }

        // Consume the attempt before asking the provider.
        let mut verification = verification;
        verification.attempts += 1;
        let verification = self
            .verifications
            .update(verification)
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;

        let approved = self
            .otp
            .check_verification(phone.as_e164(), code)
            .await
            .map_err(|_| ByonError::ProviderUnavailable)?;

        if !approved {
            let remaining = ByonPolicy::attempts_remaining(verification.attempts);
            info!(
                customer = %customer,
                verification = %verification.id,
                remaining,
                "BYON code mismatch"
            );
            return Err(ByonError::InvalidCode {
                attempts_remaining: remaining,
            });
        }

        let mut approved_record = verification;
        approved_record.status = VerificationStatus::Approved;
        approved_record.verified_at = Some(now);
        let approved_record = self
            .verifications
            .update(approved_record)
            .await
            .map_err(|e| ByonError::Storage(e.to_string()))?;

        let did = Did::new_byon(
            approved_record.tenant_id,
            phone,
            customer,
            approved_record.id,
            ProrationCalculator::first_of_next_month(now.date_naive()),
            now,
        );
        let did = self.dids.insert(did).await.map_err(|e| match e {
            StoreError::Backend(msg) => ByonError::Storage(msg),
            other => ByonError::Storage(other.to_string()),
        })?;

        info!(
            customer = %customer,
            did = %did.id,
            country = did.country.as_deref().unwrap_or("unknown"),
            "BYON number verified and assigned"
        );
        Ok(did)
    }
}

//! BYON verification domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use numera_shared::types::{CustomerId, PhoneNumber, TenantId, VerificationId};

/// Status of a BYON verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Code sent, awaiting verification.
    Pending,
    /// Ownership proven; a DID was created.
    Approved,
    /// The 10-minute window lapsed.
    Expired,
    /// Attempts exhausted or the provider send failed.
    Failed,
}

impl VerificationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A BYON verification record. Never deleted (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByonVerification {
    /// Unique identifier.
    pub id: VerificationId,
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Customer proving ownership.
    pub customer_id: CustomerId,
    /// The number being verified.
    pub phone: PhoneNumber,
    /// Session id assigned by the OTP provider.
    pub session_id: Option<String>,
    /// Current status.
    pub status: VerificationStatus,
    /// Number of check attempts consumed.
    pub attempts: u32,
    /// When the verification was initiated.
    pub created_at: DateTime<Utc>,
    /// When ownership was proven.
    pub verified_at: Option<DateTime<Utc>>,
    /// Hard deadline for entering the code.
    pub expires_at: DateTime<Utc>,
}

impl ByonVerification {
    /// Creates a new pending verification.
    #[must_use]
    pub fn new_pending(
        tenant_id: TenantId,
        customer_id: CustomerId,
        phone: PhoneNumber,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VerificationId::new(),
            tenant_id,
            customer_id,
            phone,
            session_id: None,
            status: VerificationStatus::Pending,
            attempts: 0,
            created_at: now,
            verified_at: None,
            expires_at,
        }
    }

    /// Returns true if the record is still awaiting a code.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }
}

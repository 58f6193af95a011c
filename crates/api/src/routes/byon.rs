//! BYON verification routes.

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use numera_core::byon::{ByonVerification, VerificationStatus};
use numera_shared::types::{CustomerId, TenantId, VerificationId};

use crate::routes::dids::DidResponse;
use crate::{error::ApiError, AppState};

/// Creates the BYON routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/byon/verifications", post(initiate_verification))
        .route("/byon/verifications/check", post(check_verification))
}

/// Request body for initiating verification.
#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Customer proving ownership.
    pub customer_id: CustomerId,
    /// The number to verify, in E.164 form.
    pub phone: String,
}

/// Request body for checking a code.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Customer proving ownership.
    pub customer_id: CustomerId,
    /// The number being verified.
    pub phone: String,
    /// The one-time passcode.
    pub code: String,
}

/// Response for a verification record.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    /// Verification identifier.
    pub id: VerificationId,
    /// Current status.
    pub status: VerificationStatus,
    /// The number being verified.
    pub phone: String,
    /// Attempts consumed so far.
    pub attempts: u32,
    /// Verification deadline.
    pub expires_at: DateTime<Utc>,
}

impl From<ByonVerification> for VerificationResponse {
    fn from(v: ByonVerification) -> Self {
        Self {
            id: v.id,
            status: v.status,
            phone: v.phone.as_e164().to_string(),
            attempts: v.attempts,
            expires_at: v.expires_at,
        }
    }
}

/// Starts verification of a customer-supplied number.
async fn initiate_verification(
    State(state): State<AppState>,
    Json(request): Json<InitiateRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let verification = state
        .byon
        .initiate(request.tenant_id, request.customer_id, &request.phone)
        .await?;
    Ok(Json(verification.into()))
}

/// Checks a code; on success the number becomes an assigned BYON DID.
async fn check_verification(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<DidResponse>, ApiError> {
    let did = state
        .byon
        .verify(request.customer_id, &request.phone, &request.code)
        .await?;
    Ok(Json(did.into()))
}

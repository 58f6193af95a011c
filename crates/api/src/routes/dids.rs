//! DID purchase and release routes.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use numera_core::inventory::{Did, DidStatus, ReleaseKind};
use numera_shared::types::{CustomerId, DidId, InvoiceId, TenantId};

use crate::{error::ApiError, AppState};

/// Creates the DID routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dids/{did_id}/purchase", post(purchase_did))
        .route("/dids/{did_id}/release", post(release_did))
}

/// Request body for purchasing a DID.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Purchasing customer.
    pub customer_id: CustomerId,
}

/// Request body for releasing a DID.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    /// Why the DID is being released.
    pub kind: ReleaseKind,
}

/// Response for a DID.
#[derive(Debug, Serialize)]
pub struct DidResponse {
    /// DID identifier.
    pub id: DidId,
    /// E.164 number.
    pub e164: String,
    /// Lifecycle status.
    pub status: DidStatus,
    /// Owning customer, if assigned.
    pub customer_id: Option<CustomerId>,
    /// Next renewal due date.
    pub next_renewal_at: Option<NaiveDate>,
    /// Monthly price.
    pub monthly_price: Decimal,
    /// Setup price.
    pub setup_price: Decimal,
    /// Whether this is a customer-verified number.
    pub is_byon: bool,
}

impl From<Did> for DidResponse {
    fn from(did: Did) -> Self {
        Self {
            id: did.id,
            e164: did.e164.as_e164().to_string(),
            status: did.status,
            customer_id: did.customer_id,
            next_renewal_at: did.next_renewal_at,
            monthly_price: did.monthly_price,
            setup_price: did.setup_price,
            is_byon: did.is_byon,
        }
    }
}

/// Response for a completed purchase.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// The assigned DID.
    pub did: DidResponse,
    /// The settlement invoice, when created.
    pub invoice_id: Option<InvoiceId>,
    /// Amount debited from balance.
    pub charged: Decimal,
    /// Balance after the debit.
    pub balance_after: Decimal,
}

/// Purchases an available DID, settling from the customer's balance.
async fn purchase_did(
    State(state): State<AppState>,
    Path(did_id): Path<DidId>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let outcome = state
        .billing
        .purchase_did(request.tenant_id, request.customer_id, did_id)
        .await?;

    Ok(Json(PurchaseResponse {
        did: outcome.did.into(),
        invoice_id: outcome.invoice_id,
        charged: outcome.charged,
        balance_after: outcome.balance_after,
    }))
}

/// Releases an assigned DID back to stock.
async fn release_did(
    State(state): State<AppState>,
    Path(did_id): Path<DidId>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<DidResponse>, ApiError> {
    let did = state.inventory.release(did_id, request.kind).await?;
    Ok(Json(did.into()))
}

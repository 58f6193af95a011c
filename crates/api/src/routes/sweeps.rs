//! Sweep trigger routes.
//!
//! The daily renewal sweep and the order-expiry sweep are driven by an
//! external scheduler; these endpoints expose their unit of work.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use numera_shared::types::{DidId, InvoiceId};

use crate::{error::ApiError, AppState};

/// Creates the sweep routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sweeps/renewals", post(run_renewal_sweep))
        .route("/sweeps/order-expiry", post(run_order_expiry_sweep))
}

/// Response for a renewal sweep run.
#[derive(Debug, Serialize)]
pub struct RenewalSweepResponse {
    /// DIDs renewed from balance.
    pub renewed: Vec<DidId>,
    /// Pending invoices created for gateway collection.
    pub invoiced: Vec<InvoiceId>,
    /// Customer groups skipped due to dependent-system failures.
    pub failures: u32,
}

/// Response for an order-expiry sweep run.
#[derive(Debug, Serialize)]
pub struct ExpirySweepResponse {
    /// Orders expired.
    pub expired: u32,
}

/// Runs the renewal sweep for every DID whose cursor is due.
async fn run_renewal_sweep(
    State(state): State<AppState>,
) -> Result<Json<RenewalSweepResponse>, ApiError> {
    let outcome = state.billing.run_renewal_sweep().await?;
    Ok(Json(RenewalSweepResponse {
        renewed: outcome.renewed,
        invoiced: outcome.invoiced,
        failures: outcome.failures,
    }))
}

/// Expires pending orders whose reservation lapsed.
async fn run_order_expiry_sweep(
    State(state): State<AppState>,
) -> Result<Json<ExpirySweepResponse>, ApiError> {
    let expired = state.orders.run_expiry_sweep().await?;
    Ok(Json(ExpirySweepResponse { expired }))
}

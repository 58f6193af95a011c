//! Deferred-billing order routes.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use numera_core::orders::{DidOrder, OrderStatus};
use numera_shared::types::{CustomerId, DidId, DidOrderId, InvoiceId, TenantId};

use crate::routes::dids::DidResponse;
use crate::{error::ApiError, AppState};

/// Creates the order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{order_id}/approve", post(approve_order))
        .route("/orders/{order_id}/reject", post(reject_order))
}

/// Request body for placing an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Tenant the customer belongs to.
    pub tenant_id: TenantId,
    /// Ordering customer.
    pub customer_id: CustomerId,
    /// The DID to reserve.
    pub did_id: DidId,
}

/// Request body for rejecting an order.
#[derive(Debug, Deserialize)]
pub struct RejectOrderRequest {
    /// Why the order is rejected.
    pub reason: String,
}

/// Response for an order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order identifier.
    pub id: DidOrderId,
    /// Ordering customer.
    pub customer_id: CustomerId,
    /// The reserved DID.
    pub did_id: DidId,
    /// Current status.
    pub status: OrderStatus,
    /// Locked-in setup fee.
    pub setup_fee: Decimal,
    /// Locked-in monthly fee.
    pub monthly_fee: Decimal,
    /// When the order was placed.
    pub requested_at: DateTime<Utc>,
    /// Rejection reason, if rejected.
    pub rejection_reason: Option<String>,
}

impl From<DidOrder> for OrderResponse {
    fn from(order: DidOrder) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            did_id: order.did_id,
            status: order.status,
            setup_fee: order.setup_fee,
            monthly_fee: order.monthly_fee,
            requested_at: order.requested_at,
            rejection_reason: order.rejection_reason,
        }
    }
}

/// Response for an approved order.
#[derive(Debug, Serialize)]
pub struct ApproveOrderResponse {
    /// The approved order.
    pub order: OrderResponse,
    /// The assigned DID.
    pub did: DidResponse,
    /// The invoice pending gateway collection, when created.
    pub invoice_id: Option<InvoiceId>,
}

/// Places an order, reserving the DID for 24 hours.
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .create_order(request.tenant_id, request.customer_id, request.did_id)
        .await?;
    Ok(Json(order.into()))
}

/// Approves a pending order.
async fn approve_order(
    State(state): State<AppState>,
    Path(order_id): Path<DidOrderId>,
) -> Result<Json<ApproveOrderResponse>, ApiError> {
    let (order, did, invoice_id) = state.orders.approve(order_id).await?;
    Ok(Json(ApproveOrderResponse {
        order: order.into(),
        did: did.into(),
        invoice_id,
    }))
}

/// Rejects a pending order, releasing the reservation.
async fn reject_order(
    State(state): State<AppState>,
    Path(order_id): Path<DidOrderId>,
    Json(request): Json<RejectOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.reject(order_id, request.reason).await?;
    Ok(Json(order.into()))
}

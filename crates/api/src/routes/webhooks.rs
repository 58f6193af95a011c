//! Billing gateway webhook routes.
//!
//! The raw body is passed through untouched: the signature covers the exact
//! bytes the gateway sent, so any re-serialization would break verification.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};

use numera_core::webhook::{WebhookAck, WebhookError, SIGNATURE_HEADER, TIMESTAMP_HEADER};

use crate::{error::ApiError, AppState};

/// Creates the webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/billing/payment", post(payment_confirmation))
        .route("/webhooks/billing/overdue", post(overdue_notice))
}

/// Pulls the signature and timestamp headers, rejecting absent ones before
/// any body processing.
fn auth_headers(headers: &HeaderMap) -> Result<(String, String), WebhookError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(TIMESTAMP_HEADER))?
        .to_string();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(SIGNATURE_HEADER))?
        .to_string();
    Ok((timestamp, signature))
}

/// Handles a payment confirmation event from the billing gateway.
async fn payment_confirmation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ApiError> {
    let (timestamp, signature) = auth_headers(&headers).map_err(ApiError::from)?;
    let ack = state
        .webhooks
        .handle_payment(&timestamp, &signature, &body)
        .await?;
    Ok(Json(ack))
}

/// Handles an overdue notice event from the billing gateway.
async fn overdue_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ApiError> {
    let (timestamp, signature) = auth_headers(&headers).map_err(ApiError::from)?;
    let ack = state
        .webhooks
        .handle_overdue(&timestamp, &signature, &body)
        .await?;
    Ok(Json(ack))
}

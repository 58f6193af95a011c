//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for purchase, release, orders, BYON, and sweeps
//! - The billing gateway webhook endpoints
//! - Domain-error to HTTP-response mapping
//!
//! Authentication of customer and admin requests is delegated to the
//! upstream API gateway; webhook requests authenticate themselves with the
//! HMAC signature scheme.

pub mod error;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use numera_service::services::{
    BillingService, ByonService, InventoryManager, OrderService, WebhookService,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Balance-first purchase and renewal orchestration.
    pub billing: Arc<BillingService>,
    /// Deferred-billing order workflow.
    pub orders: Arc<OrderService>,
    /// Billing gateway webhook handling.
    pub webhooks: Arc<WebhookService>,
    /// BYON verification flow.
    pub byon: Arc<ByonService>,
    /// DID release paths.
    pub inventory: Arc<InventoryManager>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

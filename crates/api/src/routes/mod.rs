//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod byon;
pub mod dids;
pub mod health;
pub mod orders;
pub mod sweeps;
pub mod webhooks;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(dids::routes())
        .merge(orders::routes())
        .merge(byon::routes())
        .merge(sweeps::routes())
        .merge(webhooks::routes())
}

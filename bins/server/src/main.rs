//! Numera API Server
//!
//! Main entry point for the Numera DID lifecycle and billing service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use numera_api::{create_router, AppState};
use numera_service::clients::{HttpBalanceLedger, HttpOtpProvider};
use numera_service::services::{
    BillingService, ByonService, InventoryManager, OrderService, WebhookService,
};
use numera_service::MemoryStore;
use numera_shared::{AppConfig, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "numera=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // State store. Persistence is an external collaborator behind the
    // repository traits; this process keeps its working set in memory.
    let store = Arc::new(MemoryStore::new());
    info!(dids = store.did_count(), "state store initialized");

    let clock = Arc::new(SystemClock);

    // External clients
    let http = reqwest::Client::new();
    let ledger = Arc::new(HttpBalanceLedger::new(
        http.clone(),
        config.ledger.base_url.clone(),
        config.ledger.api_key.clone(),
    ));
    let otp = Arc::new(HttpOtpProvider::new(
        http,
        config.otp.base_url.clone(),
        config.otp.api_key.clone(),
    ));
    info!(
        ledger = %config.ledger.base_url,
        otp = %config.otp.base_url,
        "external clients configured"
    );

    // Create application state
    let state = AppState {
        billing: Arc::new(BillingService::new(
            store.clone(),
            store.clone(),
            ledger.clone(),
            clock.clone(),
        )),
        orders: Arc::new(OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            clock.clone(),
        )),
        webhooks: Arc::new(WebhookService::new(
            store.clone(),
            store.clone(),
            ledger,
            clock.clone(),
            config.webhook.secret.clone(),
            config.webhook.tolerance_secs,
        )),
        byon: Arc::new(ByonService::new(
            store.clone(),
            store.clone(),
            otp,
            clock.clone(),
            config.byon.clone(),
        )),
        inventory: Arc::new(InventoryManager::new(store, clock)),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

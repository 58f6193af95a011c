//! Router-level tests: HTTP status mapping and webhook wire behavior.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use numera_api::{create_router, AppState};
use numera_core::billing::{Invoice, InvoiceType};
use numera_core::inventory::Did;
use numera_core::webhook::{sign, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use numera_service::clients::{InMemoryLedger, OtpClientError, OtpProvider};
use numera_service::services::{
    BillingService, ByonService, InventoryManager, OrderService, WebhookService,
};
use numera_service::{DidRepository, InvoiceRepository, MemoryStore};
use numera_shared::config::ByonConfig;
use numera_shared::types::{CustomerId, PhoneNumber, TenantId};
use numera_shared::{Clock, FixedClock};

const SECRET: &str = "whsec_router_test";

/// Provider double accepting any 6-digit code.
struct PermissiveOtp;

#[async_trait::async_trait]
impl OtpProvider for PermissiveOtp {
    async fn send_verification(&self, _e164: &str) -> Result<String, OtpClientError> {
        Ok("session".to_string())
    }

    async fn check_verification(&self, _e164: &str, code: &str) -> Result<bool, OtpClientError> {
        Ok(code.len() == 6)
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<FixedClock>,
    router: axum::Router,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap(),
    ));

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
            ledger.clone(),
            clock.clone(),
            SECRET.to_string(),
            300,
        )),
        byon: Arc::new(ByonService::new(
            store.clone(),
            store.clone(),
            Arc::new(PermissiveOtp),
            clock.clone(),
            ByonConfig::default(),
        )),
        inventory: Arc::new(InventoryManager::new(
            store.clone(),
            clock.clone(),
        )),
    };

    Harness {
        router: create_router(state),
        store,
        ledger,
        clock,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_available_did(harness: &Harness) -> Did {
    let did = Did::new_available(
        TenantId::new(),
        PhoneNumber::parse("+31201234567").unwrap(),
        dec!(10),
        dec!(30),
        harness.clock.now(),
    );
    DidRepository::insert(harness.store.as_ref(), did)
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_answers() {
    let harness = harness();
    let response = harness
        .router
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn purchase_route_settles_and_maps_insufficient_balance_to_422() {
    let harness = harness();
    let did = seed_available_did(&harness).await;
    let customer = CustomerId::new();
    harness.ledger.set_balance(customer, dec!(21.61));

    let request_body = json!({
        "tenant_id": did.tenant_id,
        "customer_id": customer,
    });
    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/dids/{}/purchase", did.id))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["did"]["status"], "assigned");
    assert_eq!(body["charged"], "21.61");

    // A second buyer conflicts (409) and a poor buyer is a business error.
    let other = CustomerId::new();
    harness.ledger.set_balance(other, dec!(1));
    let request_body = json!({
        "tenant_id": did.tenant_id,
        "customer_id": other,
    });
    let response = harness
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/dids/{}/purchase", did.id))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn webhook_rejects_bad_signature_with_401_and_no_writes() {
    let harness = harness();
    let customer = CustomerId::new();
    let invoice = Invoice::pending_gateway(
        TenantId::new(),
        customer,
        InvoiceType::DidRenewal,
        dec!(30),
        None,
        None,
        harness.clock.now(),
    );
    let invoice = InvoiceRepository::insert(harness.store.as_ref(), invoice)
        .await
        .unwrap();

    let raw = json!({
        "external_invoice_id": "EXT-1",
        "notes": format!("Provider:{}", invoice.id),
    })
    .to_string();
    let ts = harness.clock.now().timestamp();

    let response = harness
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/webhooks/billing/payment")
                .header(TIMESTAMP_HEADER, ts.to_string())
                .header(SIGNATURE_HEADER, sign("wrong_secret", ts, &raw))
                .body(Body::from(raw))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stored = InvoiceRepository::find_by_id(harness.store.as_ref(), invoice.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.paid_via.is_none());
}

#[tokio::test]
async fn webhook_missing_headers_is_401() {
    let harness = harness();
    let response = harness
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/webhooks/billing/payment")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_payment_applies_then_acknowledges_duplicates() {
    let harness = harness();
    let customer = CustomerId::new();
    let invoice = Invoice::pending_gateway(
        TenantId::new(),
        customer,
        InvoiceType::DidRenewal,
        dec!(30),
        None,
        None,
        harness.clock.now(),
    );
    let invoice = InvoiceRepository::insert(harness.store.as_ref(), invoice)
        .await
        .unwrap();

    let raw = json!({
        "external_invoice_id": "EXT-9",
        "notes": format!("Provider:{}", invoice.id),
    })
    .to_string();
    let ts = harness.clock.now().timestamp();
    let signature = sign(SECRET, ts, &raw);

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/billing/payment")
            .header(TIMESTAMP_HEADER, ts.to_string())
            .header(SIGNATURE_HEADER, signature.clone())
            .body(Body::from(raw.clone()))
            .unwrap()
    };

    let response = harness.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["invoice_type"], "did_renewal");

    let response = harness.router.oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "already_processed");
}

#[tokio::test]
async fn byon_check_route_returns_the_created_did() {
    let harness = harness();
    let tenant = TenantId::new();
    let customer = CustomerId::new();

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/byon/verifications")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "tenant_id": tenant,
                        "customer_id": customer,
                        "phone": "+31612345678",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");

    let response = harness
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/byon/verifications/check")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "customer_id": customer,
                        "phone": "+31612345678",
                        "code": "123456",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["is_byon"], true);
    assert_eq!(body["monthly_price"], "0");
}

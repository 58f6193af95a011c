//! Deferred-billing order workflow tests.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use numera_core::billing::SyncStatus;
use numera_core::inventory::{Did, DidStatus, InventoryError};
use numera_core::orders::{OrderError, OrderStatus};
use numera_service::services::OrderService;
use numera_service::{DidRepository, InvoiceRepository, MemoryStore};
use numera_shared::types::{CustomerId, PhoneNumber, TenantId};
use numera_shared::{Clock, FixedClock};

fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap(),
    ))
}

async fn seed_available_did(store: &MemoryStore, clock: &FixedClock) -> Did {
    let did = Did::new_available(
        TenantId::new(),
        PhoneNumber::parse("+31201234567").unwrap(),
        dec!(10),
        dec!(30),
        clock.now(),
    );
    DidRepository::insert(store, did).await.unwrap()
}

fn order_service(store: &Arc<MemoryStore>, clock: &Arc<FixedClock>) -> OrderService {
    OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        clock.clone(),
    )
}

#[tokio::test]
async fn create_order_reserves_did_for_24_hours_with_fee_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let customer = CustomerId::new();

    let order = orders
        .create_order(did.tenant_id, customer, did.id)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::PendingApproval);
    assert_eq!(order.setup_fee, dec!(10));
    assert_eq!(order.monthly_fee, dec!(30));

    let reserved = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reserved.status, DidStatus::Reserved);
    assert_eq!(reserved.reserved_for_customer, Some(customer));
    assert_eq!(
        reserved.reserved_until,
        Some(clock.now() + Duration::hours(24))
    );
    assert!(reserved.invariants_hold());
}

#[tokio::test]
async fn create_order_conflicts_on_reserved_did() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await
        .unwrap();

    let result = orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn approve_assigns_did_and_bills_from_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let customer = CustomerId::new();
    let order = orders
        .create_order(did.tenant_id, customer, did.id)
        .await
        .unwrap();

    // Reprice the DID after the order: the snapshot must win.
    let mut repriced = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    repriced.setup_price = dec!(99);
    repriced.monthly_price = dec!(99);
    DidRepository::update_if_status(store.as_ref(), repriced, DidStatus::Reserved)
        .await
        .unwrap();

    let (approved, assigned, invoice_id) = orders.approve(order.id).await.unwrap();

    assert_eq!(approved.status, OrderStatus::Approved);
    assert!(approved.approved_at.is_some());
    assert_eq!(assigned.status, DidStatus::Assigned);
    assert_eq!(assigned.customer_id, Some(customer));
    assert_eq!(
        assigned.next_renewal_at,
        NaiveDate::from_ymd_opt(2026, 2, 1)
    );

    // Snapshot pricing: 10 + 30/31*12 = 21.61, not 99-based.
    let invoice = InvoiceRepository::find_by_id(store.as_ref(), invoice_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.amount, dec!(21.61));
    assert_eq!(invoice.sync_status, SyncStatus::Pending);
    assert!(invoice.paid_via.is_none());
    assert_eq!(invoice.ddi_e164.as_deref(), Some("+31201234567"));
}

#[tokio::test]
async fn approve_after_reservation_expiry_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let order = orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await
        .unwrap();

    clock.set(clock.now() + Duration::hours(25));

    let result = orders.approve(order.id).await;
    match result {
        Err(OrderError::Inventory(InventoryError::ReservationExpired(_))) => {}
        other => panic!("expected ReservationExpired, got {other:?}"),
    }

    // The order is untouched; the expiry sweep owns the transition.
    let stored = numera_service::OrderRepository::find_by_id(store.as_ref(), order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::PendingApproval);
}

#[tokio::test]
async fn reject_releases_reservation_and_is_not_repeatable() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let order = orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await
        .unwrap();

    let rejected = orders
        .reject(order.id, "pricing dispute".to_string())
        .await
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("pricing dispute"));
    assert!(rejected.rejected_at.is_some());

    let released = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(released.status, DidStatus::Available);
    assert!(released.reserved_for_customer.is_none());
    assert!(released.reserved_until.is_none());
    assert!(released.invariants_hold());

    // A second reject is rejected itself and changes nothing further.
    let result = orders.reject(order.id, "again".to_string()).await;
    match result {
        Err(OrderError::OrderNotPending { current }) => {
            assert_eq!(current, OrderStatus::Rejected);
        }
        other => panic!("expected OrderNotPending, got {other:?}"),
    }
    let still_available = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_available.status, DidStatus::Available);
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let order = orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await
        .unwrap();

    let result = orders.reject(order.id, "  ".to_string()).await;
    assert!(matches!(result, Err(OrderError::RejectionReasonRequired)));

    // Guard fired before any side effect.
    let stored = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, DidStatus::Reserved);
}

#[tokio::test]
async fn expiry_sweep_times_out_lapsed_reservations() {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let orders = order_service(&store, &clock);

    let did = seed_available_did(&store, &clock).await;
    let order = orders
        .create_order(did.tenant_id, CustomerId::new(), did.id)
        .await
        .unwrap();

    // Still held: nothing expires.
    assert_eq!(orders.run_expiry_sweep().await.unwrap(), 0);

    clock.set(clock.now() + Duration::hours(25));
    assert_eq!(orders.run_expiry_sweep().await.unwrap(), 1);

    let expired = numera_service::OrderRepository::find_by_id(store.as_ref(), order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(expired.status, OrderStatus::Expired);
    assert!(expired.expired_at.is_some());

    let released = DidRepository::find_by_id(store.as_ref(), did.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(released.status, DidStatus::Available);
    assert!(released.invariants_hold());

    // The sweep is idempotent.
    assert_eq!(orders.run_expiry_sweep().await.unwrap(), 0);
}

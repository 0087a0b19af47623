use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use atrium_api::{app, cors_layer, AppState};
use atrium_booking::AvailabilityBroadcaster;
use atrium_catalog::{Coupon, PriceTier, RoomCategory};
use atrium_core::notify::LogNotifier;
use atrium_core::payment::AutoSettleProcessor;
use atrium_store::MemoryStore;

struct World {
    app: Router,
    hotel_id: Uuid,
    category_id: Uuid,
    customer_id: Uuid,
}

/// One hotel with a tiered "Deluxe Double" category and a 10% coupon,
/// served over the in-memory store.
fn world_with_units(total_units: u32) -> World {
    let store = Arc::new(MemoryStore::new());
    let hotel_id = Uuid::new_v4();
    let operator_id = Uuid::new_v4();
    store.insert_hotel(hotel_id, operator_id);

    let category = RoomCategory::new(hotel_id, "Deluxe Double", 4, 2_000_00, total_units);
    let category_id = category.id;
    store.insert_price_tier(PriceTier::new(category_id, 1, 1_500_00));
    store.insert_price_tier(PriceTier::new(category_id, 3, 2_500_00));
    store.insert_room_category(category);

    let now = Utc::now();
    store.insert_coupon(Coupon {
        code: "SAVE10".to_string(),
        discount: 10,
        is_percentage: true,
        min_amount: None,
        max_discount: Some(600_00),
        valid_from: now - chrono::Duration::days(1),
        valid_to: now + chrono::Duration::days(30),
        usage_limit: Some(2),
        used_count: 0,
    });

    let state = AppState::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(AutoSettleProcessor),
        Arc::new(LogNotifier),
        AvailabilityBroadcaster::new(16),
        "BDT".to_string(),
    );

    World {
        app: app(state, cors_layer("*")),
        hotel_id,
        category_id,
        customer_id: Uuid::new_v4(),
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn booking_payload(world: &World, guest_count: u32) -> Value {
    json!({
        "customer_id": world.customer_id,
        "room_category_id": world.category_id,
        "check_in": "2025-09-01",
        "check_out": "2025-09-04",
        "guest_count": guest_count,
    })
}

async fn create_booking(world: &World, guest_count: u32) -> Value {
    let (status, body) = send(
        &world.app,
        "POST",
        "/v1/bookings",
        Some(booking_payload(world, guest_count)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

async fn available_units(world: &World) -> i64 {
    let uri = format!("/v1/hotels/{}/availability", world.hotel_id);
    let (status, body) = send(&world.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().unwrap()[0]["available_units"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let world = world_with_units(1);
    let (status, body) = send(&world.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_booking_holds_a_unit() {
    let world = world_with_units(5);

    let booking = create_booking(&world, 2).await;
    assert_eq!(booking["status"], "PENDING");
    // 3 nights at the 1-guest tier, the nearest at or below 2 guests
    assert_eq!(booking["total_price"], 4_500_00);
    assert_eq!(booking["currency"], "BDT");
    assert_eq!(available_units(&world).await, 4);
}

#[tokio::test]
async fn test_get_and_list_bookings() {
    let world = world_with_units(5);
    let booking = create_booking(&world, 2).await;
    let id = booking["id"].as_str().unwrap();

    let (status, body) = send(&world.app, "GET", &format!("/v1/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_str().unwrap(), id);

    let uri = format!("/v1/bookings?customer_id={}", world.customer_id);
    let (status, body) = send(&world.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &world.app,
        "GET",
        &format!("/v1/bookings/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_too_many_guests_is_a_bad_request() {
    let world = world_with_units(5);
    let (status, body) = send(
        &world.app,
        "POST",
        "/v1/bookings",
        Some(booking_payload(&world, 9)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("guest"));
}

#[tokio::test]
async fn test_sold_out_category_returns_conflict() {
    let world = world_with_units(1);
    create_booking(&world, 1).await;

    let (status, body) = send(
        &world.app,
        "POST",
        "/v1/bookings",
        Some(booking_payload(&world, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("No units available"));
}

#[tokio::test]
async fn test_payment_confirms_booking() {
    let world = world_with_units(5);
    let booking = create_booking(&world, 2).await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, payment) = send(
        &world.app,
        "POST",
        "/v1/payments",
        Some(json!({
            "booking_id": booking_id,
            "method": "BKASH",
            "instrument": { "account_number": "01811223344" },
            "coupon_code": "SAVE10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "payment failed: {payment}");
    assert_eq!(payment["status"], "COMPLETED");
    // 10% off 4500.00, under the 600.00 cap
    assert_eq!(payment["amount"], 4_050_00);
    assert!(payment["transaction_ref"].as_str().is_some());

    let (_, refreshed) = send(&world.app, "GET", &format!("/v1/bookings/{booking_id}"), None).await;
    assert_eq!(refreshed["status"], "CONFIRMED");
    // confirmation does not move the counter; the hold became the stay
    assert_eq!(available_units(&world).await, 4);
}

#[tokio::test]
async fn test_declined_payment_keeps_booking_pending() {
    let world = world_with_units(5);
    let booking = create_booking(&world, 2).await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, payment) = send(
        &world.app,
        "POST",
        "/v1/payments",
        Some(json!({
            "booking_id": booking_id,
            "method": "NAGAD",
            "instrument": { "account_number": "01911223344", "reference": "DECLINE" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "FAILED");

    let (_, refreshed) = send(&world.app, "GET", &format!("/v1/bookings/{booking_id}"), None).await;
    assert_eq!(refreshed["status"], "PENDING");
    assert_eq!(available_units(&world).await, 4);
}

#[tokio::test]
async fn test_cancel_checks_actor_and_releases_the_unit() {
    let world = world_with_units(5);
    let booking = create_booking(&world, 2).await;
    let booking_id = booking["id"].as_str().unwrap();
    let cancel_uri = format!("/v1/bookings/{booking_id}/cancel");

    let (status, _) = send(
        &world.app,
        "POST",
        &cancel_uri,
        Some(json!({ "actor_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = send(
        &world.app,
        "POST",
        &cancel_uri,
        Some(json!({ "actor_id": world.customer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(available_units(&world).await, 5);

    let (status, _) = send(
        &world.app,
        "POST",
        &cancel_uri,
        Some(json!({ "actor_id": world.customer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_coupon_validation_endpoint() {
    let world = world_with_units(5);

    let (status, preview) = send(
        &world.app,
        "POST",
        "/v1/coupons/validate",
        Some(json!({ "code": "SAVE10", "amount": 4_500_00 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["valid"], true);
    assert_eq!(preview["discount"], 450_00);
    assert_eq!(preview["final_amount"], 4_050_00);

    let (status, preview) = send(
        &world.app,
        "POST",
        "/v1/coupons/validate",
        Some(json!({ "code": "NOPE", "amount": 1_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["valid"], false);
    assert!(preview["message"].as_str().unwrap().contains("Unknown"));
}

#[tokio::test]
async fn test_unknown_hotel_availability_is_not_found() {
    let world = world_with_units(5);
    let (status, _) = send(
        &world.app,
        "GET",
        &format!("/v1/hotels/{}/availability", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_stream_carries_booking_events() {
    let world = world_with_units(5);

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/v1/availability/stream?hotel_id={}",
            world.hotel_id
        ))
        .body(Body::empty())
        .unwrap();
    let response = world.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
    let mut frames = response.into_body().into_data_stream();

    create_booking(&world, 2).await;

    let first = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("no event within timeout")
        .expect("stream ended")
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("BOOKING_CREATED"), "unexpected frame: {text}");
    assert!(text.contains("\"available_units\":4"), "unexpected frame: {text}");
}

//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::UserId;
use event_bus::EventBus;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let state = Arc::new(api::AppState::new(
        InMemoryStore::new(),
        EventBus::default(),
        "memory",
    ));
    api::create_app(state, get_metrics_handle())
}

#[derive(Clone, Copy)]
enum As {
    Anonymous,
    Customer(UserId),
    Admin,
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: As,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    match caller {
        As::Anonymous => {}
        As::Customer(user_id) => {
            builder = builder.header("x-user-id", user_id.to_string());
        }
        As::Admin => {
            builder = builder
                .header("x-user-id", UserId::new().to_string())
                .header("x-user-role", "admin");
        }
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn address() -> Value {
    json!({
        "full_name": "Alan Turing",
        "line1": "2 Bletchley Park",
        "city": "Milton Keynes",
        "postal_code": "MK3 6EB",
        "country": "GB"
    })
}

async fn seed_catalog(app: &axum::Router) {
    let (status, _) = send(
        app,
        "PUT",
        "/admin/products/SKU-DESK",
        As::Admin,
        Some(json!({ "name": "Desk", "price_cents": 30000, "stock": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        "PUT",
        "/admin/products/SKU-PEN",
        As::Admin,
        Some(json!({ "name": "Pen", "price_cents": 4000, "stock": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, coupon) = send(
        app,
        "PUT",
        "/admin/coupons/save10",
        As::Admin,
        Some(json!({
            "discount": { "type": "percentage", "basis_points": 1000 },
            "minimum_order_cents": 5000,
            "maximum_discount_cents": 2000,
            "starts_at": (Utc::now() - Duration::days(1)).to_rfc3339(),
            "ends_at": (Utc::now() + Duration::days(30)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coupon["code"], "SAVE10");
}

fn order_body(sku: &str, quantity: u32, coupon: Option<&str>) -> Value {
    json!({
        "items": [{ "product_id": sku, "quantity": quantity }],
        "shipping_address": address(),
        "coupon_code": coupon
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", As::Anonymous, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_identity_headers_are_required() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/orders", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-id"));

    let (status, _) = send(
        &app,
        "PUT",
        "/admin/products/SKU-X",
        As::Customer(UserId::new()),
        Some(json!({ "name": "X", "price_cents": 100, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_place_order_with_coupon() {
    let app = setup();
    seed_catalog(&app).await;
    let customer = UserId::new();

    let (status, order) = send(
        &app,
        "POST",
        "/orders",
        As::Customer(customer),
        Some(order_body("SKU-DESK", 1, Some("SAVE10"))),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["subtotal_cents"], 30000);
    assert_eq!(order["discount_cents"], 2000);
    assert_eq!(order["total_cents"], 28000);
    assert_eq!(order["coupon_code"], "SAVE10");
    assert_eq!(order["user_id"], customer.to_string());
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));

    let id = order["id"].as_str().unwrap();
    let (status, fetched) = send(
        &app,
        "GET",
        &format!("/orders/{id}"),
        As::Customer(customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["total_cents"], 28000);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/orders/{id}"),
        As::Customer(UserId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_rejections_map_to_status_codes() {
    let app = setup();
    seed_catalog(&app).await;
    let customer = As::Customer(UserId::new());

    let (status, json) = send(&app, "POST", "/orders", customer, Some(order_body("SKU-DESK", 3, None))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Insufficient stock"));

    let (status, json) = send(
        &app,
        "POST",
        "/orders",
        customer,
        Some(order_body("SKU-PEN", 1, Some("SAVE10"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("minimum order of $50.00"));

    let (status, _) = send(&app, "POST", "/orders", customer, Some(order_body("SKU-NONE", 1, None))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/orders", customer, Some(order_body("SKU-PEN", 0, None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/orders/not-a-uuid", customer, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_and_payment_updates() {
    let app = setup();
    seed_catalog(&app).await;
    let customer = UserId::new();

    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        As::Customer(customer),
        Some(order_body("SKU-PEN", 2, None)),
    )
    .await;
    let id = order["id"].as_str().unwrap().to_string();
    let status_uri = format!("/orders/{id}/status");
    let payment_uri = format!("/orders/{id}/payment-status");

    let (status, _) = send(
        &app,
        "POST",
        &status_uri,
        As::Customer(customer),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", &status_uri, As::Admin, Some(json!({ "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = send(
        &app,
        "POST",
        &status_uri,
        As::Admin,
        Some(json!({ "status": "confirmed", "note": "stock checked" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "confirmed");
    assert_eq!(updated["status_history"].as_array().unwrap().len(), 2);
    assert_eq!(updated["status_history"][1]["note"], "stock checked");

    let (status, _) = send(
        &app,
        "POST",
        &payment_uri,
        As::Customer(customer),
        Some(json!({ "status": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, paid) = send(&app, "POST", &payment_uri, As::Admin, Some(json!({ "status": "paid" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "paid");

    let (status, cancelled) = send(
        &app,
        "POST",
        &status_uri,
        As::Customer(customer),
        Some(json!({ "status": "cancelled", "note": "found a cheaper pen" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancellation_reason"], "found a cheaper pen");
}

#[tokio::test]
async fn test_customers_list_only_their_orders() {
    let app = setup();
    seed_catalog(&app).await;
    let alice = UserId::new();
    let bob = UserId::new();

    for (user, quantity) in [(alice, 1), (alice, 2), (bob, 3)] {
        let (status, _) = send(
            &app,
            "POST",
            "/orders",
            As::Customer(user),
            Some(order_body("SKU-PEN", quantity, None)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, orders) = send(&app, "GET", "/orders", As::Customer(alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 2);

    let (_, orders) = send(&app, "GET", "/orders?limit=2", As::Admin, None).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);

    let (_, orders) = send(&app, "GET", &format!("/orders?user_id={bob}"), As::Admin, None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["user_id"], bob.to_string());
}

#[tokio::test]
async fn test_validate_coupon() {
    let app = setup();
    seed_catalog(&app).await;

    let (status, quote) = send(
        &app,
        "POST",
        "/coupons/validate",
        As::Customer(UserId::new()),
        Some(json!({
            "code": "save10",
            "items": [{ "product_id": "SKU-DESK", "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["eligibility"]["outcome"], "eligible");
    assert_eq!(quote["discount"], 2000);
    assert_eq!(quote["subtotal_after_discount"], 28000);

    let (status, quote) = send(
        &app,
        "POST",
        "/coupons/validate",
        As::Customer(UserId::new()),
        Some(json!({
            "code": "SAVE10",
            "items": [{ "product_id": "SKU-PEN", "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["eligibility"]["outcome"], "below_minimum_order");
    assert_eq!(quote["discount"], 0);
}

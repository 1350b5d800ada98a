mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storeflow_api::entities::{
    product, store,
    user::{self, ROLE_REGIONAL_MANAGER, ROLE_STORE_MANAGER},
};

use common::{decimal_field, read_json, TestApp};

/// Two stores in one region, one product, a manager and a clerk, with 100
/// cases on hand at the first store.
async fn replenishment_network(
    app: &TestApp,
) -> (
    store::Model,
    store::Model,
    product::Model,
    user::Model,
    user::Model,
) {
    let store_a = app
        .seed_store("Downtown Market", "ST-100", "North", "Urban")
        .await;
    let store_b = app
        .seed_store("Riverside Outlet", "ST-200", "North", "Suburban")
        .await;
    let product = app
        .seed_product("Sparkling Water", "Aqua Co", "Beverages", dec!(15.00))
        .await;
    let manager = app
        .seed_user("Rita", "Manager", ROLE_REGIONAL_MANAGER, Some("North"))
        .await;
    let clerk = app
        .seed_user("Carl", "Clerk", ROLE_STORE_MANAGER, Some("North"))
        .await;
    app.seed_inventory(store_a.id, product.id, 100, 0).await;

    (store_a, store_b, product, manager, clerk)
}

async fn create_order(app: &TestApp, body: Value, user_id: i32) -> Value {
    let response = app
        .request(Method::POST, "/api/v1/orders", Some(body), Some(user_id))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

/// Current inventory row for a store, through the list endpoint.
async fn inventory_row(app: &TestApp, store_id: i32) -> Value {
    let response = app.get("/api/v1/inventory?limit=50").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["data"]["items"]
        .as_array()
        .expect("inventory items")
        .iter()
        .find(|item| item["store_id"] == store_id)
        .cloned()
        .unwrap_or_else(|| panic!("no inventory row for store {}", store_id))
}

#[tokio::test]
async fn creating_an_order_draws_the_next_order_number() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, _manager, clerk) = replenishment_network(&app).await;

    let body = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 10,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order created successfully");
    let data = &body["data"];
    assert_eq!(data["order_number"], "ORD000001");
    assert_eq!(data["order_status"], "pending_review");
    assert_eq!(data["version"], 1);
    assert_eq!(data["region"], "North");
    assert_eq!(data["requester_name"], "Carl Clerk");
    assert_eq!(data["product_name"], "Sparkling Water");
    assert_eq!(decimal_field(&data["total_value"]), 150.0);

    let second = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "product_id": product.id,
            "quantity_cases": 3,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    assert_eq!(second["data"]["order_number"], "ORD000002");
}

#[tokio::test]
async fn full_lifecycle_moves_stock_between_stores() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 10,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let order_number = created["data"]["order_number"]
        .as_str()
        .expect("order number")
        .to_string();
    let order_id = created["data"]["id"].as_i64().expect("order id");

    // Approval reserves at the supplying store.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_number),
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = read_json(response).await;
    assert_eq!(approved["data"]["order_status"], "approved");
    assert_eq!(approved["data"]["approved_by"], manager.id);
    assert_eq!(approved["data"]["approver_name"], "Rita Manager");
    assert_eq!(approved["data"]["version"], 2);
    assert!(!approved["data"]["approved_date"].is_null());

    let source = inventory_row(&app, store_a.id).await;
    assert_eq!(source["quantity_cases"], 100);
    assert_eq!(source["reserved_cases"], 10);
    assert_eq!(source["available_cases"], 90);

    // A repeat approval finds the order already approved and reserves nothing.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(inventory_row(&app, store_a.id).await["reserved_cases"], 10);

    // Fulfilment moves the cases to the destination.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": "fulfilled" })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fulfilled = read_json(response).await;
    assert_eq!(fulfilled["data"]["order_status"], "fulfilled");
    assert_eq!(fulfilled["data"]["version"], 3);

    let approved_at = approved["data"]["approved_date"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .expect("approved date");
    let fulfilled_at = fulfilled["data"]["fulfilled_date"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .expect("fulfilled date");
    assert!(approved_at < fulfilled_at);

    let source = inventory_row(&app, store_a.id).await;
    assert_eq!(source["quantity_cases"], 90);
    assert_eq!(source["reserved_cases"], 0);
    let destination = inventory_row(&app, store_b.id).await;
    assert_eq!(destination["quantity_cases"], 10);
    assert_eq!(destination["reserved_cases"], 0);

    // The order is addressable by number and by id.
    let by_number = read_json(app.get(&format!("/api/v1/orders/{}", order_number)).await).await;
    assert_eq!(by_number["data"]["id"], order_id);
    let by_id = read_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(by_id["data"]["order_number"], order_number.as_str());
}

#[tokio::test]
async fn approval_is_reserved_for_regional_managers() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 5,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let uri = format!("/api/v1/orders/{}/status", created["data"]["id"]);
    let approve = json!({ "status": "approved", "approved_by": manager.id });

    // Anonymous callers are turned away before the order is even resolved.
    let response = app
        .request(Method::PUT, &uri, Some(approve.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Unauthorized");

    // A forwarded id that matches no user is just as anonymous.
    let response = app
        .request(Method::PUT, &uri, Some(approve.clone()), Some(4242))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Store managers cannot commit stock across stores.
    let response = app
        .request(Method::PUT, &uri, Some(approve.clone()), Some(clerk.id))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("regional_manager"));

    let response = app
        .request(Method::PUT, &uri, Some(approve), Some(manager.id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn approval_fails_without_sufficient_stock() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 150,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let order_id = created["data"]["id"].as_i64().expect("order id");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(
        body["message"],
        "Insufficient stock: requested 150 cases, 100 available"
    );

    // The failed approval left both the order and the ledger untouched.
    let order = read_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(order["data"]["order_status"], "pending_review");
    let source = inventory_row(&app, store_a.id).await;
    assert_eq!(source["reserved_cases"], 0);
}

#[tokio::test]
async fn cancelling_an_approved_order_releases_the_reservation() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 10,
            "requested_by": clerk.id,
            "notes": "Weekend rush"
        }),
        clerk.id,
    )
    .await;
    let order_id = created["data"]["id"].as_i64().expect("order id");
    let status_uri = format!("/api/v1/orders/{}/status", order_id);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(inventory_row(&app, store_a.id).await["reserved_cases"], 10);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(json!({ "reason": "Counted wrong" })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = read_json(response).await;
    assert_eq!(cancelled["data"]["order_status"], "cancelled");
    let notes = cancelled["data"]["notes"].as_str().expect("notes");
    assert!(notes.starts_with("Weekend rush"));
    assert!(notes.ends_with("Cancelled: Counted wrong"));

    let source = inventory_row(&app, store_a.id).await;
    assert_eq!(source["quantity_cases"], 100);
    assert_eq!(source["reserved_cases"], 0);

    // Terminal orders accept no further transitions.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(json!({ "reason": "Again" })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A pending order cannot skip straight to fulfilled either.
    let second = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 4,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", second["data"]["id"]),
            Some(json!({ "status": "fulfilled" })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("pending_review"));

    // Cancelling straight out of review records the reason without touching
    // the ledger.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/cancel", second["data"]["id"]),
            Some(json!({ "reason": "Left in review" })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["notes"], "Cancelled: Left in review");
    let source = inventory_row(&app, store_a.id).await;
    assert_eq!(source["quantity_cases"], 100);
    assert_eq!(source["reserved_cases"], 0);

    // Terminal orders reject field edits as well.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", second["data"]["id"]),
            Some(json!({ "quantity_cases": 9 })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("can no longer be modified"));
}

#[tokio::test]
async fn stale_versions_are_rejected() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 10,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let order_id = created["data"]["id"].as_i64().expect("order id");
    let status_uri = format!("/api/v1/orders/{}/status", order_id);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({
                "status": "approved",
                "approved_by": manager.id,
                "expected_version": 5
            })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({
                "status": "approved",
                "approved_by": manager.id,
                "expected_version": 1
            })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Field updates carry the same guard.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", order_id),
            Some(json!({ "quantity_cases": 12, "expected_version": 1 })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // With the current version the edit lands and grows the reservation.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", order_id),
            Some(json!({ "quantity_cases": 12, "expected_version": 2 })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["data"]["quantity_cases"], 12);
    assert_eq!(updated["data"]["version"], 3);
    assert_eq!(inventory_row(&app, store_a.id).await["reserved_cases"], 12);
}

#[tokio::test]
async fn external_orders_are_received_at_the_destination() {
    let app = TestApp::new().await;
    let (_store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;
    app.seed_inventory(store_b.id, product.id, 50, 0).await;

    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "product_id": product.id,
            "quantity_cases": 5,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    assert!(created["data"]["from_store_id"].is_null());
    let order_id = created["data"]["id"].as_i64().expect("order id");
    let status_uri = format!("/api/v1/orders/{}/status", order_id);

    // Approval parks the inbound cases as a reservation at the destination.
    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let destination = inventory_row(&app, store_b.id).await;
    assert_eq!(destination["quantity_cases"], 50);
    assert_eq!(destination["reserved_cases"], 5);

    // Receipt adds the cases and clears the reservation.
    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "fulfilled" })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let destination = inventory_row(&app, store_b.id).await;
    assert_eq!(destination["quantity_cases"], 55);
    assert_eq!(destination["reserved_cases"], 0);
}

#[tokio::test]
async fn rejects_malformed_creation_and_status_payloads() {
    let app = TestApp::new().await;
    let (store_a, store_b, product, manager, clerk) = replenishment_network(&app).await;

    // Body validation failures come back in the envelope.
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "to_store_id": store_b.id,
                "product_id": product.id,
                "quantity_cases": 0,
                "requested_by": clerk.id
            })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(
        body["errors"][0],
        "quantity_cases: must be at least one case"
    );

    // Rule violations surface as service errors.
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "to_store_id": store_a.id,
                "from_store_id": store_a.id,
                "product_id": product.id,
                "quantity_cases": 5,
                "requested_by": clerk.id
            })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("must differ"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "to_store_id": 999,
                "product_id": product.id,
                "quantity_cases": 5,
                "requested_by": clerk.id
            })),
            Some(clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("Destination store 999 does not exist"));

    // The status endpoint only understands the two forward transitions.
    let created = create_order(
        &app,
        json!({
            "to_store_id": store_b.id,
            "from_store_id": store_a.id,
            "product_id": product.id,
            "quantity_cases": 2,
            "requested_by": clerk.id
        }),
        clerk.id,
    )
    .await;
    let status_uri = format!("/api/v1/orders/{}/status", created["data"]["id"]);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "shipped" })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("approved or fulfilled"));

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "approved" })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("approved_by is required"));

    // Unknown references 404 once the caller is allowed to act.
    let response = app
        .request(
            Method::PUT,
            "/api/v1/orders/ORD999999/status",
            Some(json!({ "status": "approved", "approved_by": manager.id })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_sorts_and_pages_the_order_book() {
    let app = TestApp::new().await;
    let (_store_a, store_b, product, _manager, clerk) = replenishment_network(&app).await;
    let depot = app
        .seed_store("Bayside Depot", "ST-300", "South", "Warehouse")
        .await;
    let chips = app
        .seed_product("Salted Chips", "Crunch Co", "Snacks", dec!(4.00))
        .await;

    let now = Utc::now();
    let stale = app
        .seed_order(
            store_b.id,
            product.id,
            5,
            clerk.id,
            "pending_review",
            now - Duration::days(10),
        )
        .await;
    let done = app
        .seed_order(
            store_b.id,
            product.id,
            3,
            clerk.id,
            "fulfilled",
            now - Duration::days(5),
        )
        .await;
    let fresh = app
        .seed_order(
            depot.id,
            chips.id,
            8,
            clerk.id,
            "pending_review",
            now - Duration::days(1),
        )
        .await;

    // Newest first, wrapped in the pagination envelope.
    let body = read_json(app.get("/api/v1/orders").await).await;
    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["page"], 1);
    assert_eq!(data["limit"], 20);
    assert_eq!(data["total_pages"], 1);
    let ids: Vec<i64> = data["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|row| row["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![fresh.id as i64, done.id as i64, stale.id as i64]);

    // Rows carry the joined display fields the dashboard renders.
    let top = &data["items"][0];
    assert_eq!(top["to_store_name"], "Bayside Depot");
    assert_eq!(top["region"], "South");
    assert_eq!(top["product_name"], "Salted Chips");
    assert_eq!(top["category"], "Snacks");
    assert_eq!(top["requester_name"], "Carl Clerk");

    // Dropdown filters compose; `all` is a no-op.
    let body = read_json(app.get("/api/v1/orders?status=pending_review").await).await;
    assert_eq!(body["data"]["total"], 2);
    let body = read_json(app.get("/api/v1/orders?region=South").await).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], fresh.id);
    let body = read_json(
        app.get("/api/v1/orders?region=all&category=Beverages&status=fulfilled")
            .await,
    )
    .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], done.id);

    // Only pending orders past the review window count as expired.
    let body = read_json(app.get("/api/v1/orders?expired_sla_only=true").await).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], stale.id);

    // Date windows include both named days.
    let from = (now - Duration::days(6)).date_naive();
    let to = (now - Duration::days(4)).date_naive();
    let body = read_json(
        app.get(&format!("/api/v1/orders?date_from={}&date_to={}", from, to))
            .await,
    )
    .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], done.id);

    // The as-of cutoff reconstructs the book as it stood on that day.
    let as_of = (now - Duration::days(7)).date_naive();
    let body = read_json(
        app.get(&format!("/api/v1/orders?as_of_date={}", as_of))
            .await,
    )
    .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], stale.id);

    // Pagination slices the same ordering.
    let body = read_json(app.get("/api/v1/orders?limit=2").await).await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 2);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["total_pages"], 2);
    let body = read_json(app.get("/api/v1/orders?page=2&limit=2").await).await;
    assert_eq!(body["data"]["items"][0]["id"], stale.id);

    // A status outside the lifecycle is rejected up front.
    let response = app.get("/api/v1/orders?status=shipped").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_ids_are_echoed_and_attached_to_errors() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/orders/ORD404404",
            None,
            &[("x-request-id", "it-test-123")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("it-test-123")
    );
    let body = read_json(response).await;
    assert_eq!(body["request_id"], "it-test-123");

    // Without an inbound id the middleware mints one and still echoes it.
    let response = app.get("/api/v1/orders/ORD404404").await;
    let minted = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("minted request id")
        .to_string();
    let body = read_json(response).await;
    assert_eq!(body["request_id"], minted.as_str());
}

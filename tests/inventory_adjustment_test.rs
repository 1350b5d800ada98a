mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storeflow_api::entities::{
    inventory, user,
    user::{ROLE_REGIONAL_MANAGER, ROLE_STORE_MANAGER},
};

use common::{decimal_field, read_json, TestApp};

struct StockedNetwork {
    clerk: user::Model,
    downtown_cola: inventory::Model,
    downtown_chips: inventory::Model,
    bayside_cola: inventory::Model,
}

/// Two regions, two products, three ledger rows:
/// Downtown (North) holds 100 cases of cola and 8 of chips,
/// Bayside (South) holds 30 cases of cola with 25 reserved.
async fn stocked_network(app: &TestApp) -> StockedNetwork {
    let downtown = app
        .seed_store("Downtown Market", "ST-100", "North", "Urban")
        .await;
    let bayside = app
        .seed_store("Bayside Depot", "ST-300", "South", "Warehouse")
        .await;
    let cola = app
        .seed_product("Fizzy Cola", "Fizz Co", "Beverages", dec!(10.00))
        .await;
    let chips = app
        .seed_product("Salted Chips", "Crunch Co", "Snacks", dec!(4.00))
        .await;
    let clerk = app
        .seed_user("Carl", "Clerk", ROLE_STORE_MANAGER, Some("North"))
        .await;

    StockedNetwork {
        clerk,
        downtown_cola: app.seed_inventory(downtown.id, cola.id, 100, 0).await,
        downtown_chips: app.seed_inventory(downtown.id, chips.id, 8, 0).await,
        bayside_cola: app.seed_inventory(bayside.id, cola.id, 30, 25).await,
    }
}

async fn list(app: &TestApp, query: &str) -> Value {
    let response = app.get(&format!("/api/v1/inventory{}", query)).await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}

#[tokio::test]
async fn adjustment_requires_an_identified_user() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;
    let uri = format!("/api/v1/inventory/{}", network.downtown_cola.id);
    let patch = json!({ "quantity_cases": 90 });

    let response = app
        .request(Method::PUT, &uri, Some(patch.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::PUT, &uri, Some(patch.clone()), Some(31337))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Any known user may correct stock; the role gate covers approvals only.
    let response = app
        .request(Method::PUT, &uri, Some(patch), Some(network.clerk.id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn adjustment_applies_absolute_counts_and_bumps_version() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;
    let manager = app
        .seed_user("Rita", "Manager", ROLE_REGIONAL_MANAGER, Some("North"))
        .await;
    let uri = format!("/api/v1/inventory/{}", network.bayside_cola.id);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "quantity_cases": 60 })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    let row = &body["data"];
    assert_eq!(row["quantity_cases"], 60);
    assert_eq!(row["reserved_cases"], 25);
    assert_eq!(row["available_cases"], 35);
    assert_eq!(row["version"], 2);
    assert_eq!(decimal_field(&row["total_value"]), 600.0);

    // Untouched fields keep their values on the next correction.
    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "reserved_cases": 0, "expected_version": 2 })),
            Some(manager.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let row = read_json(response).await["data"].clone();
    assert_eq!(row["quantity_cases"], 60);
    assert_eq!(row["available_cases"], 60);
    assert_eq!(row["version"], 3);

    // The corrected row now leads the recency-ordered list.
    let body = list(&app, "").await;
    assert_eq!(ids(&body)[0], network.bayside_cola.id as i64);
}

#[tokio::test]
async fn rejects_inconsistent_counts() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;
    let uri = format!("/api/v1/inventory/{}", network.downtown_chips.id);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "reserved_cases": 45 })),
            Some(network.clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("reserved_cases (45) cannot exceed quantity_cases (8)"));

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "quantity_cases": -1 })),
            Some(network.clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("cannot be negative"));

    let response = app
        .request(Method::PUT, &uri, Some(json!({})), Some(network.clerk.id))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("At least one of quantity_cases or reserved_cases"));

    // None of the rejected writes touched the row.
    let body = list(&app, "?category=Snacks").await;
    let row = &body["data"]["items"][0];
    assert_eq!(row["quantity_cases"], 8);
    assert_eq!(row["version"], 1);
}

#[tokio::test]
async fn stale_expected_version_is_rejected() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;
    let uri = format!("/api/v1/inventory/{}", network.downtown_cola.id);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "quantity_cases": 95, "expected_version": 3 })),
            Some(network.clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("is at version 1, expected 3"));

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "quantity_cases": 95, "expected_version": 1 })),
            Some(network.clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["quantity_cases"], 95);
    assert_eq!(body["data"]["version"], 2);
}

#[tokio::test]
async fn unknown_record_is_a_not_found() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/inventory/99999",
            Some(json!({ "quantity_cases": 1 })),
            Some(network.clerk.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Not Found");
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("Inventory record 99999"));
}

#[tokio::test]
async fn list_filters_compose() {
    let app = TestApp::new().await;
    let network = stocked_network(&app).await;

    let body = list(&app, "").await;
    assert_eq!(body["data"]["total"], 3);

    // `all` is the UI's no-filter sentinel.
    let body = list(&app, "?region=all&category=all").await;
    assert_eq!(body["data"]["total"], 3);

    let body = list(&app, "?region=North").await;
    assert_eq!(body["data"]["total"], 2);

    let body = list(&app, "?category=Snacks").await;
    assert_eq!(ids(&body), vec![network.downtown_chips.id as i64]);

    // Search spans product, brand and store names, case-insensitively.
    let body = list(&app, "?search=cola").await;
    assert_eq!(body["data"]["total"], 2);
    let body = list(&app, "?search=BAYSIDE").await;
    assert_eq!(ids(&body), vec![network.bayside_cola.id as i64]);
    let body = list(&app, "?search=crunch").await;
    assert_eq!(ids(&body), vec![network.downtown_chips.id as i64]);

    // Available cases decide low stock: 8 for chips, 5 at Bayside.
    let body = list(&app, "?low_stock_only=true").await;
    assert_eq!(body["data"]["total"], 2);
    let body = list(&app, "?low_stock_only=true&threshold=5").await;
    assert_eq!(ids(&body), vec![network.bayside_cola.id as i64]);
    let body = list(&app, "?region=South&low_stock_only=true").await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn pagination_reports_totals_and_clamps_limits() {
    let app = TestApp::new().await;
    stocked_network(&app).await;

    let body = list(&app, "?page=1&limit=2").await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 2);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["page"], 1);

    let body = list(&app, "?page=2&limit=2").await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 1);
    assert_eq!(body["data"]["page"], 2);

    let body = list(&app, "?page=0&limit=500").await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 100);
}

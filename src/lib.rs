//! StoreFlow API Library
//!
//! Core functionality for the StoreFlow replenishment API: the order
//! workflow, the per-store inventory ledger, dashboard analytics, and the
//! store/product/user directory.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod request_id;
pub mod retry;
pub mod services;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::PermissionChecker;
use crate::db::DbPool;
use crate::services::{AnalyticsService, DirectoryService, InventoryService, OrderService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub inventory: InventoryService,
    pub orders: OrderService,
    pub analytics: AnalyticsService,
    pub directory: DirectoryService,
    pub permissions: Arc<dyn PermissionChecker>,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::request_id::current_request_id()
                .map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Full v1 API surface. Health endpoints live at the root router so load
/// balancers can reach them without the version prefix.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(api_status))
        // Orders
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/status/summary",
            get(handlers::orders::order_status_summary),
        )
        .route(
            "/orders/analytics/regions",
            get(handlers::orders::region_breakdown),
        )
        .route("/orders/analytics/sla", get(handlers::orders::sla_expiry))
        .route(
            "/orders/analytics/forecast",
            get(handlers::orders::demand_forecast),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order).put(handlers::orders::update_order),
        )
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route("/orders/:id/cancel", put(handlers::orders::cancel_order))
        // Inventory
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route("/inventory/kpi", get(handlers::inventory::inventory_kpis))
        .route(
            "/inventory/trends",
            get(handlers::inventory::inventory_trends),
        )
        .route(
            "/inventory/categories",
            get(handlers::inventory::category_breakdown),
        )
        .route(
            "/inventory/alerts/low-stock",
            get(handlers::inventory::low_stock_alerts),
        )
        .route("/inventory/:id", put(handlers::inventory::adjust_inventory))
        // Stores
        .route(
            "/stores",
            get(handlers::stores::list_stores).post(handlers::stores::create_store),
        )
        .route("/stores/regions", get(handlers::stores::region_options))
        .route("/stores/:id", get(handlers::stores::get_store))
        // Products
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/categories",
            get(handlers::products::category_options),
        )
        .route("/products/brands", get(handlers::products::brand_options))
        .route("/products/:id", get(handlers::products::get_product))
        // Users
        .route("/users", get(handlers::users::list_users))
        .route("/users/:id", get(handlers::users::get_user))
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "environment": state.config.environment.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

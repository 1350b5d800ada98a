use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::auth::{Action, UserContext};
use crate::services::analytics::{CategorySlice, Kpis, LowStockAlert, TrendSeries};
use crate::services::inventory::{InventoryFilters, InventoryPatch, InventoryRow};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct InventoryListQuery {
    #[serde(default = "super::default_page")]
    pub page: u64,
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    pub region: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
    pub threshold: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RegionCategoryQuery {
    pub region: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub days: Option<i64>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub region: Option<String>,
    pub category: Option<String>,
    pub threshold: Option<i32>,
    #[serde(default = "default_alert_limit")]
    pub limit: u64,
}

fn default_alert_limit() -> u64 {
    50
}

/// List inventory with joined product and store data
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    summary = "List inventory",
    description = "Paginated inventory rows with product and store details, newest changes first",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
        ("region" = Option<String>, Query, description = "Store region, or `all`"),
        ("category" = Option<String>, Query, description = "Product category, or `all`"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on product, brand, or store name"),
        ("low_stock_only" = Option<bool>, Query, description = "Only rows at or below the threshold"),
        ("threshold" = Option<i32>, Query, description = "Low stock threshold (default: 10)"),
    ),
    responses(
        (status = 200, description = "Inventory retrieved successfully", body = ApiResponse<PaginatedResponse<InventoryRow>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventoryRow>> {
    let filters = InventoryFilters {
        region: super::effective_filter(query.region),
        category: super::effective_filter(query.category),
        search: query.search.filter(|s| !s.trim().is_empty()),
        low_stock_only: query.low_stock_only,
        threshold: query.threshold,
    };
    let (page, limit) = super::normalize_paging(query.page, query.limit);

    let result = state.inventory.list(&filters, page, limit).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Directly adjust a stock row
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    summary = "Adjust inventory",
    description = "Set quantity or reserved cases on a stock row outside the order workflow",
    params(("id" = i32, Path, description = "Inventory record id")),
    request_body = InventoryPatch,
    responses(
        (status = 200, description = "Inventory adjusted successfully", body = ApiResponse<InventoryRow>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version conflict", body = crate::errors::ErrorResponse),
    )
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ctx: UserContext,
    Json(patch): Json<InventoryPatch>,
) -> ApiResult<InventoryRow> {
    state
        .permissions
        .check(&ctx, Action::AdjustInventory)
        .await?;

    let updated = state.inventory.adjust_direct(id, patch).await?;
    let row = state.inventory.get_row(updated.id).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Dashboard KPI card values
#[utoipa::path(
    get,
    path = "/api/v1/inventory/kpi",
    summary = "Inventory KPIs",
    description = "Totals for the dashboard cards: value, products, stores, alerts, order counts",
    tag = "Analytics",
    params(
        ("region" = Option<String>, Query, description = "Store region, or `all`"),
        ("category" = Option<String>, Query, description = "Product category, or `all`"),
    ),
    responses(
        (status = 200, description = "KPIs retrieved successfully", body = ApiResponse<Kpis>),
    )
)]
pub async fn inventory_kpis(
    State(state): State<AppState>,
    Query(query): Query<RegionCategoryQuery>,
) -> ApiResult<Kpis> {
    let region = super::effective_filter(query.region);
    let category = super::effective_filter(query.category);

    let kpis = state
        .analytics
        .kpis(region.as_deref(), category.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(kpis)))
}

/// Inventory and order trend series
#[utoipa::path(
    get,
    path = "/api/v1/inventory/trends",
    summary = "Trends",
    description = "Per-day inventory value/quantity and order counts over the trailing window",
    tag = "Analytics",
    params(
        ("days" = Option<i64>, Query, description = "Window length in days (default: 30, max: 365)"),
        ("region" = Option<String>, Query, description = "Store region, or `all`"),
    ),
    responses(
        (status = 200, description = "Trends retrieved successfully", body = ApiResponse<TrendSeries>),
    )
)]
pub async fn inventory_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> ApiResult<TrendSeries> {
    let region = super::effective_filter(query.region);

    let trends = state.analytics.trends(query.days, region.as_deref()).await?;
    Ok(Json(ApiResponse::success(trends)))
}

/// Inventory value by category
#[utoipa::path(
    get,
    path = "/api/v1/inventory/categories",
    summary = "Category breakdown",
    description = "Inventory value per product category with percentages",
    tag = "Analytics",
    params(("region" = Option<String>, Query, description = "Store region, or `all`")),
    responses(
        (status = 200, description = "Breakdown retrieved successfully", body = ApiResponse<Vec<CategorySlice>>),
    )
)]
pub async fn category_breakdown(
    State(state): State<AppState>,
    Query(query): Query<RegionCategoryQuery>,
) -> ApiResult<Vec<CategorySlice>> {
    let region = super::effective_filter(query.region);

    let breakdown = state.analytics.category_breakdown(region.as_deref()).await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

/// Rows at or below the alert threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/alerts/low-stock",
    summary = "Low stock alerts",
    description = "Stock rows with the least available cases first",
    tag = "Analytics",
    params(
        ("region" = Option<String>, Query, description = "Store region, or `all`"),
        ("category" = Option<String>, Query, description = "Product category, or `all`"),
        ("threshold" = Option<i32>, Query, description = "Alert threshold (default: 50)"),
        ("limit" = Option<u64>, Query, description = "Maximum rows (default: 50, max: 100)"),
    ),
    responses(
        (status = 200, description = "Alerts retrieved successfully", body = ApiResponse<Vec<LowStockAlert>>),
    )
)]
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Vec<LowStockAlert>> {
    let region = super::effective_filter(query.region);
    let category = super::effective_filter(query.category);
    let limit = query.limit.clamp(1, super::MAX_PAGE_SIZE);

    let alerts = state
        .analytics
        .low_stock_alerts(
            region.as_deref(),
            category.as_deref(),
            query.threshold,
            limit,
        )
        .await?;
    Ok(Json(ApiResponse::success(alerts)))
}

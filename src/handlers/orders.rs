use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{Action, UserContext};
use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::services::analytics::{DemandForecast, RegionSlice, SlaExpiry};
use crate::services::orders::{NewOrder, OrderFilters, OrderPatch, OrderRow, StatusCount};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct OrdersListQuery {
    #[serde(default = "super::default_page")]
    pub page: u64,
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    pub region: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub expired_sla_only: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub as_of_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StatusSummaryQuery {
    pub region: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub expired_sla_only: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub as_of_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SlaQuery {
    pub as_of_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon_days: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub to_store_id: i32,
    pub product_id: i32,
    #[validate(range(min = 1, message = "must be at least one case"))]
    pub quantity_cases: i32,
    pub requested_by: i32,
    pub from_store_id: Option<i32>,
    pub notes: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "must not be blank"))]
    pub order_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    /// Target status, either `approved` or `fulfilled`.
    pub status: String,
    pub approved_by: Option<i32>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CancelOrderRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub reason: String,
}

fn build_filters(
    region: Option<String>,
    category: Option<String>,
    status: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    as_of_date: Option<NaiveDate>,
    expired_sla_only: bool,
) -> Result<OrderFilters, ServiceError> {
    let status = match super::effective_filter(status) {
        Some(raw) => Some(OrderStatus::parse(&raw).ok_or_else(|| {
            ServiceError::ValidationError(format!("Unknown order status: {}", raw))
        })?),
        None => None,
    };

    Ok(OrderFilters {
        region: super::effective_filter(region),
        category: super::effective_filter(category),
        status,
        date_from,
        date_to,
        as_of_date,
        expired_sla_only,
    })
}

/// List orders with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Get a paginated list of orders with optional filtering",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
        ("region" = Option<String>, Query, description = "Destination store region, or `all`"),
        ("category" = Option<String>, Query, description = "Product category, or `all`"),
        ("status" = Option<String>, Query, description = "Order status, or `all`"),
        ("expired_sla_only" = Option<bool>, Query, description = "Only pending orders past the review window"),
        ("date_from" = Option<String>, Query, description = "Earliest order date (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Latest order date (YYYY-MM-DD)"),
        ("as_of_date" = Option<String>, Query, description = "Historical cutoff (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<OrderRow>>),
        (status = 400, description = "Invalid request parameters", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersListQuery>,
) -> ApiResult<PaginatedResponse<OrderRow>> {
    let filters = build_filters(
        query.region,
        query.category,
        query.status,
        query.date_from,
        query.date_to,
        query.as_of_date,
        query.expired_sla_only,
    )?;
    let (page, limit) = super::normalize_paging(query.page, query.limit);

    let result = state.orders.list(&filters, page, limit).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Create a new replenishment order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Create a replenishment order in pending review",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderRow>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderRow>>), ServiceError> {
    state.permissions.check(&ctx, Action::CreateOrder).await?;

    if let Err(validation_errors) = request.validate() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(super::validation_messages(
                &validation_errors,
            ))),
        ));
    }

    let created = state
        .orders
        .create(NewOrder {
            to_store_id: request.to_store_id,
            product_id: request.product_id,
            quantity_cases: request.quantity_cases,
            requested_by: request.requested_by,
            from_store_id: request.from_store_id,
            notes: request.notes,
            order_date: request.order_date,
            order_number: request.order_number,
        })
        .await?;
    let row = state.orders.get_row(&created.id.to_string()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            row,
            "Order created successfully",
        )),
    ))
}

/// Get a single order by id or order number
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Retrieve an order by numeric id or by order number (e.g. ORD000042)",
    params(("id" = String, Path, description = "Order id or order number")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderRow>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OrderRow> {
    let row = state.orders.get_row(&id).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Update editable fields on an open order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Update order fields",
    description = "Change quantity or notes while the order is not terminal",
    params(("id" = String, Path, description = "Order id or order number")),
    request_body = OrderPatch,
    responses(
        (status = 200, description = "Order updated successfully", body = ApiResponse<OrderRow>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version conflict", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock for the new quantity", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: UserContext,
    Json(patch): Json<OrderPatch>,
) -> ApiResult<OrderRow> {
    state.permissions.check(&ctx, Action::UpdateOrder).await?;

    let order = state.orders.resolve_reference(&id).await?;
    let updated = state.orders.update_fields(order.id, patch).await?;
    let row = state.orders.get_row(&updated.id.to_string()).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Approve or fulfill an order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    summary = "Advance order status",
    description = "Move an order to `approved` (reserving stock) or `fulfilled` (moving stock)",
    params(("id" = String, Path, description = "Order id or order number")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated successfully", body = ApiResponse<OrderRow>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invalid transition or version conflict", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: UserContext,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<OrderRow> {
    let updated = match request.status.trim().to_ascii_lowercase().as_str() {
        "approved" => {
            state.permissions.check(&ctx, Action::ApproveOrder).await?;
            let approved_by = request.approved_by.ok_or_else(|| {
                ServiceError::ValidationError(
                    "approved_by is required when approving an order".to_string(),
                )
            })?;
            let order = state.orders.resolve_reference(&id).await?;
            state
                .orders
                .approve(order.id, approved_by, request.expected_version)
                .await?
        }
        "fulfilled" => {
            state.permissions.check(&ctx, Action::FulfillOrder).await?;
            let order = state.orders.resolve_reference(&id).await?;
            state
                .orders
                .fulfill(order.id, request.expected_version)
                .await?
        }
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Status can only be set to approved or fulfilled, not {}",
                other
            )))
        }
    };

    let row = state.orders.get_row(&updated.id.to_string()).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Cancel an order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    description = "Cancel a pending or approved order, releasing any reservation",
    params(("id" = String, Path, description = "Order id or order number")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled successfully", body = ApiResponse<OrderRow>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is already terminal", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: UserContext,
    Json(request): Json<CancelOrderRequest>,
) -> ApiResult<OrderRow> {
    state.permissions.check(&ctx, Action::CancelOrder).await?;

    if let Err(validation_errors) = request.validate() {
        return Err(ServiceError::ValidationError(
            super::validation_messages(&validation_errors).join("; "),
        ));
    }

    let order = state.orders.resolve_reference(&id).await?;
    let cancelled = state.orders.cancel(order.id, &request.reason).await?;
    let row = state.orders.get_row(&cancelled.id.to_string()).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Order counts grouped by status
#[utoipa::path(
    get,
    path = "/api/v1/orders/status/summary",
    summary = "Status summary",
    description = "Order and case counts per status, defaulting to the trailing 30 days",
    params(
        ("region" = Option<String>, Query, description = "Destination store region, or `all`"),
        ("category" = Option<String>, Query, description = "Product category, or `all`"),
        ("status" = Option<String>, Query, description = "Order status, or `all`"),
        ("expired_sla_only" = Option<bool>, Query, description = "Only pending orders past the review window"),
        ("date_from" = Option<String>, Query, description = "Earliest order date (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Latest order date (YYYY-MM-DD)"),
        ("as_of_date" = Option<String>, Query, description = "Historical cutoff (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Summary retrieved successfully", body = ApiResponse<Vec<StatusCount>>),
        (status = 400, description = "Invalid request parameters", body = crate::errors::ErrorResponse),
    )
)]
pub async fn order_status_summary(
    State(state): State<AppState>,
    Query(query): Query<StatusSummaryQuery>,
) -> ApiResult<Vec<StatusCount>> {
    let filters = build_filters(
        query.region,
        query.category,
        query.status,
        query.date_from,
        query.date_to,
        query.as_of_date,
        query.expired_sla_only,
    )?;

    let summary = state.orders.status_summary(&filters).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Orders per destination region
#[utoipa::path(
    get,
    path = "/api/v1/orders/analytics/regions",
    summary = "Region breakdown",
    description = "Order and case counts per destination region with percentages",
    tag = "Analytics",
    responses(
        (status = 200, description = "Breakdown retrieved successfully", body = ApiResponse<Vec<RegionSlice>>),
    )
)]
pub async fn region_breakdown(State(state): State<AppState>) -> ApiResult<Vec<RegionSlice>> {
    let breakdown = state.analytics.region_breakdown().await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

/// Pending orders past the review window
#[utoipa::path(
    get,
    path = "/api/v1/orders/analytics/sla",
    summary = "SLA expiry",
    description = "Pending orders older than the review window, with days pending",
    tag = "Analytics",
    params(("as_of_date" = Option<String>, Query, description = "Evaluate as of this date (YYYY-MM-DD)")),
    responses(
        (status = 200, description = "Expired orders retrieved successfully", body = ApiResponse<SlaExpiry>),
    )
)]
pub async fn sla_expiry(
    State(state): State<AppState>,
    Query(query): Query<SlaQuery>,
) -> ApiResult<SlaExpiry> {
    let report = state.analytics.sla_expiry(query.as_of_date).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Demand forecast
#[utoipa::path(
    get,
    path = "/api/v1/orders/analytics/forecast",
    summary = "Demand forecast",
    description = "Daily order, case, and value projections from the trailing four weeks",
    tag = "Analytics",
    params(("horizon_days" = Option<u32>, Query, description = "Days to project (default: 14, max: 90)")),
    responses(
        (status = 200, description = "Forecast retrieved successfully", body = ApiResponse<DemandForecast>),
    )
)]
pub async fn demand_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<DemandForecast> {
    let forecast = state.analytics.forecast(query.horizon_days).await?;
    Ok(Json(ApiResponse::success(forecast)))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Action, UserContext};
use crate::entities::product;
use crate::services::directory::{NewProduct, OptionItem, ProductFilters};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductRecord {
    pub id: i32,
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub package_size: String,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductRecord {
    fn from(m: product::Model) -> Self {
        Self {
            id: m.id,
            product_name: m.product_name,
            brand: m.brand,
            category: m.category,
            package_size: m.package_size,
            unit_price: m.unit_price,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsListQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
}

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List products",
    description = "All products ordered by name",
    params(
        ("category" = Option<String>, Query, description = "Category, or `all`"),
        ("brand" = Option<String>, Query, description = "Brand, or `all`"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on product name or brand"),
    ),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Vec<ProductRecord>>),
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsListQuery>,
) -> ApiResult<Vec<ProductRecord>> {
    let filters = ProductFilters {
        category: super::effective_filter(query.category),
        brand: super::effective_filter(query.brand),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let products = state.directory.list_products(&filters).await?;
    let records: Vec<ProductRecord> = products.into_iter().map(ProductRecord::from).collect();
    Ok(Json(ApiResponse::success(records)))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    summary = "Get product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ApiResponse<ProductRecord>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ProductRecord> {
    let product = state.directory.get_product(id).await?;
    Ok(Json(ApiResponse::success(ProductRecord::from(product))))
}

/// Register a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created successfully", body = ApiResponse<ProductRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRecord>>), crate::errors::ServiceError> {
    state.permissions.check(&ctx, Action::CreateProduct).await?;

    let created = state.directory.create_product(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            ProductRecord::from(created),
            "Product created successfully",
        )),
    ))
}

/// Category dropdown options
#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    summary = "Category options",
    responses(
        (status = 200, description = "Options retrieved successfully", body = ApiResponse<Vec<OptionItem>>),
    )
)]
pub async fn category_options(State(state): State<AppState>) -> ApiResult<Vec<OptionItem>> {
    let options = state.directory.category_options().await?;
    Ok(Json(ApiResponse::success(options)))
}

/// Brand dropdown options
#[utoipa::path(
    get,
    path = "/api/v1/products/brands",
    summary = "Brand options",
    responses(
        (status = 200, description = "Options retrieved successfully", body = ApiResponse<Vec<OptionItem>>),
    )
)]
pub async fn brand_options(State(state): State<AppState>) -> ApiResult<Vec<OptionItem>> {
    let options = state.directory.brand_options().await?;
    Ok(Json(ApiResponse::success(options)))
}

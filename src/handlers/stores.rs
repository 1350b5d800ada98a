use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Action, UserContext};
use crate::entities::store;
use crate::services::directory::{NewStore, RegionOption, StoreFilters};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreRecord {
    pub id: i32,
    pub store_name: String,
    pub store_code: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub region: String,
    pub store_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<store::Model> for StoreRecord {
    fn from(m: store::Model) -> Self {
        Self {
            id: m.id,
            store_name: m.store_name,
            store_code: m.store_code,
            address: m.address,
            city: m.city,
            state: m.state,
            zip_code: m.zip_code,
            region: m.region,
            store_type: m.store_type,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoresListQuery {
    pub region: Option<String>,
    pub store_type: Option<String>,
    pub search: Option<String>,
}

/// List stores
#[utoipa::path(
    get,
    path = "/api/v1/stores",
    summary = "List stores",
    description = "All stores ordered by region and name",
    params(
        ("region" = Option<String>, Query, description = "Region, or `all`"),
        ("store_type" = Option<String>, Query, description = "Store type, or `all`"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on name, code, or city"),
    ),
    responses(
        (status = 200, description = "Stores retrieved successfully", body = ApiResponse<Vec<StoreRecord>>),
    )
)]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoresListQuery>,
) -> ApiResult<Vec<StoreRecord>> {
    let filters = StoreFilters {
        region: super::effective_filter(query.region),
        store_type: super::effective_filter(query.store_type),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let stores = state.directory.list_stores(&filters).await?;
    let records: Vec<StoreRecord> = stores.into_iter().map(StoreRecord::from).collect();
    Ok(Json(ApiResponse::success(records)))
}

/// Get a store by id
#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}",
    summary = "Get store",
    params(("id" = i32, Path, description = "Store id")),
    responses(
        (status = 200, description = "Store retrieved successfully", body = ApiResponse<StoreRecord>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_store(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StoreRecord> {
    let store = state.directory.get_store(id).await?;
    Ok(Json(ApiResponse::success(StoreRecord::from(store))))
}

/// Register a store
#[utoipa::path(
    post,
    path = "/api/v1/stores",
    summary = "Create store",
    request_body = NewStore,
    responses(
        (status = 201, description = "Store created successfully", body = ApiResponse<StoreRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_store(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<NewStore>,
) -> Result<(StatusCode, Json<ApiResponse<StoreRecord>>), crate::errors::ServiceError> {
    state.permissions.check(&ctx, Action::CreateStore).await?;

    let created = state.directory.create_store(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            StoreRecord::from(created),
            "Store created successfully",
        )),
    ))
}

/// Region dropdown options
#[utoipa::path(
    get,
    path = "/api/v1/stores/regions",
    summary = "Region options",
    description = "Distinct regions with store counts, led by the `all` entry",
    responses(
        (status = 200, description = "Options retrieved successfully", body = ApiResponse<Vec<RegionOption>>),
    )
)]
pub async fn region_options(State(state): State<AppState>) -> ApiResult<Vec<RegionOption>> {
    let options = state.directory.region_options().await?;
    Ok(Json(ApiResponse::success(options)))
}

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::user;
use crate::services::directory::UserFilters;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRecord {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub role: String,
    pub store_id: Option<i32>,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserRecord {
    fn from(m: user::Model) -> Self {
        let display_name = m.display_name();
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            display_name,
            role: m.role,
            store_id: m.store_id,
            region: m.region,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsersListQuery {
    pub role: Option<String>,
    pub region: Option<String>,
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    summary = "List users",
    description = "All users, newest first",
    params(
        ("role" = Option<String>, Query, description = "Role, or `all`"),
        ("region" = Option<String>, Query, description = "Region, or `all`"),
    ),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserRecord>>),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersListQuery>,
) -> ApiResult<Vec<UserRecord>> {
    let filters = UserFilters {
        role: super::effective_filter(query.role),
        region: super::effective_filter(query.region),
    };

    let users = state.directory.list_users(&filters).await?;
    let records: Vec<UserRecord> = users.into_iter().map(UserRecord::from).collect();
    Ok(Json(ApiResponse::success(records)))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    summary = "Get user",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserRecord>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<UserRecord> {
    let user = state.directory.get_user(id).await?;
    Ok(Json(ApiResponse::success(UserRecord::from(user))))
}

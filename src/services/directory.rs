/*!
 * Reference-data service for stores, products, and users.
 *
 * Backs the directory endpoints and the dropdown options the dashboard
 * builds its filters from. These rows change rarely and carry no version
 * column; creates are plain inserts with uniqueness mapped to validation
 * errors.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::product;
use crate::entities::store::{self, STORE_TYPES};
use crate::entities::user;
use crate::errors::{map_unique_violation, ServiceError};

/// Payload for registering a store.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewStore {
    pub store_name: String,
    pub store_code: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub region: String,
    pub store_type: String,
}

/// Payload for registering a product.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewProduct {
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub package_size: String,
    pub unit_price: Decimal,
}

/// Filters for the store listing. Search matches store name, code, and
/// city case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StoreFilters {
    pub region: Option<String>,
    pub store_type: Option<String>,
    pub search: Option<String>,
}

/// Filters for the product listing. Search matches product name and brand.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub role: Option<String>,
    pub region: Option<String>,
}

/// Region dropdown entry. The first entry is always the synthetic `all`
/// option carrying the grand total.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegionOption {
    pub value: String,
    pub label: String,
    pub store_count: i64,
}

/// Value/label pair for the category and brand dropdowns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

/// Service exposing the reference-data side of the API.
#[derive(Clone)]
pub struct DirectoryService {
    db_pool: Arc<DbPool>,
}

impl DirectoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists stores ordered by region, then name. No pagination; the store
    /// network is small and the dashboard renders it whole.
    #[instrument(skip(self))]
    pub async fn list_stores(
        &self,
        filters: &StoreFilters,
    ) -> Result<Vec<store::Model>, ServiceError> {
        let mut query = store::Entity::find();
        if let Some(region) = &filters.region {
            query = query.filter(store::Column::Region.eq(region.clone()));
        }
        if let Some(store_type) = &filters.store_type {
            query = query.filter(store::Column::StoreType.eq(store_type.clone()));
        }
        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(store::Column::StoreName)))
                            .like(&pattern),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(store::Column::StoreCode)))
                            .like(&pattern),
                    )
                    .add(Expr::expr(Func::lower(Expr::col(store::Column::City))).like(&pattern)),
            );
        }

        query
            .order_by_asc(store::Column::Region)
            .order_by_asc(store::Column::StoreName)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!("Failed to list stores: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    pub async fn get_store(&self, store_id: i32) -> Result<store::Model, ServiceError> {
        store::Entity::find_by_id(store_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found(format!("Store {}", store_id)))
    }

    #[instrument(skip(self, new_store))]
    pub async fn create_store(&self, new_store: NewStore) -> Result<store::Model, ServiceError> {
        let store_name = required(&new_store.store_name, "store_name")?;
        let store_code = required(&new_store.store_code, "store_code")?;
        let region = required(&new_store.region, "region")?;
        let store_type = required(&new_store.store_type, "store_type")?;
        if !STORE_TYPES.contains(&store_type.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "store_type must be one of: {}",
                STORE_TYPES.join(", ")
            )));
        }

        let conflict = ServiceError::ValidationError(format!(
            "Store code {} is already in use",
            store_code
        ));
        let created = store::ActiveModel {
            store_name: Set(store_name),
            store_code: Set(store_code),
            address: Set(new_store.address.trim().to_string()),
            city: Set(new_store.city.trim().to_string()),
            state: Set(new_store.state.trim().to_string()),
            zip_code: Set(new_store.zip_code.trim().to_string()),
            region: Set(region),
            store_type: Set(store_type),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!("Failed to create store: {}", e);
            map_unique_violation(e, conflict)
        })?;

        info!(store_id = created.id, "Created store {}", created.store_code);
        Ok(created)
    }

    /// Builds the region dropdown from the live store list.
    #[instrument(skip(self))]
    pub async fn region_options(&self) -> Result<Vec<RegionOption>, ServiceError> {
        let stores = store::Entity::find()
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!("Failed to load stores for region options: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        Ok(region_options_from(&stores))
    }

    /// Lists products ordered by name.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filters: &ProductFilters,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = product::Entity::find();
        if let Some(category) = &filters.category {
            query = query.filter(product::Column::Category.eq(category.clone()));
        }
        if let Some(brand) = &filters.brand {
            query = query.filter(product::Column::Brand.eq(brand.clone()));
        }
        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(product::Column::ProductName)))
                            .like(&pattern),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(product::Column::Brand))).like(&pattern),
                    ),
            );
        }

        query
            .order_by_asc(product::Column::ProductName)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!("Failed to list products: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    pub async fn get_product(&self, product_id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found(format!("Product {}", product_id)))
    }

    #[instrument(skip(self, new_product))]
    pub async fn create_product(
        &self,
        new_product: NewProduct,
    ) -> Result<product::Model, ServiceError> {
        let product_name = required(&new_product.product_name, "product_name")?;
        let brand = required(&new_product.brand, "brand")?;
        let category = required(&new_product.category, "category")?;
        let package_size = required(&new_product.package_size, "package_size")?;
        if new_product.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price must not be negative".to_string(),
            ));
        }

        let created = product::ActiveModel {
            product_name: Set(product_name),
            brand: Set(brand),
            category: Set(category),
            package_size: Set(package_size),
            unit_price: Set(new_product.unit_price),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!("Failed to create product: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = created.id, "Created product {}", created.product_name);
        Ok(created)
    }

    /// Distinct product categories, sorted, as dropdown options.
    #[instrument(skip(self))]
    pub async fn category_options(&self) -> Result<Vec<OptionItem>, ServiceError> {
        let products = self.all_products().await?;
        Ok(distinct_options(
            products.into_iter().map(|p| p.category),
        ))
    }

    /// Distinct product brands, sorted, as dropdown options.
    #[instrument(skip(self))]
    pub async fn brand_options(&self) -> Result<Vec<OptionItem>, ServiceError> {
        let products = self.all_products().await?;
        Ok(distinct_options(products.into_iter().map(|p| p.brand)))
    }

    /// Lists users, newest first.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        filters: &UserFilters,
    ) -> Result<Vec<user::Model>, ServiceError> {
        let mut query = user::Entity::find();
        if let Some(role) = &filters.role {
            query = query.filter(user::Column::Role.eq(role.clone()));
        }
        if let Some(region) = &filters.region {
            query = query.filter(user::Column::Region.eq(region.clone()));
        }

        query
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!("Failed to list users: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    pub async fn get_user(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", user_id)))
    }

    async fn all_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be blank",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Region dropdown: a synthetic `all` entry with the grand total first,
/// then one entry per region in alphabetical order.
fn region_options_from(stores: &[store::Model]) -> Vec<RegionOption> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for s in stores {
        *counts.entry(s.region.as_str()).or_insert(0) += 1;
    }

    let total = stores.len() as i64;
    let mut options = Vec::with_capacity(counts.len() + 1);
    options.push(RegionOption {
        value: "all".to_string(),
        label: format!("All Regions ({} stores)", total),
        store_count: total,
    });
    for (region, count) in counts {
        options.push(RegionOption {
            value: region.to_string(),
            label: format!("{} ({} stores)", region, count),
            store_count: count,
        });
    }
    options
}

fn distinct_options<I>(values: I) -> Vec<OptionItem>
where
    I: IntoIterator<Item = String>,
{
    let distinct: BTreeSet<String> = values.into_iter().collect();
    distinct
        .into_iter()
        .map(|value| OptionItem {
            label: value.clone(),
            value,
        })
        .collect()
}

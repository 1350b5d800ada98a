/*!
 * Inventory ledger service.
 *
 * Owns the per-(store, product) stock rows and every mutation of them. The
 * reserve / release / transfer operations run inside a transaction the
 * order service opens, so an order transition and its bookkeeping commit or
 * roll back as one unit. Every write is a guarded update against the row
 * version read at the start of the operation.
 */

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::inventory::{self, Entity as Inventory};
use crate::entities::product::{self, Entity as Product};
use crate::entities::store::{self, Entity as Store};
use crate::errors::{map_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::PaginatedResponse;

/// Threshold for the `low_stock_only` list filter when none is supplied.
pub const DEFAULT_LOW_STOCK_LIST_THRESHOLD: i32 = 10;

/// Threshold below which a row counts as a low-stock alert (dashboards and
/// the detection event after a direct adjustment).
pub const DEFAULT_LOW_STOCK_ALERT_THRESHOLD: i32 = 50;

/// Absolute-value correction applied by `adjust_direct`. The field set is
/// closed on purpose: these two counters are the only mutable ledger state.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InventoryPatch {
    pub quantity_cases: Option<i32>,
    pub reserved_cases: Option<i32>,
    /// When present, the write only applies if the row is still at this
    /// version; a mismatch is a `VersionConflict`.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilters {
    pub region: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub low_stock_only: bool,
    pub threshold: Option<i32>,
}

/// Ledger row joined with its product and store for list/detail responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryRow {
    pub id: i32,
    pub product_id: i32,
    pub store_id: i32,
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub package_size: String,
    pub unit_price: Decimal,
    pub store_name: String,
    pub region: String,
    pub quantity_cases: i32,
    pub reserved_cases: i32,
    pub available_cases: i32,
    pub total_value: Decimal,
    pub last_updated: DateTime<Utc>,
    pub version: i32,
}

fn compose_row(
    record: inventory::Model,
    product: &product::Model,
    store: &store::Model,
) -> InventoryRow {
    InventoryRow {
        id: record.id,
        product_id: record.product_id,
        store_id: record.store_id,
        product_name: product.product_name.clone(),
        brand: product.brand.clone(),
        category: product.category.clone(),
        package_size: product.package_size.clone(),
        unit_price: product.unit_price,
        store_name: store.store_name.clone(),
        region: store.region.clone(),
        quantity_cases: record.quantity_cases,
        reserved_cases: record.reserved_cases,
        available_cases: record.available(),
        total_value: Decimal::from(record.quantity_cases) * product.unit_price,
        last_updated: record.last_updated,
        version: record.version,
    }
}

/// New reserved count after committing `requested` more cases, or None when
/// the uncommitted balance cannot cover the request.
fn checked_reserve(quantity_cases: i32, reserved_cases: i32, requested: i32) -> Option<i32> {
    let available = quantity_cases - reserved_cases;
    if requested <= available {
        Some(reserved_cases + requested)
    } else {
        None
    }
}

/// Subtraction clamped at zero; the flag reports that the clamp fired,
/// which means the books were already inconsistent.
fn clamped_sub(current: i32, delta: i32) -> (i32, bool) {
    if delta > current {
        (0, true)
    } else {
        (current - delta, false)
    }
}

/// Guarded write of both counters: applies only if the row is still at the
/// version carried by `record`, bumping it by one. Zero rows affected means
/// a concurrent writer got there first.
async fn apply_guarded(
    txn: &DatabaseTransaction,
    record: &inventory::Model,
    new_quantity: i32,
    new_reserved: i32,
) -> Result<inventory::Model, ServiceError> {
    let now = Utc::now();
    let result = Inventory::update_many()
        .col_expr(inventory::Column::QuantityCases, Expr::value(new_quantity))
        .col_expr(inventory::Column::ReservedCases, Expr::value(new_reserved))
        .col_expr(inventory::Column::LastUpdated, Expr::value(now))
        .col_expr(inventory::Column::Version, Expr::value(record.version + 1))
        .filter(inventory::Column::Id.eq(record.id))
        .filter(inventory::Column::Version.eq(record.version))
        .exec(txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::VersionConflict(format!(
            "Inventory record {} was modified concurrently",
            record.id
        )));
    }

    Ok(inventory::Model {
        quantity_cases: new_quantity,
        reserved_cases: new_reserved,
        last_updated: now,
        version: record.version + 1,
        ..record.clone()
    })
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    retry_policy: RetryPolicy,
    low_stock_list_threshold: i32,
    low_stock_alert_threshold: i32,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
            retry_policy: RetryPolicy::default(),
            low_stock_list_threshold: DEFAULT_LOW_STOCK_LIST_THRESHOLD,
            low_stock_alert_threshold: DEFAULT_LOW_STOCK_ALERT_THRESHOLD,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_low_stock_list_threshold(mut self, threshold: i32) -> Self {
        self.low_stock_list_threshold = threshold;
        self
    }

    pub fn with_low_stock_alert_threshold(mut self, threshold: i32) -> Self {
        self.low_stock_alert_threshold = threshold;
        self
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<inventory::Model, ServiceError> {
        let db = &*self.db_pool;
        Inventory::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch inventory record {}: {}", id, e);
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::not_found(format!("Inventory record {}", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_by_key(
        &self,
        store_id: i32,
        product_id: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let db = &*self.db_pool;
        Inventory::find()
            .filter(inventory::Column::StoreId.eq(store_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(
                    "Failed to fetch inventory for product {} at store {}: {}",
                    product_id, store_id, e
                );
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "Inventory for product {} at store {}",
                    product_id, store_id
                ))
            })
    }

    /// Joined detail view for a single ledger row.
    #[instrument(skip(self))]
    pub async fn get_row(&self, id: i32) -> Result<InventoryRow, ServiceError> {
        let record = self.get(id).await?;
        let rows = self.compose_rows(vec![record]).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(format!("Inventory record {}", id)))
    }

    /// Lists ledger rows joined with product and store data, most recently
    /// touched first. All filters combine with AND; search is a
    /// case-insensitive substring match over product name, brand and store
    /// name.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &InventoryFilters,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<InventoryRow>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = Inventory::find()
            .join(JoinType::InnerJoin, inventory::Relation::Product.def())
            .join(JoinType::InnerJoin, inventory::Relation::Store.def());

        if let Some(region) = filters.region.as_deref() {
            query = query.filter(store::Column::Region.eq(region));
        }
        if let Some(category) = filters.category.as_deref() {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            Product,
                            product::Column::ProductName,
                        ))))
                        .like(&pattern),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((Product, product::Column::Brand))))
                            .like(&pattern),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((Store, store::Column::StoreName))))
                            .like(&pattern),
                    ),
            );
        }
        if filters.low_stock_only {
            let threshold = filters.threshold.unwrap_or(self.low_stock_list_threshold);
            query = query.filter(
                Expr::expr(
                    Expr::col(inventory::Column::QuantityCases)
                        .sub(Expr::col(inventory::Column::ReservedCases)),
                )
                .lte(threshold),
            );
        }

        let paginator = query
            .order_by_desc(inventory::Column::LastUpdated)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count inventory records: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let records = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!("Failed to fetch inventory page {}: {}", page, e);
                ServiceError::DatabaseError(e)
            })?;

        let items = self.compose_rows(records).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    async fn compose_rows(
        &self,
        records: Vec<inventory::Model>,
    ) -> Result<Vec<InventoryRow>, ServiceError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let db = &*self.db_pool;
        let product_ids: Vec<i32> = records.iter().map(|r| r.product_id).collect();
        let store_ids: Vec<i32> = records.iter().map(|r| r.store_id).collect();

        let products: HashMap<i32, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let stores: HashMap<i32, store::Model> = Store::find()
            .filter(store::Column::Id.is_in(store_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let product = products.get(&record.product_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Product {} referenced by inventory {} does not exist",
                    record.product_id, record.id
                ))
            })?;
            let store = stores.get(&record.store_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Store {} referenced by inventory {} does not exist",
                    record.store_id, record.id
                ))
            })?;
            rows.push(compose_row(record, product, store));
        }
        Ok(rows)
    }

    /// Commits `quantity_cases` at the given store against an order. Fails
    /// with `InsufficientStock` when the uncommitted balance cannot cover
    /// the request; the caller's transaction then rolls everything back.
    #[instrument(skip(self, txn))]
    pub async fn reserve_in_txn(
        &self,
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let record = Self::require_record(txn, store_id, product_id).await?;
        let new_reserved = checked_reserve(record.quantity_cases, record.reserved_cases, quantity_cases)
            .ok_or(ServiceError::InsufficientStock {
                requested: quantity_cases,
                available: record.available(),
            })?;
        let updated = apply_guarded(txn, &record, record.quantity_cases, new_reserved).await?;
        info!(
            store_id,
            product_id, quantity_cases, order_id, "Reserved inventory for order"
        );
        Ok(updated)
    }

    /// Returns previously reserved cases to the uncommitted balance. A
    /// release larger than the current reservation means bookkeeping already
    /// went wrong somewhere: surfaced as an invariant violation in debug
    /// builds, logged and clamped at zero in release builds.
    #[instrument(skip(self, txn))]
    pub async fn release_in_txn(
        &self,
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let record = Self::require_record(txn, store_id, product_id).await?;
        let (new_reserved, clamped) = clamped_sub(record.reserved_cases, quantity_cases);
        if clamped {
            if cfg!(debug_assertions) {
                return Err(ServiceError::InvariantViolation(format!(
                    "Release of {} cases exceeds the {} reserved for product {} at store {}",
                    quantity_cases, record.reserved_cases, product_id, store_id
                )));
            }
            error!(
                store_id,
                product_id,
                requested = quantity_cases,
                reserved = record.reserved_cases,
                "Release exceeds reserved cases, clamping at zero"
            );
        }
        let updated = apply_guarded(txn, &record, record.quantity_cases, new_reserved).await?;
        info!(
            store_id,
            product_id, quantity_cases, order_id, "Released reservation"
        );
        Ok(updated)
    }

    /// Moves `quantity_cases` between stores as one bookkeeping step: the
    /// source gives up the stock and its matching reservation, the
    /// destination gains the stock (its row is created on first receipt).
    /// With no source store this is an external receipt into `to_store_id`.
    /// The two row updates always run in ascending (store_id, product_id)
    /// order so concurrent transfers acquire row locks in the same sequence.
    #[instrument(skip(self, txn))]
    pub async fn transfer_in_txn(
        &self,
        txn: &DatabaseTransaction,
        from_store_id: Option<i32>,
        to_store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    ) -> Result<(), ServiceError> {
        let Some(from_store_id) = from_store_id else {
            return self
                .receive_external_in_txn(txn, to_store_id, product_id, quantity_cases, order_id)
                .await;
        };
        if from_store_id == to_store_id {
            return Err(ServiceError::ValidationError(
                "Transfer source and destination stores must differ".to_string(),
            ));
        }

        if (from_store_id, product_id) <= (to_store_id, product_id) {
            self.transfer_out(txn, from_store_id, product_id, quantity_cases)
                .await?;
            self.transfer_in(txn, to_store_id, product_id, quantity_cases)
                .await?;
        } else {
            self.transfer_in(txn, to_store_id, product_id, quantity_cases)
                .await?;
            self.transfer_out(txn, from_store_id, product_id, quantity_cases)
                .await?;
        }
        info!(
            from_store_id,
            to_store_id, product_id, quantity_cases, order_id, "Transferred inventory"
        );
        Ok(())
    }

    async fn transfer_out(
        &self,
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let record = Self::require_record(txn, store_id, product_id).await?;
        let (new_quantity, stock_clamped) = clamped_sub(record.quantity_cases, quantity_cases);
        let (new_reserved, reserved_clamped) = clamped_sub(record.reserved_cases, quantity_cases);
        if stock_clamped || reserved_clamped {
            if cfg!(debug_assertions) {
                return Err(ServiceError::InvariantViolation(format!(
                    "Outbound transfer of {} cases exceeds stock {} / reserved {} for product {} at store {}",
                    quantity_cases,
                    record.quantity_cases,
                    record.reserved_cases,
                    product_id,
                    store_id
                )));
            }
            error!(
                store_id,
                product_id,
                requested = quantity_cases,
                quantity = record.quantity_cases,
                reserved = record.reserved_cases,
                "Outbound transfer exceeds recorded stock, clamping at zero"
            );
        }
        apply_guarded(txn, &record, new_quantity, new_reserved).await
    }

    async fn transfer_in(
        &self,
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let existing = Inventory::find()
            .filter(inventory::Column::StoreId.eq(store_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        match existing {
            Some(record) => {
                apply_guarded(
                    txn,
                    &record,
                    record.quantity_cases + quantity_cases,
                    record.reserved_cases,
                )
                .await
            }
            None => inventory::ActiveModel {
                product_id: Set(product_id),
                store_id: Set(store_id),
                quantity_cases: Set(quantity_cases),
                reserved_cases: Set(0),
                last_updated: Set(Utc::now()),
                version: Set(1),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(|e| {
                map_unique_violation(
                    e,
                    ServiceError::ConcurrencyError(format!(
                        "Inventory row for product {} at store {} was created concurrently",
                        product_id, store_id
                    )),
                )
            }),
        }
    }

    /// External receipt: stock arrives from outside the store network, so a
    /// single destination row gains the cases and sheds the inbound
    /// reservation taken at approval time.
    async fn receive_external_in_txn(
        &self,
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    ) -> Result<(), ServiceError> {
        let record = Self::require_record(txn, store_id, product_id).await?;
        let (new_reserved, clamped) = clamped_sub(record.reserved_cases, quantity_cases);
        if clamped {
            if cfg!(debug_assertions) {
                return Err(ServiceError::InvariantViolation(format!(
                    "External receipt of {} cases exceeds the {} reserved for product {} at store {}",
                    quantity_cases, record.reserved_cases, product_id, store_id
                )));
            }
            error!(
                store_id,
                product_id,
                requested = quantity_cases,
                reserved = record.reserved_cases,
                "External receipt exceeds reserved cases, clamping at zero"
            );
        }
        apply_guarded(
            txn,
            &record,
            record.quantity_cases + quantity_cases,
            new_reserved,
        )
        .await?;
        info!(
            store_id,
            product_id, quantity_cases, order_id, "Received external inventory"
        );
        Ok(())
    }

    async fn require_record(
        txn: &DatabaseTransaction,
        store_id: i32,
        product_id: i32,
    ) -> Result<inventory::Model, ServiceError> {
        Inventory::find()
            .filter(inventory::Column::StoreId.eq(store_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "Inventory for product {} at store {}",
                    product_id, store_id
                ))
            })
    }

    /// Administrative correction of one ledger row to absolute values.
    /// Runs in its own transaction with bounded retry around transient
    /// conflicts; `expected_version` mismatches surface immediately so the
    /// caller can re-read and decide again.
    #[instrument(skip(self, patch))]
    pub async fn adjust_direct(
        &self,
        id: i32,
        patch: InventoryPatch,
    ) -> Result<inventory::Model, ServiceError> {
        if patch.quantity_cases.is_none() && patch.reserved_cases.is_none() {
            return Err(ServiceError::ValidationError(
                "At least one of quantity_cases or reserved_cases must be provided".to_string(),
            ));
        }

        let db = self.db_pool.clone();
        let (before, after) = retry_with_backoff(
            &self.retry_policy,
            "adjust inventory",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                let patch = patch.clone();
                async move {
                    let txn = db.begin().await.map_err(|e| {
                        error!("Failed to begin transaction: {}", e);
                        ServiceError::DatabaseError(e)
                    })?;

                    let record = Inventory::find_by_id(id)
                        .one(&txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::not_found(format!("Inventory record {}", id))
                        })?;

                    if let Some(expected) = patch.expected_version {
                        if record.version != expected {
                            return Err(ServiceError::VersionConflict(format!(
                                "Inventory record {} is at version {}, expected {}",
                                id, record.version, expected
                            )));
                        }
                    }

                    let new_quantity = patch.quantity_cases.unwrap_or(record.quantity_cases);
                    let new_reserved = patch.reserved_cases.unwrap_or(record.reserved_cases);
                    if new_quantity < 0 || new_reserved < 0 {
                        return Err(ServiceError::ValidationError(
                            "Case counts cannot be negative".to_string(),
                        ));
                    }
                    if new_reserved > new_quantity {
                        return Err(ServiceError::ValidationError(format!(
                            "reserved_cases ({}) cannot exceed quantity_cases ({})",
                            new_reserved, new_quantity
                        )));
                    }

                    let updated = apply_guarded(&txn, &record, new_quantity, new_reserved).await?;
                    txn.commit().await.map_err(|e| {
                        error!("Failed to commit transaction: {}", e);
                        ServiceError::DatabaseError(e)
                    })?;
                    Ok((record, updated))
                }
            },
        )
        .await?;

        info!(
            inventory_id = id,
            quantity_cases = after.quantity_cases,
            reserved_cases = after.reserved_cases,
            version = after.version,
            "Adjusted inventory record"
        );

        if let Some(event_sender) = &self.event_sender {
            if before.quantity_cases != after.quantity_cases {
                if let Err(e) = event_sender
                    .send(Event::InventoryAdjusted {
                        store_id: after.store_id,
                        product_id: after.product_id,
                        old_quantity: before.quantity_cases,
                        new_quantity: after.quantity_cases,
                    })
                    .await
                {
                    warn!(error = %e, inventory_id = id, "Failed to send inventory adjusted event");
                }
            }
            let threshold = self.low_stock_alert_threshold;
            if after.available() <= threshold && before.available() > threshold {
                if let Err(e) = event_sender
                    .send(Event::LowStockDetected {
                        store_id: after.store_id,
                        product_id: after.product_id,
                        available_cases: after.available(),
                        threshold,
                    })
                    .await
                {
                    warn!(error = %e, inventory_id = id, "Failed to send low stock event");
                }
            }
        }

        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn record(quantity: i32, reserved: i32) -> inventory::Model {
        inventory::Model {
            id: 1,
            product_id: 7,
            store_id: 3,
            quantity_cases: quantity,
            reserved_cases: reserved,
            last_updated: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn reserve_consumes_available_balance_exactly() {
        assert_eq!(checked_reserve(10, 4, 6), Some(10));
        assert_eq!(checked_reserve(10, 4, 7), None);
        assert_eq!(checked_reserve(10, 10, 1), None);
        assert_eq!(checked_reserve(10, 0, 0), Some(0));
    }

    #[test]
    fn release_clamps_and_reports() {
        assert_eq!(clamped_sub(5, 3), (2, false));
        assert_eq!(clamped_sub(5, 5), (0, false));
        assert_eq!(clamped_sub(5, 6), (0, true));
        assert_eq!(clamped_sub(0, 1), (0, true));
    }

    #[test]
    fn row_value_is_cases_times_unit_price() {
        let product = product::Model {
            id: 7,
            product_name: "Cola Classic".to_string(),
            brand: "Fizz Co".to_string(),
            category: "Soda".to_string(),
            package_size: "24x330ml".to_string(),
            unit_price: dec!(12.50),
            created_at: Utc::now(),
        };
        let store = store::Model {
            id: 3,
            store_name: "Downtown".to_string(),
            store_code: "ST003".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            region: "Midwest".to_string(),
            store_type: "Urban".to_string(),
            created_at: Utc::now(),
        };

        let row = compose_row(record(8, 3), &product, &store);
        assert_eq!(row.total_value, dec!(100.00));
        assert_eq!(row.available_cases, 5);
        assert_eq!(row.store_name, "Downtown");
        assert_eq!(row.category, "Soda");
    }

    proptest! {
        #[test]
        fn reserve_never_overcommits(
            quantity in 0..10_000i32,
            reserved_seed in 0..10_000i32,
            requested in 0..10_000i32,
        ) {
            let reserved = reserved_seed.min(quantity);
            match checked_reserve(quantity, reserved, requested) {
                Some(new_reserved) => {
                    prop_assert!(new_reserved <= quantity);
                    prop_assert_eq!(new_reserved, reserved + requested);
                }
                None => prop_assert!(requested > quantity - reserved),
            }
        }

        #[test]
        fn release_never_goes_negative(reserved in 0..10_000i32, delta in 0..20_000i32) {
            let (new_reserved, clamped) = clamped_sub(reserved, delta);
            prop_assert!(new_reserved >= 0);
            prop_assert_eq!(clamped, delta > reserved);
            if !clamped {
                prop_assert_eq!(new_reserved, reserved - delta);
            }
        }

        #[test]
        fn outbound_clamp_preserves_reserved_within_quantity(
            quantity in 0..10_000i32,
            reserved_seed in 0..10_000i32,
            delta in 0..20_000i32,
        ) {
            let reserved = reserved_seed.min(quantity);
            let (new_quantity, _) = clamped_sub(quantity, delta);
            let (new_reserved, _) = clamped_sub(reserved, delta);
            prop_assert!(new_reserved <= new_quantity);
        }
    }
}

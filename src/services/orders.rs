/*!
 * Order service: the replenishment order state machine.
 *
 * Transitions and their ledger bookkeeping always share one transaction.
 * Approval reserves stock at the supplying store (or at the destination for
 * externally supplied orders), fulfillment turns the reservation into a
 * physical movement, cancellation of an approved order hands the
 * reservation back. Order rows are written with version-guarded updates;
 * transient store conflicts retry within a bounded budget.
 */

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::counter::{self, Entity as Counters, ORDER_NUMBER_COUNTER};
use crate::entities::order::{self, Entity as Orders, OrderStatus};
use crate::entities::product::{self, Entity as Products};
use crate::entities::store::{self, Entity as Stores};
use crate::entities::user::{self, Entity as Users};
use crate::errors::{map_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::services::inventory::InventoryService;
use crate::PaginatedResponse;

/// Review window: pending orders older than this many days have busted
/// their SLA.
pub const DEFAULT_SLA_REVIEW_DAYS: i64 = 2;

/// Trailing window for the status summary when no explicit range is given.
pub const DEFAULT_SUMMARY_WINDOW_DAYS: i64 = 30;

/// Creation input. `from_store_id` is None for externally supplied orders;
/// `order_number` is normally left blank and drawn from the counter.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub to_store_id: i32,
    pub product_id: i32,
    pub quantity_cases: i32,
    pub requested_by: i32,
    pub from_store_id: Option<i32>,
    pub notes: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub order_number: Option<String>,
}

/// Caller-visible field updates while an order is still open.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderPatch {
    pub quantity_cases: Option<i32>,
    pub notes: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    /// Destination store's region.
    pub region: Option<String>,
    pub category: Option<String>,
    pub status: Option<OrderStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Historical cutoff: only orders with order_date on or before the end
    /// of this day are visible.
    pub as_of_date: Option<NaiveDate>,
    pub expired_sla_only: bool,
}

/// Order joined with store, product and user reference data.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderRow {
    pub id: i32,
    pub order_number: String,
    pub from_store_id: Option<i32>,
    pub from_store_name: Option<String>,
    pub to_store_id: i32,
    pub to_store_name: String,
    pub region: String,
    pub product_id: i32,
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub quantity_cases: i32,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub order_status: String,
    pub requested_by: i32,
    pub requester_name: String,
    pub approved_by: Option<i32>,
    pub approver_name: Option<String>,
    pub order_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub fulfilled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub version: i32,
}

/// One line of the status summary.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
    pub total_cases: i64,
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First instant after the given day; `order_date < end_of_day_exclusive(d)`
/// is the "on or before day d" test.
pub(crate) fn end_of_day_exclusive(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1)
}

fn cancellation_notes(existing: Option<&str>, reason: &str) -> String {
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{}\nCancelled: {}", notes, reason),
        _ => format!("Cancelled: {}", reason),
    }
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    inventory: InventoryService,
    event_sender: Option<Arc<EventSender>>,
    retry_policy: RetryPolicy,
    sla_review_days: i64,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        inventory: InventoryService,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            inventory,
            event_sender,
            retry_policy: RetryPolicy::default(),
            sla_review_days: DEFAULT_SLA_REVIEW_DAYS,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_sla_review_days(mut self, days: i64) -> Self {
        self.sla_review_days = days.max(0);
        self
    }

    /// Creates an order in pending_review. When no order number is supplied
    /// one is drawn from the counter inside the creation transaction; a
    /// collision on a generated number retries the whole creation with a
    /// fresh candidate, a collision on a caller-supplied number is the
    /// caller's mistake.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewOrder) -> Result<order::Model, ServiceError> {
        if input.quantity_cases <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity_cases must be positive".to_string(),
            ));
        }
        if input.from_store_id == Some(input.to_store_id) {
            return Err(ServiceError::ValidationError(
                "Source and destination stores must differ".to_string(),
            ));
        }
        if let Some(number) = input.order_number.as_deref() {
            if number.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "order_number cannot be blank".to_string(),
                ));
            }
        }

        let db = self.db_pool.clone();
        let created = retry_with_backoff(
            &self.retry_policy,
            "create order",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                let input = input.clone();
                async move { Self::try_create(&db, input).await }
            },
        )
        .await?;

        info!(
            order_id = created.id,
            order_number = %created.order_number,
            to_store_id = created.to_store_id,
            product_id = created.product_id,
            quantity_cases = created.quantity_cases,
            "Created order"
        );
        self.emit(
            Event::OrderCreated {
                order_id: created.id,
                order_number: created.order_number.clone(),
                to_store_id: created.to_store_id,
                product_id: created.product_id,
                quantity_cases: created.quantity_cases,
            },
            "order created",
        )
        .await;

        Ok(created)
    }

    async fn try_create(db: &DbPool, input: NewOrder) -> Result<order::Model, ServiceError> {
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        if Stores::find_by_id(input.to_store_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "Destination store {} does not exist",
                input.to_store_id
            )));
        }
        if let Some(from_store_id) = input.from_store_id {
            if Stores::find_by_id(from_store_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .is_none()
            {
                return Err(ServiceError::ValidationError(format!(
                    "Source store {} does not exist",
                    from_store_id
                )));
            }
        }
        if Products::find_by_id(input.product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "Product {} does not exist",
                input.product_id
            )));
        }
        if Users::find_by_id(input.requested_by)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "Requesting user {} does not exist",
                input.requested_by
            )));
        }

        let (order_number, generated) = match input.order_number.as_deref() {
            Some(number) => (number.trim().to_string(), false),
            None => (Self::next_order_number(&txn).await?, true),
        };

        let now = Utc::now();
        let created = order::ActiveModel {
            order_number: Set(order_number.clone()),
            from_store_id: Set(input.from_store_id),
            to_store_id: Set(input.to_store_id),
            product_id: Set(input.product_id),
            quantity_cases: Set(input.quantity_cases),
            order_status: Set(OrderStatus::PendingReview.as_str().to_string()),
            requested_by: Set(input.requested_by),
            approved_by: Set(None),
            order_date: Set(input.order_date.unwrap_or(now)),
            approved_date: Set(None),
            fulfilled_date: Set(None),
            notes: Set(input.notes),
            version: Set(1),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            let conflict = if generated {
                ServiceError::ConcurrencyError(format!(
                    "Order number {} was taken concurrently",
                    order_number
                ))
            } else {
                ServiceError::ValidationError(format!(
                    "Order number {} is already in use",
                    order_number
                ))
            };
            map_unique_violation(e, conflict)
        })?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        Ok(created)
    }

    /// Atomic increment-and-return on the order-number counter. The guarded
    /// update loses against a concurrent creation, which the retry wrapper
    /// turns into a fresh attempt with a fresh candidate.
    async fn next_order_number(txn: &DatabaseTransaction) -> Result<String, ServiceError> {
        let row = Counters::find_by_id(ORDER_NUMBER_COUNTER)
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Counter {} has not been seeded",
                    ORDER_NUMBER_COUNTER
                ))
            })?;
        let next = row.value + 1;

        let result = Counters::update_many()
            .col_expr(counter::Column::Value, Expr::value(next))
            .filter(counter::Column::Name.eq(ORDER_NUMBER_COUNTER))
            .filter(counter::Column::Value.eq(row.value))
            .exec(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrencyError(
                "Order number counter was advanced concurrently".to_string(),
            ));
        }

        Ok(format!("ORD{:06}", next))
    }

    /// pending_review -> approved. Reserves the order's cases at the
    /// reservation store in the same transaction; on insufficient stock the
    /// order stays untouched in pending_review.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        order_id: i32,
        approved_by: i32,
        expected_version: Option<i32>,
    ) -> Result<order::Model, ServiceError> {
        let db = self.db_pool.clone();
        let (updated, old_status) = retry_with_backoff(
            &self.retry_policy,
            "approve order",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                async move {
                    self.try_approve(&db, order_id, approved_by, expected_version)
                        .await
                }
            },
        )
        .await?;

        info!(
            order_id = updated.id,
            order_number = %updated.order_number,
            approved_by,
            "Approved order"
        );
        self.emit(
            Event::OrderStatusChanged {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                old_status: old_status.to_string(),
                new_status: OrderStatus::Approved.to_string(),
            },
            "order status",
        )
        .await;
        self.emit(
            Event::InventoryReserved {
                store_id: updated.reservation_store_id(),
                product_id: updated.product_id,
                quantity_cases: updated.quantity_cases,
                order_id: updated.id,
            },
            "inventory reserved",
        )
        .await;

        Ok(updated)
    }

    async fn try_approve(
        &self,
        db: &DbPool,
        order_id: i32,
        approved_by: i32,
        expected_version: Option<i32>,
    ) -> Result<(order::Model, OrderStatus), ServiceError> {
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let record = Self::require_order(&txn, order_id).await?;
        let current = Self::current_status(&record)?;
        Self::check_expected_version(&record, expected_version)?;
        if !current.can_transition_to(OrderStatus::Approved) {
            return Err(ServiceError::invalid_transition(
                current,
                OrderStatus::Approved,
            ));
        }
        if Users::find_by_id(approved_by)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "Approving user {} does not exist",
                approved_by
            )));
        }

        let now = Utc::now();
        let update = Orders::update_many()
            .col_expr(
                order::Column::OrderStatus,
                Expr::value(OrderStatus::Approved.as_str()),
            )
            .col_expr(order::Column::ApprovedBy, Expr::value(approved_by))
            .col_expr(order::Column::ApprovedDate, Expr::value(now));
        Self::commit_guarded(&txn, &record, update).await?;

        self.inventory
            .reserve_in_txn(
                &txn,
                record.reservation_store_id(),
                record.product_id,
                record.quantity_cases,
                record.id,
            )
            .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let updated = order::Model {
            order_status: OrderStatus::Approved.as_str().to_string(),
            approved_by: Some(approved_by),
            approved_date: Some(now),
            version: record.version + 1,
            ..record
        };
        Ok((updated, current))
    }

    /// approved -> fulfilled. Moves the physical stock between the stores
    /// (or books an external receipt) in the same transaction.
    #[instrument(skip(self))]
    pub async fn fulfill(
        &self,
        order_id: i32,
        expected_version: Option<i32>,
    ) -> Result<order::Model, ServiceError> {
        let db = self.db_pool.clone();
        let (updated, old_status) = retry_with_backoff(
            &self.retry_policy,
            "fulfill order",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                async move { self.try_fulfill(&db, order_id, expected_version).await }
            },
        )
        .await?;

        info!(
            order_id = updated.id,
            order_number = %updated.order_number,
            "Fulfilled order"
        );
        self.emit(
            Event::OrderStatusChanged {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                old_status: old_status.to_string(),
                new_status: OrderStatus::Fulfilled.to_string(),
            },
            "order status",
        )
        .await;
        let movement = match updated.from_store_id {
            Some(from_store_id) => Event::InventoryTransferred {
                from_store_id,
                to_store_id: updated.to_store_id,
                product_id: updated.product_id,
                quantity_cases: updated.quantity_cases,
                order_id: updated.id,
            },
            None => Event::InventoryReceived {
                store_id: updated.to_store_id,
                product_id: updated.product_id,
                quantity_cases: updated.quantity_cases,
                order_id: updated.id,
            },
        };
        self.emit(movement, "inventory movement").await;

        Ok(updated)
    }

    async fn try_fulfill(
        &self,
        db: &DbPool,
        order_id: i32,
        expected_version: Option<i32>,
    ) -> Result<(order::Model, OrderStatus), ServiceError> {
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let record = Self::require_order(&txn, order_id).await?;
        let current = Self::current_status(&record)?;
        Self::check_expected_version(&record, expected_version)?;
        if !current.can_transition_to(OrderStatus::Fulfilled) {
            return Err(ServiceError::invalid_transition(
                current,
                OrderStatus::Fulfilled,
            ));
        }

        let now = Utc::now();
        let update = Orders::update_many()
            .col_expr(
                order::Column::OrderStatus,
                Expr::value(OrderStatus::Fulfilled.as_str()),
            )
            .col_expr(order::Column::FulfilledDate, Expr::value(now));
        Self::commit_guarded(&txn, &record, update).await?;

        self.inventory
            .transfer_in_txn(
                &txn,
                record.from_store_id,
                record.to_store_id,
                record.product_id,
                record.quantity_cases,
                record.id,
            )
            .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let updated = order::Model {
            order_status: OrderStatus::Fulfilled.as_str().to_string(),
            fulfilled_date: Some(now),
            version: record.version + 1,
            ..record
        };
        Ok((updated, current))
    }

    /// Cancels a pending or approved order, recording the reason in the
    /// notes. Cancelling an approved order releases its reservation in the
    /// same transaction.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: i32, reason: &str) -> Result<order::Model, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cancellation reason is required".to_string(),
            ));
        }

        let db = self.db_pool.clone();
        let (updated, old_status) = retry_with_backoff(
            &self.retry_policy,
            "cancel order",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                async move { self.try_cancel(&db, order_id, reason).await }
            },
        )
        .await?;

        info!(
            order_id = updated.id,
            order_number = %updated.order_number,
            reason,
            "Cancelled order"
        );
        self.emit(
            Event::OrderCancelled {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                reason: reason.to_string(),
            },
            "order cancelled",
        )
        .await;
        if old_status == OrderStatus::Approved {
            self.emit(
                Event::InventoryReleased {
                    store_id: updated.reservation_store_id(),
                    product_id: updated.product_id,
                    quantity_cases: updated.quantity_cases,
                    order_id: updated.id,
                },
                "inventory released",
            )
            .await;
        }

        Ok(updated)
    }

    async fn try_cancel(
        &self,
        db: &DbPool,
        order_id: i32,
        reason: &str,
    ) -> Result<(order::Model, OrderStatus), ServiceError> {
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let record = Self::require_order(&txn, order_id).await?;
        let current = Self::current_status(&record)?;
        if !current.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::invalid_transition(
                current,
                OrderStatus::Cancelled,
            ));
        }

        let notes = cancellation_notes(record.notes.as_deref(), reason);
        let update = Orders::update_many()
            .col_expr(
                order::Column::OrderStatus,
                Expr::value(OrderStatus::Cancelled.as_str()),
            )
            .col_expr(order::Column::Notes, Expr::value(notes.clone()));
        Self::commit_guarded(&txn, &record, update).await?;

        if current == OrderStatus::Approved {
            self.inventory
                .release_in_txn(
                    &txn,
                    record.reservation_store_id(),
                    record.product_id,
                    record.quantity_cases,
                    record.id,
                )
                .await?;
        }

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let updated = order::Model {
            order_status: OrderStatus::Cancelled.as_str().to_string(),
            notes: Some(notes),
            version: record.version + 1,
            ..record
        };
        Ok((updated, current))
    }

    /// Updates quantity and/or notes while the order is still open. A
    /// quantity change on an approved order adjusts the reservation by the
    /// net delta in the same transaction; if the extra cases cannot be
    /// reserved nothing changes.
    #[instrument(skip(self, patch))]
    pub async fn update_fields(
        &self,
        order_id: i32,
        patch: OrderPatch,
    ) -> Result<order::Model, ServiceError> {
        if patch.quantity_cases.is_none() && patch.notes.is_none() {
            return Err(ServiceError::ValidationError(
                "At least one of quantity_cases or notes must be provided".to_string(),
            ));
        }
        if let Some(quantity) = patch.quantity_cases {
            if quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "quantity_cases must be positive".to_string(),
                ));
            }
        }

        let db = self.db_pool.clone();
        let updated = retry_with_backoff(
            &self.retry_policy,
            "update order fields",
            ServiceError::is_transient,
            || {
                let db = db.clone();
                let patch = patch.clone();
                async move { self.try_update_fields(&db, order_id, patch).await }
            },
        )
        .await?;

        info!(
            order_id = updated.id,
            order_number = %updated.order_number,
            quantity_cases = updated.quantity_cases,
            "Updated order fields"
        );
        self.emit(
            Event::OrderFieldsUpdated {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
            },
            "order fields updated",
        )
        .await;

        Ok(updated)
    }

    async fn try_update_fields(
        &self,
        db: &DbPool,
        order_id: i32,
        patch: OrderPatch,
    ) -> Result<order::Model, ServiceError> {
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let record = Self::require_order(&txn, order_id).await?;
        let current = Self::current_status(&record)?;
        Self::check_expected_version(&record, patch.expected_version)?;
        if current.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "Order {} is {} and can no longer be modified",
                record.order_number, current
            )));
        }

        let new_quantity = patch.quantity_cases.unwrap_or(record.quantity_cases);
        let mut update = Orders::update_many();
        if patch.quantity_cases.is_some() {
            update = update.col_expr(order::Column::QuantityCases, Expr::value(new_quantity));
        }
        if let Some(notes) = patch.notes.as_deref() {
            update = update.col_expr(order::Column::Notes, Expr::value(notes));
        }
        Self::commit_guarded(&txn, &record, update).await?;

        let delta = new_quantity - record.quantity_cases;
        if current == OrderStatus::Approved && delta != 0 {
            let store_id = record.reservation_store_id();
            if delta > 0 {
                self.inventory
                    .reserve_in_txn(&txn, store_id, record.product_id, delta, record.id)
                    .await?;
            } else {
                self.inventory
                    .release_in_txn(&txn, store_id, record.product_id, -delta, record.id)
                    .await?;
            }
        }

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        Ok(order::Model {
            quantity_cases: new_quantity,
            notes: patch.notes.or(record.notes.clone()),
            version: record.version + 1,
            ..record
        })
    }

    /// Looks an order up by numeric id or by order number.
    #[instrument(skip(self))]
    pub async fn resolve_reference(&self, reference: &str) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = if let Ok(id) = reference.parse::<i32>() {
            Orders::find_by_id(id).one(db).await
        } else {
            Orders::find()
                .filter(order::Column::OrderNumber.eq(reference))
                .one(db)
                .await
        };
        found
            .map_err(|e| {
                error!("Failed to fetch order {}: {}", reference, e);
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::not_found(format!("Order {}", reference)))
    }

    /// Joined detail view, addressable by id or order number.
    #[instrument(skip(self))]
    pub async fn get_row(&self, reference: &str) -> Result<OrderRow, ServiceError> {
        let record = self.resolve_reference(reference).await?;
        let rows = self.compose_rows(vec![record]).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(format!("Order {}", reference)))
    }

    /// Lists orders newest first with the joined display fields.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &OrderFilters,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<OrderRow>, ServiceError> {
        let db = &*self.db_pool;
        let paginator = self
            .filtered(filters)
            .order_by_desc(order::Column::OrderDate)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count orders: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let records = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!("Failed to fetch order page {}: {}", page, e);
                ServiceError::DatabaseError(e)
            })?;

        let items = self.compose_rows(records).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    /// Per-status order count and case volume, busiest status first.
    /// Without an explicit range the summary covers the trailing thirty
    /// days.
    #[instrument(skip(self))]
    pub async fn status_summary(
        &self,
        filters: &OrderFilters,
    ) -> Result<Vec<StatusCount>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = self.filtered(filters);
        let explicit_window = filters.date_from.is_some()
            || filters.date_to.is_some()
            || filters.as_of_date.is_some();
        if !explicit_window {
            let cutoff = Utc::now() - Duration::days(DEFAULT_SUMMARY_WINDOW_DAYS);
            query = query.filter(order::Column::OrderDate.gte(cutoff));
        }

        let records = query.all(db).await.map_err(|e| {
            error!("Failed to summarize orders: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut by_status: HashMap<String, (i64, i64)> = HashMap::new();
        for record in records {
            let entry = by_status.entry(record.order_status).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.quantity_cases as i64;
        }

        let mut summary: Vec<StatusCount> = by_status
            .into_iter()
            .map(|(status, (count, total_cases))| StatusCount {
                status,
                count,
                total_cases,
            })
            .collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
        Ok(summary)
    }

    fn filtered(&self, filters: &OrderFilters) -> Select<Orders> {
        let mut query = Orders::find()
            .join(JoinType::InnerJoin, order::Relation::ToStore.def())
            .join(JoinType::InnerJoin, order::Relation::Product.def());

        if let Some(region) = filters.region.as_deref() {
            query = query.filter(store::Column::Region.eq(region));
        }
        if let Some(category) = filters.category.as_deref() {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(status) = filters.status {
            query = query.filter(order::Column::OrderStatus.eq(status.as_str()));
        }
        if let Some(from) = filters.date_from {
            query = query.filter(order::Column::OrderDate.gte(start_of_day(from)));
        }
        if let Some(to) = filters.date_to {
            query = query.filter(order::Column::OrderDate.lt(end_of_day_exclusive(to)));
        }
        if let Some(as_of) = filters.as_of_date {
            query = query.filter(order::Column::OrderDate.lt(end_of_day_exclusive(as_of)));
        }
        if filters.expired_sla_only {
            let reference = filters
                .as_of_date
                .map(end_of_day_exclusive)
                .unwrap_or_else(Utc::now);
            let cutoff = reference - Duration::days(self.sla_review_days);
            query = query
                .filter(order::Column::OrderStatus.eq(OrderStatus::PendingReview.as_str()))
                .filter(order::Column::OrderDate.lt(cutoff));
        }
        query
    }

    async fn compose_rows(
        &self,
        records: Vec<order::Model>,
    ) -> Result<Vec<OrderRow>, ServiceError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let db = &*self.db_pool;

        let mut store_ids: Vec<i32> = records.iter().map(|r| r.to_store_id).collect();
        store_ids.extend(records.iter().filter_map(|r| r.from_store_id));
        let product_ids: Vec<i32> = records.iter().map(|r| r.product_id).collect();
        let mut user_ids: Vec<i32> = records.iter().map(|r| r.requested_by).collect();
        user_ids.extend(records.iter().filter_map(|r| r.approved_by));

        let stores: HashMap<i32, store::Model> = Stores::find()
            .filter(store::Column::Id.is_in(store_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let products: HashMap<i32, product::Model> = Products::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let users: HashMap<i32, user::Model> = Users::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let to_store = stores.get(&record.to_store_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Store {} referenced by order {} does not exist",
                    record.to_store_id, record.id
                ))
            })?;
            let product = products.get(&record.product_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Product {} referenced by order {} does not exist",
                    record.product_id, record.id
                ))
            })?;
            let requester = users.get(&record.requested_by).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "User {} referenced by order {} does not exist",
                    record.requested_by, record.id
                ))
            })?;

            let from_store_name = record
                .from_store_id
                .and_then(|id| stores.get(&id))
                .map(|s| s.store_name.clone());
            let approver_name = record
                .approved_by
                .and_then(|id| users.get(&id))
                .map(|u| u.display_name());

            rows.push(OrderRow {
                id: record.id,
                order_number: record.order_number.clone(),
                from_store_id: record.from_store_id,
                from_store_name,
                to_store_id: record.to_store_id,
                to_store_name: to_store.store_name.clone(),
                region: to_store.region.clone(),
                product_id: record.product_id,
                product_name: product.product_name.clone(),
                brand: product.brand.clone(),
                category: product.category.clone(),
                quantity_cases: record.quantity_cases,
                unit_price: product.unit_price,
                total_value: Decimal::from(record.quantity_cases) * product.unit_price,
                order_status: record.order_status.clone(),
                requested_by: record.requested_by,
                requester_name: requester.display_name(),
                approved_by: record.approved_by,
                approver_name,
                order_date: record.order_date,
                approved_date: record.approved_date,
                fulfilled_date: record.fulfilled_date,
                notes: record.notes.clone(),
                version: record.version,
            });
        }
        Ok(rows)
    }

    /// Version-guarded write of the order row; losing the guard means a
    /// concurrent writer advanced the row first.
    async fn commit_guarded(
        txn: &DatabaseTransaction,
        record: &order::Model,
        update: sea_orm::UpdateMany<Orders>,
    ) -> Result<(), ServiceError> {
        let result = update
            .col_expr(order::Column::Version, Expr::value(record.version + 1))
            .filter(order::Column::Id.eq(record.id))
            .filter(order::Column::Version.eq(record.version))
            .exec(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::VersionConflict(format!(
                "Order {} was modified concurrently",
                record.id
            )));
        }
        Ok(())
    }

    async fn require_order(
        txn: &DatabaseTransaction,
        order_id: i32,
    ) -> Result<order::Model, ServiceError> {
        Orders::find_by_id(order_id)
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::not_found(format!("Order {}", order_id)))
    }

    fn current_status(record: &order::Model) -> Result<OrderStatus, ServiceError> {
        record.status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Order {} carries unknown status {}",
                record.id, record.order_status
            ))
        })
    }

    fn check_expected_version(
        record: &order::Model,
        expected: Option<i32>,
    ) -> Result<(), ServiceError> {
        if let Some(expected) = expected {
            if record.version != expected {
                return Err(ServiceError::VersionConflict(format!(
                    "Order {} is at version {}, expected {}",
                    record.id, record.version, expected
                )));
            }
        }
        Ok(())
    }

    async fn emit(&self, event: Event, what: &str) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send {} event", what);
            }
        }
    }
}

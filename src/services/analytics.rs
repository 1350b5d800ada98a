/*!
 * Read-only aggregates for the dashboard: KPIs, trend series, category and
 * region breakdowns, low-stock alerts, SLA tracking and the demand
 * forecast. Everything here tolerates an empty database and answers with
 * zeros or empty lists rather than errors.
 */

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select,
};
use serde::Serialize;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::inventory::{self, Entity as Inventory};
use crate::entities::order::{self, Entity as Orders, OrderStatus};
use crate::entities::product::{self, Entity as Products};
use crate::entities::store::{self, Entity as Stores};
use crate::errors::ServiceError;
use crate::services::inventory::DEFAULT_LOW_STOCK_ALERT_THRESHOLD;
use crate::services::orders::{end_of_day_exclusive, start_of_day, DEFAULT_SLA_REVIEW_DAYS};

pub const DEFAULT_TREND_WINDOW_DAYS: i64 = 30;
pub const MAX_TREND_WINDOW_DAYS: i64 = 365;

/// History window feeding the demand forecast: four full weeks, so every
/// weekday contributes the same number of samples.
pub const FORECAST_WINDOW_DAYS: u32 = 28;
pub const DEFAULT_FORECAST_HORIZON_DAYS: u32 = 14;
pub const MAX_FORECAST_HORIZON_DAYS: u32 = 90;

#[derive(Debug, Serialize, ToSchema)]
pub struct Kpis {
    pub total_inventory_value: Decimal,
    pub total_products: i64,
    pub total_stores: i64,
    pub low_stock_alerts: i64,
    pub pending_review_orders: i64,
    pub fulfilled_last_30_days: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryTrendPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub total_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTrendPoint {
    pub date: NaiveDate,
    pub order_count: i64,
    pub total_cases: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrendSeries {
    pub window_days: i64,
    pub inventory: Vec<InventoryTrendPoint>,
    pub orders: Vec<OrderTrendPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySlice {
    pub category: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionSlice {
    pub region: String,
    pub order_count: i64,
    pub total_cases: i64,
    pub percentage: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockAlert {
    pub inventory_id: i32,
    pub store_id: i32,
    pub store_name: String,
    pub product_id: i32,
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub quantity_cases: i32,
    pub reserved_cases: i32,
    pub available_cases: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlaOrder {
    pub id: i32,
    pub order_number: String,
    pub to_store_id: i32,
    pub to_store_name: String,
    pub product_id: i32,
    pub product_name: String,
    pub quantity_cases: i32,
    pub order_date: chrono::DateTime<Utc>,
    pub days_pending: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlaExpiry {
    pub as_of: chrono::DateTime<Utc>,
    pub review_window_days: i64,
    pub expired_count: i64,
    pub orders: Vec<SlaOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_orders: f64,
    pub predicted_cases: f64,
    pub predicted_value: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DemandForecast {
    pub reference_date: NaiveDate,
    pub window_days: u32,
    pub horizon_days: u32,
    pub baseline_daily_orders: f64,
    pub baseline_daily_cases: f64,
    pub baseline_daily_value: f64,
    pub points: Vec<ForecastPoint>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
    low_stock_threshold: i32,
    sla_review_days: i64,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            low_stock_threshold: DEFAULT_LOW_STOCK_ALERT_THRESHOLD,
            sla_review_days: DEFAULT_SLA_REVIEW_DAYS,
        }
    }

    pub fn with_low_stock_threshold(mut self, threshold: i32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_sla_review_days(mut self, days: i64) -> Self {
        self.sla_review_days = days.max(0);
        self
    }

    /// Dashboard headline numbers. Region narrows stores, inventory and
    /// order aggregates; category narrows the product side.
    #[instrument(skip(self))]
    pub async fn kpis(
        &self,
        region: Option<&str>,
        category: Option<&str>,
    ) -> Result<Kpis, ServiceError> {
        let db = &*self.db_pool;

        let records = self
            .filtered_inventory(region, category)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch inventory for KPIs: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;

        let mut total_inventory_value = Decimal::ZERO;
        let mut distinct_products: HashSet<i32> = HashSet::new();
        let mut low_stock_alerts = 0i64;
        for record in &records {
            if let Some(product) = products.get(&record.product_id) {
                total_inventory_value +=
                    Decimal::from(record.quantity_cases) * product.unit_price;
            }
            distinct_products.insert(record.product_id);
            if record.available() <= self.low_stock_threshold {
                low_stock_alerts += 1;
            }
        }

        let mut store_query = Stores::find();
        if let Some(region) = region {
            store_query = store_query.filter(store::Column::Region.eq(region));
        }
        let total_stores = store_query.count(db).await.map_err(|e| {
            error!("Failed to count stores: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let pending_review_orders = self
            .filtered_orders(region, category)
            .filter(order::Column::OrderStatus.eq(OrderStatus::PendingReview.as_str()))
            .count(db)
            .await
            .map_err(|e| {
                error!("Failed to count pending orders: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        let fulfilled_cutoff = Utc::now() - Duration::days(30);
        let fulfilled_last_30_days = self
            .filtered_orders(region, category)
            .filter(order::Column::OrderStatus.eq(OrderStatus::Fulfilled.as_str()))
            .filter(order::Column::FulfilledDate.gte(fulfilled_cutoff))
            .count(db)
            .await
            .map_err(|e| {
                error!("Failed to count fulfilled orders: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        Ok(Kpis {
            total_inventory_value,
            total_products: distinct_products.len() as i64,
            total_stores: total_stores as i64,
            low_stock_alerts,
            pending_review_orders: pending_review_orders as i64,
            fulfilled_last_30_days: fulfilled_last_30_days as i64,
        })
    }

    /// Daily inventory-value and order-volume series over the trailing
    /// window, oldest day first. Days without activity are simply absent.
    #[instrument(skip(self))]
    pub async fn trends(
        &self,
        days: Option<i64>,
        region: Option<&str>,
    ) -> Result<TrendSeries, ServiceError> {
        let db = &*self.db_pool;
        let window_days = days
            .unwrap_or(DEFAULT_TREND_WINDOW_DAYS)
            .clamp(1, MAX_TREND_WINDOW_DAYS);
        let cutoff = Utc::now() - Duration::days(window_days);

        let records = self
            .filtered_inventory(region, None)
            .filter(inventory::Column::LastUpdated.gte(cutoff))
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch inventory trends: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;

        let mut inventory_days: BTreeMap<NaiveDate, (Decimal, i64)> = BTreeMap::new();
        for record in &records {
            let day = record.last_updated.date_naive();
            let value = products
                .get(&record.product_id)
                .map(|p| Decimal::from(record.quantity_cases) * p.unit_price)
                .unwrap_or(Decimal::ZERO);
            let entry = inventory_days.entry(day).or_insert((Decimal::ZERO, 0));
            entry.0 += value;
            entry.1 += record.quantity_cases as i64;
        }

        let orders = self
            .filtered_orders(region, None)
            .filter(order::Column::OrderDate.gte(cutoff))
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch order trends: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        let mut order_days: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
        for record in &orders {
            let day = record.order_date.date_naive();
            let entry = order_days.entry(day).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.quantity_cases as i64;
        }

        Ok(TrendSeries {
            window_days,
            inventory: inventory_days
                .into_iter()
                .map(|(date, (total_value, total_quantity))| InventoryTrendPoint {
                    date,
                    total_value,
                    total_quantity,
                })
                .collect(),
            orders: order_days
                .into_iter()
                .map(|(date, (order_count, total_cases))| OrderTrendPoint {
                    date,
                    order_count,
                    total_cases,
                })
                .collect(),
        })
    }

    /// Inventory value split by product category, largest slice first.
    #[instrument(skip(self))]
    pub async fn category_breakdown(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<CategorySlice>, ServiceError> {
        let db = &*self.db_pool;
        let records = self
            .filtered_inventory(region, None)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch inventory for category breakdown: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;

        let mut by_category: HashMap<String, Decimal> = HashMap::new();
        for record in &records {
            if let Some(product) = products.get(&record.product_id) {
                *by_category
                    .entry(product.category.clone())
                    .or_insert(Decimal::ZERO) +=
                    Decimal::from(record.quantity_cases) * product.unit_price;
            }
        }
        let total: Decimal = by_category.values().copied().sum();

        let mut slices: Vec<CategorySlice> = by_category
            .into_iter()
            .map(|(category, value)| CategorySlice {
                category,
                percentage: percentage_of(value, total),
                value,
            })
            .collect();
        slices.sort_by(|a, b| b.value.cmp(&a.value));
        Ok(slices)
    }

    /// Order volume split by destination-store region, busiest region
    /// first.
    #[instrument(skip(self))]
    pub async fn region_breakdown(&self) -> Result<Vec<RegionSlice>, ServiceError> {
        let db = &*self.db_pool;
        let orders = Orders::find().all(db).await.map_err(|e| {
            error!("Failed to fetch orders for region breakdown: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let stores: HashMap<i32, store::Model> = Stores::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut by_region: HashMap<String, (i64, i64)> = HashMap::new();
        for record in &orders {
            let region = stores
                .get(&record.to_store_id)
                .map(|s| s.region.clone())
                .unwrap_or_else(|| "unknown".to_string());
            let entry = by_region.entry(region).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.quantity_cases as i64;
        }
        let total_orders: i64 = by_region.values().map(|(count, _)| count).sum();

        let mut slices: Vec<RegionSlice> = by_region
            .into_iter()
            .map(|(region, (order_count, total_cases))| RegionSlice {
                region,
                order_count,
                total_cases,
                percentage: percentage_of(Decimal::from(order_count), Decimal::from(total_orders)),
            })
            .collect();
        slices.sort_by(|a, b| b.order_count.cmp(&a.order_count));
        Ok(slices)
    }

    /// Ledger rows at or below the alert threshold, most starved first.
    #[instrument(skip(self))]
    pub async fn low_stock_alerts(
        &self,
        region: Option<&str>,
        category: Option<&str>,
        threshold: Option<i32>,
        limit: u64,
    ) -> Result<Vec<LowStockAlert>, ServiceError> {
        let db = &*self.db_pool;
        let threshold = threshold.unwrap_or(self.low_stock_threshold);
        let available = Expr::col(inventory::Column::QuantityCases)
            .sub(Expr::col(inventory::Column::ReservedCases));

        let records = self
            .filtered_inventory(region, category)
            .filter(Expr::expr(available.clone()).lte(threshold))
            .order_by_asc(available)
            .limit(limit)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch low stock alerts: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;
        let stores = self
            .load_stores(records.iter().map(|r| r.store_id).collect())
            .await?;

        let mut alerts = Vec::with_capacity(records.len());
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
            alerts.push(LowStockAlert {
                inventory_id: record.id,
                store_id: record.store_id,
                store_name: store.store_name.clone(),
                product_id: record.product_id,
                product_name: product.product_name.clone(),
                brand: product.brand.clone(),
                category: product.category.clone(),
                quantity_cases: record.quantity_cases,
                reserved_cases: record.reserved_cases,
                available_cases: record.available(),
            });
        }
        Ok(alerts)
    }

    /// Pending orders that have outlived the review window as of the given
    /// day (end of day), or as of now.
    #[instrument(skip(self))]
    pub async fn sla_expiry(&self, as_of: Option<NaiveDate>) -> Result<SlaExpiry, ServiceError> {
        let db = &*self.db_pool;
        let reference = as_of.map(end_of_day_exclusive).unwrap_or_else(Utc::now);
        let cutoff = reference - Duration::days(self.sla_review_days);

        let records = Orders::find()
            .filter(order::Column::OrderStatus.eq(OrderStatus::PendingReview.as_str()))
            .filter(order::Column::OrderDate.lt(cutoff))
            .order_by_asc(order::Column::OrderDate)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch SLA-expired orders: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;
        let stores = self
            .load_stores(records.iter().map(|r| r.to_store_id).collect())
            .await?;

        let orders: Vec<SlaOrder> = records
            .into_iter()
            .map(|record| SlaOrder {
                days_pending: (reference - record.order_date).num_days(),
                to_store_name: stores
                    .get(&record.to_store_id)
                    .map(|s| s.store_name.clone())
                    .unwrap_or_default(),
                product_name: products
                    .get(&record.product_id)
                    .map(|p| p.product_name.clone())
                    .unwrap_or_default(),
                id: record.id,
                order_number: record.order_number,
                to_store_id: record.to_store_id,
                product_id: record.product_id,
                quantity_cases: record.quantity_cases,
                order_date: record.order_date,
            })
            .collect();

        Ok(SlaExpiry {
            as_of: reference,
            review_window_days: self.sla_review_days,
            expired_count: orders.len() as i64,
            orders,
        })
    }

    /// Demand forecast from the trailing four weeks of non-cancelled
    /// orders: a mean baseline with a clamped linear drift, modulated by a
    /// weekly seasonality profile. An empty history yields all zeros.
    #[instrument(skip(self))]
    pub async fn forecast(
        &self,
        horizon_days: Option<u32>,
    ) -> Result<DemandForecast, ServiceError> {
        let db = &*self.db_pool;
        let horizon = horizon_days
            .unwrap_or(DEFAULT_FORECAST_HORIZON_DAYS)
            .clamp(1, MAX_FORECAST_HORIZON_DAYS);
        let reference_date = Utc::now().date_naive();
        let window_start = reference_date - Duration::days(FORECAST_WINDOW_DAYS as i64 - 1);

        let records = Orders::find()
            .filter(order::Column::OrderDate.gte(start_of_day(window_start)))
            .filter(order::Column::OrderDate.lt(end_of_day_exclusive(reference_date)))
            .filter(order::Column::OrderStatus.ne(OrderStatus::Cancelled.as_str()))
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to fetch order history for forecast: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        let products = self
            .load_products(records.iter().map(|r| r.product_id).collect())
            .await?;

        let n = FORECAST_WINDOW_DAYS as usize;
        let mut daily_orders = vec![0.0f64; n];
        let mut daily_cases = vec![0.0f64; n];
        let mut daily_value = vec![0.0f64; n];
        for record in &records {
            let Some(index) = day_index(window_start, record.order_date.date_naive(), n) else {
                continue;
            };
            daily_orders[index] += 1.0;
            daily_cases[index] += record.quantity_cases as f64;
            daily_value[index] += products
                .get(&record.product_id)
                .map(|p| Decimal::from(record.quantity_cases) * p.unit_price)
                .unwrap_or(Decimal::ZERO)
                .to_f64()
                .unwrap_or(0.0);
        }

        let orders_model = SeriesModel::fit(&daily_orders, window_start, horizon);
        let cases_model = SeriesModel::fit(&daily_cases, window_start, horizon);
        let value_model = SeriesModel::fit(&daily_value, window_start, horizon);

        let points = (1..=horizon as i64)
            .map(|d| {
                let date = reference_date + Duration::days(d);
                ForecastPoint {
                    date,
                    predicted_orders: orders_model.predict(d, date),
                    predicted_cases: cases_model.predict(d, date),
                    predicted_value: value_model.predict(d, date),
                }
            })
            .collect();

        Ok(DemandForecast {
            reference_date,
            window_days: FORECAST_WINDOW_DAYS,
            horizon_days: horizon,
            baseline_daily_orders: orders_model.baseline,
            baseline_daily_cases: cases_model.baseline,
            baseline_daily_value: value_model.baseline,
            points,
        })
    }

    fn filtered_inventory(
        &self,
        region: Option<&str>,
        category: Option<&str>,
    ) -> Select<Inventory> {
        let mut query = Inventory::find()
            .join(JoinType::InnerJoin, inventory::Relation::Product.def())
            .join(JoinType::InnerJoin, inventory::Relation::Store.def());
        if let Some(region) = region {
            query = query.filter(store::Column::Region.eq(region));
        }
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }
        query
    }

    fn filtered_orders(&self, region: Option<&str>, category: Option<&str>) -> Select<Orders> {
        let mut query = Orders::find()
            .join(JoinType::InnerJoin, order::Relation::ToStore.def())
            .join(JoinType::InnerJoin, order::Relation::Product.def());
        if let Some(region) = region {
            query = query.filter(store::Column::Region.eq(region));
        }
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }
        query
    }

    async fn load_products(
        &self,
        product_ids: Vec<i32>,
    ) -> Result<HashMap<i32, product::Model>, ServiceError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = &*self.db_pool;
        Ok(Products::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    async fn load_stores(
        &self,
        store_ids: Vec<i32>,
    ) -> Result<HashMap<i32, store::Model>, ServiceError> {
        if store_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = &*self.db_pool;
        Ok(Stores::find()
            .filter(store::Column::Id.is_in(store_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect())
    }
}

fn percentage_of(value: Decimal, total: Decimal) -> Decimal {
    if total > Decimal::ZERO {
        (value * Decimal::from(100) / total).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

/// Bucket index of `when` inside the window starting at `start`, if it
/// falls within the `len` days.
fn day_index(start: NaiveDate, when: NaiveDate, len: usize) -> Option<usize> {
    let offset = (when - start).num_days();
    if offset >= 0 && (offset as usize) < len {
        Some(offset as usize)
    } else {
        None
    }
}

/// Fitted forecast parameters for one daily series: a mean baseline, a
/// least-squares drift clamped so it never moves the projection more than
/// half the baseline over the horizon, and a per-weekday seasonality
/// multiplier clamped to [0.25, 4.0].
struct SeriesModel {
    baseline: f64,
    slope: f64,
    weekday_multipliers: [f64; 7],
}

impl SeriesModel {
    fn fit(series: &[f64], window_start: NaiveDate, horizon: u32) -> Self {
        let baseline = mean(series);
        let slope = clamp_slope(least_squares_slope(series), baseline, horizon);
        let weekday_multipliers = weekday_multipliers(series, window_start, baseline);
        Self {
            baseline,
            slope,
            weekday_multipliers,
        }
    }

    fn predict(&self, days_out: i64, date: NaiveDate) -> f64 {
        let multiplier = self.weekday_multipliers[date.weekday().num_days_from_monday() as usize];
        ((self.baseline + self.slope * days_out as f64) * multiplier).max(0.0)
    }
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Ordinary least-squares slope of the series against its day index.
fn least_squares_slope(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(series);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Caps the drift so the projection at the end of the horizon never strays
/// more than half the baseline from it.
fn clamp_slope(slope: f64, baseline: f64, horizon: u32) -> f64 {
    if baseline <= 0.0 || horizon == 0 {
        return 0.0;
    }
    let limit = 0.5 * baseline / horizon as f64;
    slope.clamp(-limit, limit)
}

fn weekday_multipliers(series: &[f64], window_start: NaiveDate, baseline: f64) -> [f64; 7] {
    let mut sums = [0.0f64; 7];
    let mut counts = [0u32; 7];
    for (i, value) in series.iter().enumerate() {
        let weekday = (window_start + Duration::days(i as i64))
            .weekday()
            .num_days_from_monday() as usize;
        sums[weekday] += value;
        counts[weekday] += 1;
    }

    let mut multipliers = [1.0f64; 7];
    if baseline <= 0.0 {
        return multipliers;
    }
    for weekday in 0..7 {
        if counts[weekday] > 0 {
            let weekday_mean = sums[weekday] / counts[weekday] as f64;
            multipliers[weekday] = (weekday_mean / baseline).clamp(0.25, 4.0);
        }
    }
    multipliers
}

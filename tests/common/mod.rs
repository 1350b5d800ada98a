#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storeflow_api::{
    api_v1_routes,
    auth::{PermissionChecker, RoleBasedChecker, USER_ID_HEADER},
    config::AppConfig,
    db,
    entities::{inventory, order, product, store, user},
    events::{self, EventSender},
    handlers, request_id,
    services::{AnalyticsService, DirectoryService, InventoryService, OrderService},
    AppState,
};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Sequence for seeded order numbers so they never collide with the
/// counter-generated ORD series.
static SEED_SEQ: AtomicU32 = AtomicU32::new(1);

/// Helper harness wiring the full router against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_file: NamedTempFile,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = NamedTempFile::new().expect("create temp database file");
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.path().display()),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let retry_policy = cfg.retry_policy();
        let inventory = InventoryService::new(db_arc.clone(), Some(event_sender.clone()))
            .with_retry_policy(retry_policy.clone())
            .with_low_stock_list_threshold(cfg.low_stock_list_threshold)
            .with_low_stock_alert_threshold(cfg.low_stock_alert_threshold);
        let orders =
            OrderService::new(db_arc.clone(), inventory.clone(), Some(event_sender.clone()))
                .with_retry_policy(retry_policy)
                .with_sla_review_days(cfg.sla_review_days);
        let analytics = AnalyticsService::new(db_arc.clone())
            .with_low_stock_threshold(cfg.low_stock_alert_threshold)
            .with_sla_review_days(cfg.sla_review_days);
        let directory = DirectoryService::new(db_arc.clone());
        let permissions: Arc<dyn PermissionChecker> =
            Arc::new(RoleBasedChecker::new(db_arc.clone()));

        handlers::health::init_start_time();

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            event_sender,
            inventory,
            orders,
            analytics,
            directory,
            permissions,
        };

        let router = Router::new()
            .merge(handlers::health::routes())
            .nest("/api/v1", api_v1_routes())
            .layer(middleware::from_fn(request_id::request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            _db_file: db_file,
            _event_task: event_task,
        }
    }

    /// Send a request, forwarding the given user id as the edge proxy would.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        user_id: Option<i32>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(USER_ID_HEADER, user_id.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Same as `request` but with arbitrary extra headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn seed_store(
        &self,
        name: &str,
        code: &str,
        region: &str,
        store_type: &str,
    ) -> store::Model {
        store::ActiveModel {
            store_name: Set(name.to_string()),
            store_code: Set(code.to_string()),
            address: Set(format!("1 {} Plaza", name)),
            city: Set("Springfield".to_string()),
            state: Set("IL".to_string()),
            zip_code: Set("62704".to_string()),
            region: Set(region.to_string()),
            store_type: Set(store_type.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed store")
    }

    pub async fn seed_product(
        &self,
        name: &str,
        brand: &str,
        category: &str,
        unit_price: Decimal,
    ) -> product::Model {
        product::ActiveModel {
            product_name: Set(name.to_string()),
            brand: Set(brand.to_string()),
            category: Set(category.to_string()),
            package_size: Set("12x500ml".to_string()),
            unit_price: Set(unit_price),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product")
    }

    pub async fn seed_user(
        &self,
        first_name: &str,
        last_name: &str,
        role: &str,
        region: Option<&str>,
    ) -> user::Model {
        let username = format!(
            "{}.{}",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        );
        user::ActiveModel {
            username: Set(username.clone()),
            email: Set(format!("{}@storeflow.test", username)),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            role: Set(role.to_string()),
            store_id: Set(None),
            region: Set(region.map(|r| r.to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed user")
    }

    pub async fn seed_inventory(
        &self,
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        reserved_cases: i32,
    ) -> inventory::Model {
        inventory::ActiveModel {
            product_id: Set(product_id),
            store_id: Set(store_id),
            quantity_cases: Set(quantity_cases),
            reserved_cases: Set(reserved_cases),
            last_updated: Set(Utc::now()),
            version: Set(1),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed inventory")
    }

    /// Insert an order directly, bypassing the workflow. Used by the
    /// analytics tests to control order dates and statuses.
    pub async fn seed_order(
        &self,
        to_store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        requested_by: i32,
        status: &str,
        order_date: DateTime<Utc>,
    ) -> order::Model {
        let seq = SEED_SEQ.fetch_add(1, Ordering::Relaxed);
        let fulfilled_date = (status == "fulfilled").then_some(order_date);
        order::ActiveModel {
            order_number: Set(format!("SEED{:06}", seq)),
            from_store_id: Set(None),
            to_store_id: Set(to_store_id),
            product_id: Set(product_id),
            quantity_cases: Set(quantity_cases),
            order_status: Set(status.to_string()),
            requested_by: Set(requested_by),
            approved_by: Set(None),
            order_date: Set(order_date),
            approved_date: Set(None),
            fulfilled_date: Set(fulfilled_date),
            notes: Set(None),
            version: Set(1),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed order")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a response body to its JSON value.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body as json")
}

/// Decimals serialize as JSON strings; parse one for numeric assertions.
pub fn decimal_field(value: &Value) -> f64 {
    value
        .as_str()
        .expect("decimal field serialized as string")
        .parse()
        .expect("parse decimal field")
}

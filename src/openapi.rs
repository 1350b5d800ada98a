use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StoreFlow API",
        version = "0.3.0",
        description = r#"
# StoreFlow Replenishment API

Backend for the store network dashboard: store-to-store replenishment
orders with an approval workflow, a versioned per-store inventory ledger,
and the analytics that feed the dashboard.

## Identity

The edge proxy forwards the caller's identity in headers:

```
X-Forwarded-User-Id: 7
X-Forwarded-User-Email: mia.torres@example.com
```

Reads are open. Mutations require a known user; approving and fulfilling
orders additionally require the `regional_manager` role.

## Filters

Dropdown-backed filters accept `all` (or an empty value) to mean
"no filter". List endpoints paginate with `page` and `limit`
(default 20, max 100).

## Concurrency

Mutations are guarded by a per-row `version`. Send `expected_version`
to reject a write when the row changed since you read it; a mismatch
returns `409 Conflict`.
        "#,
        contact(name = "StoreFlow Platform")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Replenishment order workflow"),
        (name = "Inventory", description = "Stock ledger endpoints"),
        (name = "Stores", description = "Store directory"),
        (name = "Products", description = "Product catalog"),
        (name = "Users", description = "User directory"),
        (name = "Analytics", description = "Dashboard aggregates and forecasts")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::order_status_summary,
        crate::handlers::orders::region_breakdown,
        crate::handlers::orders::sla_expiry,
        crate::handlers::orders::demand_forecast,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::adjust_inventory,
        crate::handlers::inventory::inventory_kpis,
        crate::handlers::inventory::inventory_trends,
        crate::handlers::inventory::category_breakdown,
        crate::handlers::inventory::low_stock_alerts,

        // Directory
        crate::handlers::stores::list_stores,
        crate::handlers::stores::get_store,
        crate::handlers::stores::create_store,
        crate::handlers::stores::region_options,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::category_options,
        crate::handlers::products::brand_options,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Order types
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::UpdateStatusRequest,
            crate::handlers::orders::CancelOrderRequest,
            crate::services::orders::OrderPatch,
            crate::services::orders::OrderRow,
            crate::services::orders::StatusCount,

            // Inventory types
            crate::services::inventory::InventoryPatch,
            crate::services::inventory::InventoryRow,

            // Directory types
            crate::handlers::stores::StoreRecord,
            crate::handlers::products::ProductRecord,
            crate::handlers::users::UserRecord,
            crate::services::directory::NewStore,
            crate::services::directory::NewProduct,
            crate::services::directory::RegionOption,
            crate::services::directory::OptionItem,

            // Analytics types
            crate::services::analytics::Kpis,
            crate::services::analytics::TrendSeries,
            crate::services::analytics::InventoryTrendPoint,
            crate::services::analytics::OrderTrendPoint,
            crate::services::analytics::CategorySlice,
            crate::services::analytics::RegionSlice,
            crate::services::analytics::LowStockAlert,
            crate::services::analytics::SlaExpiry,
            crate::services::analytics::SlaOrder,
            crate::services::analytics::DemandForecast,
            crate::services::analytics::ForecastPoint,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generation_covers_the_api() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("StoreFlow API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/inventory/alerts/low-stock"));
        assert!(json.contains("/api/v1/stores/regions"));
    }
}

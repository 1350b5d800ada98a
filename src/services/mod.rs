/*!
 * Service layer. Each service owns the business rules for one slice of the
 * domain and is the only code that mutates its tables; handlers stay thin.
 *
 * Core ledger and lifecycle:
 * - `inventory`: per-(store, product) stock rows and the reserve / release /
 *   transfer bookkeeping that order transitions drive.
 * - `orders`: the replenishment order state machine, kept in lockstep with
 *   the inventory ledger inside a single transaction per transition.
 *
 * Read-mostly surfaces:
 * - `directory`: stores, products and users reference data.
 * - `analytics`: aggregates, alerts and the demand forecast.
 */

pub mod analytics;
pub mod directory;
pub mod inventory;
pub mod orders;

pub use analytics::AnalyticsService;
pub use directory::DirectoryService;
pub use inventory::InventoryService;
pub use orders::OrderService;

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A store-to-store replenishment order. `from_store_id` is None for orders
/// supplied externally (HQ/vendor inbound). The row is mutated only through
/// the state machine in `services::orders`; `version` increments on every
/// successful mutation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_number: String,
    pub from_store_id: Option<i32>,
    pub to_store_id: i32,
    pub product_id: i32,
    pub quantity_cases: i32,
    pub order_status: String,
    pub requested_by: i32,
    pub approved_by: Option<i32>,
    pub order_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub fulfilled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::ToStoreId",
        to = "super::store::Column::Id"
    )]
    ToStore,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::FromStoreId",
        to = "super::store::Column::Id"
    )]
    FromStore,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RequestedBy",
        to = "super::user::Column::Id"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ApprovedBy",
        to = "super::user::Column::Id"
    )]
    Approver,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.order_status)
    }

    /// The store carrying the reservation for this order: the supplying
    /// store, or the destination for externally supplied orders.
    pub fn reservation_store_id(&self) -> i32 {
        self.from_store_id.unwrap_or(self.to_store_id)
    }
}

/// Lifecycle states. The only legal edges are
/// pending_review -> approved -> fulfilled, with cancellation allowed from
/// the two non-terminal states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingReview,
    Approved,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::PendingReview,
        OrderStatus::Approved,
        OrderStatus::Fulfilled,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingReview => "pending_review",
            OrderStatus::Approved => "approved",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_review" => Some(OrderStatus::PendingReview),
            "approved" => Some(OrderStatus::Approved),
            "fulfilled" => Some(OrderStatus::Fulfilled),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::PendingReview, OrderStatus::Approved)
                | (OrderStatus::PendingReview, OrderStatus::Cancelled)
                | (OrderStatus::Approved, OrderStatus::Fulfilled)
                | (OrderStatus::Approved, OrderStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

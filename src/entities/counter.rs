use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named monotonic counters. One row, `order_number`, backs the atomic
/// order-number reservation in `services::orders`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const ORDER_NUMBER_COUNTER: &str = "order_number";

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Retail location reference data. Region and store_type exist for
/// filtering and reporting; orders and inventory reference stores by id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub store_name: String,
    pub store_code: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub region: String,
    pub store_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Store classifications used by the directory endpoints.
pub const STORE_TYPES: &[&str] = &[
    "Warehouse",
    "Urban",
    "Suburban",
    "Tourist",
    "Business",
    "Entertainment",
    "Shopping",
];

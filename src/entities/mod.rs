pub mod counter;
pub mod inventory;
pub mod order;
pub mod product;
pub mod store;
pub mod user;

pub use order::OrderStatus;

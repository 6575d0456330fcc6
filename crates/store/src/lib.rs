pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use store::{
    AdjustOutcome, CouponStore, OrderStore, ProductStore, StockAdjustment, StockChange, Store,
    UsageOutcome,
};

use async_trait::async_trait;
use common::OrderId;
use domain::{
    Coupon, CouponCode, CouponUsage, IneligibleReason, Order, Product, ProductId,
    crossed_low_stock,
};

use crate::{OrderQuery, Result};

/// A stock mutation requested by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// Decrement stock. Refused when the product enforces stock and fewer
    /// than the requested units are on hand.
    Reserve(u32),
    /// Increment stock. Always applied.
    Release(u32),
}

impl StockAdjustment {
    /// Signed change applied to the stock column.
    pub fn delta(&self) -> i64 {
        match self {
            StockAdjustment::Reserve(quantity) => -i64::from(*quantity),
            StockAdjustment::Release(quantity) => i64::from(*quantity),
        }
    }
}

/// Product state around one applied stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub name: String,
    pub previous: i64,
    pub current: i64,
    pub low_stock_threshold: i64,
    pub track_quantity: bool,
    pub allow_backorder: bool,
}

impl StockChange {
    pub fn is_in_stock(&self) -> bool {
        !self.track_quantity || self.allow_backorder || self.current > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.track_quantity && self.current <= self.low_stock_threshold
    }

    /// True when this change moved a tracked product from above its
    /// threshold to at or below it.
    pub fn crossed_low_stock(&self) -> bool {
        self.track_quantity
            && crossed_low_stock(self.previous, self.current, self.low_stock_threshold)
    }
}

/// Result of a conditional stock update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustOutcome {
    Applied(StockChange),
    /// Nothing was written.
    Insufficient { available: i64 },
}

/// Result of recording a coupon redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageOutcome {
    Recorded { used_count: u32 },
    /// A limit was reached between evaluation and redemption; nothing was written.
    Rejected(IneligibleReason),
}

/// Product catalog storage.
///
/// `adjust_stock` is the only way stock changes while orders are placed. It
/// must check and write in one atomic step so concurrent reservations can
/// never drive an enforced product below zero.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product.
    async fn save_product(&self, product: Product) -> Result<()>;

    /// Applies `adjustment` atomically.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn adjust_stock(&self, id: &ProductId, adjustment: StockAdjustment)
    -> Result<AdjustOutcome>;
}

/// Order storage with optimistic concurrency on updates.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order and returns its storage version.
    async fn insert_order(&self, order: &Order) -> Result<u64>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Replaces a stored order.
    ///
    /// Fails with `ConcurrencyConflict` unless the stored version equals
    /// `order.version()`. Returns the new version.
    async fn update_order(&self, order: &Order) -> Result<u64>;

    /// Lists orders newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;
}

/// Coupon storage.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn get_coupon(&self, code: &CouponCode) -> Result<Option<Coupon>>;

    /// Inserts or replaces a coupon.
    async fn save_coupon(&self, coupon: Coupon) -> Result<()>;

    /// Re-checks the usage limits, then bumps `used_count` and appends the
    /// usage, all in one atomic step per coupon.
    async fn record_usage(&self, code: &CouponCode, usage: CouponUsage) -> Result<UsageOutcome>;
}

/// Everything the fulfillment pipeline needs from storage.
pub trait Store: ProductStore + OrderStore + CouponStore {}

impl<T: ProductStore + OrderStore + CouponStore + ?Sized> Store for T {}

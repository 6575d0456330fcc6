use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Coupon, CouponCode, CouponUsage, Order, Product, ProductId};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result, StoreError,
    store::{
        AdjustOutcome, CouponStore, OrderStore, ProductStore, StockAdjustment, StockChange,
        UsageOutcome,
    },
};

/// In-memory store implementation.
///
/// Each conditional write runs its check and its mutation under a single
/// write-lock acquisition, which gives the same atomicity as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    coupons: Arc<RwLock<HashMap<CouponCode, Coupon>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all products, orders and coupons.
    pub async fn clear(&self) {
        self.products.write().await.clear();
        self.orders.write().await.clear();
        self.coupons.write().await.clear();
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn save_product(&self, product: Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
        Ok(())
    }

    async fn adjust_stock(
        &self,
        id: &ProductId,
        adjustment: StockAdjustment,
    ) -> Result<AdjustOutcome> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        let previous = product.stock;
        if let StockAdjustment::Reserve(quantity) = adjustment
            && product.enforces_stock()
            && previous < i64::from(quantity)
        {
            return Ok(AdjustOutcome::Insufficient {
                available: previous,
            });
        }

        product.stock += adjustment.delta();

        Ok(AdjustOutcome::Applied(StockChange {
            product_id: product.id.clone(),
            name: product.name.clone(),
            previous,
            current: product.stock,
            low_stock_threshold: product.low_stock_threshold,
            track_quantity: product.track_quantity,
            allow_backorder: product.allow_backorder,
        }))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<u64> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(StoreError::AlreadyExists {
                entity: "Order",
                id: order.id().to_string(),
            });
        }

        let mut stored = order.clone();
        stored.set_version(1);
        orders.insert(stored.id(), stored);
        Ok(1)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<u64> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id())
            .ok_or_else(|| StoreError::not_found("Order", order.id()))?;

        if current.version() != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: current.version(),
            });
        }

        let version = order.version() + 1;
        let mut stored = order.clone();
        stored.set_version(version);
        orders.insert(stored.id(), stored);
        Ok(version)
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.ordered_at().cmp(&a.ordered_at()));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl CouponStore for InMemoryStore {
    async fn get_coupon(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        Ok(self.coupons.read().await.get(code).cloned())
    }

    async fn save_coupon(&self, coupon: Coupon) -> Result<()> {
        self.coupons
            .write()
            .await
            .insert(coupon.code.clone(), coupon);
        Ok(())
    }

    async fn record_usage(&self, code: &CouponCode, usage: CouponUsage) -> Result<UsageOutcome> {
        let mut coupons = self.coupons.write().await;
        let coupon = coupons
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("Coupon", code))?;

        if let Err(reason) = coupon.check_redeemable(usage.user_id) {
            return Ok(UsageOutcome::Rejected(reason));
        }

        coupon.record_usage(usage);
        Ok(UsageOutcome::Recorded {
            used_count: coupon.used_count,
        })
    }
}

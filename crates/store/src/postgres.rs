use async_trait::async_trait;
use common::OrderId;
use domain::{CategoryId, Coupon, CouponCode, CouponUsage, Money, Order, Product, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    OrderQuery, Result, StoreError,
    store::{
        AdjustOutcome, CouponStore, OrderStore, ProductStore, StockAdjustment, StockChange,
        UsageOutcome,
    },
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row
                .try_get::<Option<String>, _>("category")?
                .map(CategoryId::new),
            stock: row.try_get("stock")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            track_quantity: row.try_get("track_quantity")?,
            allow_backorder: row.try_get("allow_backorder")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_stock_change(row: PgRow) -> Result<StockChange> {
        Ok(StockChange {
            product_id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            previous: row.try_get("previous")?,
            current: row.try_get("stock")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            track_quantity: row.try_get("track_quantity")?,
            allow_backorder: row.try_get("allow_backorder")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let data: serde_json::Value = row.try_get("data")?;
        let version: i64 = row.try_get("version")?;

        let mut order: Order = serde_json::from_value(data)?;
        order.set_version(version as u64);
        Ok(order)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, name, sku, price_cents, category, stock, low_stock_threshold,
                   track_quantity, allow_backorder, is_active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn save_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, sku, price_cents, category, stock,
                                  low_stock_threshold, track_quantity, allow_backorder, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                sku = EXCLUDED.sku,
                price_cents = EXCLUDED.price_cents,
                category = EXCLUDED.category,
                stock = EXCLUDED.stock,
                low_stock_threshold = EXCLUDED.low_stock_threshold,
                track_quantity = EXCLUDED.track_quantity,
                allow_backorder = EXCLUDED.allow_backorder,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price.cents())
        .bind(product.category.as_ref().map(CategoryId::as_str))
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.track_quantity)
        .bind(product.allow_backorder)
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(product_id = %id))]
    async fn adjust_stock(
        &self,
        id: &ProductId,
        adjustment: StockAdjustment,
    ) -> Result<AdjustOutcome> {
        // The stock guard sits in the WHERE clause so check and write are one
        // statement; concurrent reservations serialize on the row lock.
        let row: Option<PgRow> = match adjustment {
            StockAdjustment::Reserve(quantity) => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET stock = stock - $2, updated_at = NOW()
                    WHERE id = $1
                      AND (NOT track_quantity OR allow_backorder OR stock >= $2)
                    RETURNING id, name, stock, stock + $2 AS previous, low_stock_threshold,
                              track_quantity, allow_backorder
                    "#,
                )
                .bind(id.as_str())
                .bind(i64::from(quantity))
                .fetch_optional(&self.pool)
                .await?
            }
            StockAdjustment::Release(quantity) => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET stock = stock + $2, updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, name, stock, stock - $2 AS previous, low_stock_threshold,
                              track_quantity, allow_backorder
                    "#,
                )
                .bind(id.as_str())
                .bind(i64::from(quantity))
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(row) = row {
            return Ok(AdjustOutcome::Applied(Self::row_to_stock_change(row)?));
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => Ok(AdjustOutcome::Insufficient { available }),
            None => Err(StoreError::not_found("Product", id)),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert_order(&self, order: &Order) -> Result<u64> {
        let mut stored = order.clone();
        stored.set_version(1);
        let data = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, order_status, payment_status,
                                total_cents, ordered_at, version, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.total_amount().cents())
        .bind(order.ordered_at())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::AlreadyExists {
                    entity: "Order",
                    id: order.id().to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(1)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query("SELECT version, data FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn update_order(&self, order: &Order) -> Result<u64> {
        let expected = order.version();
        let mut stored = order.clone();
        stored.set_version(expected + 1);
        let data = serde_json::to_value(&stored)?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET order_status = $3, payment_status = $4, data = $5, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(expected as i64)
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(data)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(version) = updated {
            return Ok(version as u64);
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(order.id().as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual: actual as u64,
            }),
            None => Err(StoreError::not_found("Order", order.id())),
        }
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = String::from("SELECT version, data FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND order_status = ${param_count}"));
        }
        if query.payment_status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND payment_status = ${param_count}"));
        }

        sql.push_str(" ORDER BY ordered_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(status) = query.payment_status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl CouponStore for PostgresStore {
    async fn get_coupon(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        let data: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT data FROM coupons WHERE code = $1")
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(serde_json::from_value).transpose()?)
    }

    async fn save_coupon(&self, coupon: Coupon) -> Result<()> {
        let data = serde_json::to_value(&coupon)?;

        sqlx::query(
            r#"
            INSERT INTO coupons (code, used_count, is_active, ends_at, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO UPDATE SET
                used_count = EXCLUDED.used_count,
                is_active = EXCLUDED.is_active,
                ends_at = EXCLUDED.ends_at,
                data = EXCLUDED.data
            "#,
        )
        .bind(coupon.code.as_str())
        .bind(coupon.used_count as i32)
        .bind(coupon.is_active)
        .bind(coupon.ends_at)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, usage), fields(coupon = %code))]
    async fn record_usage(&self, code: &CouponCode, usage: CouponUsage) -> Result<UsageOutcome> {
        let mut tx = self.pool.begin().await?;

        let data: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT data FROM coupons WHERE code = $1 FOR UPDATE")
                .bind(code.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(data) = data else {
            return Err(StoreError::not_found("Coupon", code));
        };

        let mut coupon: Coupon = serde_json::from_value(data)?;
        if let Err(reason) = coupon.check_redeemable(usage.user_id) {
            return Ok(UsageOutcome::Rejected(reason));
        }
        coupon.record_usage(usage);

        sqlx::query("UPDATE coupons SET used_count = $2, data = $3 WHERE code = $1")
            .bind(code.as_str())
            .bind(coupon.used_count as i32)
            .bind(serde_json::to_value(&coupon)?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(UsageOutcome::Recorded {
            used_count: coupon.used_count,
        })
    }
}

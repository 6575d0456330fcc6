//! Catalog upserts for administrators.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{CategoryId, Coupon, CouponCode, CouponScope, Discount, Money, Product};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;

fn default_threshold() -> i64 {
    10
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub category: Option<String>,
    pub stock: i64,
    #[serde(default = "default_threshold")]
    pub low_stock_threshold: i64,
    #[serde(default = "enabled")]
    pub track_quantity: bool,
    #[serde(default)]
    pub allow_backorder: bool,
    #[serde(default = "enabled")]
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct CouponRequest {
    pub discount: Discount,
    #[serde(default)]
    pub minimum_order_cents: i64,
    pub maximum_discount_cents: Option<i64>,
    pub usage_limit: Option<u32>,
    pub usage_limit_per_user: Option<u32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "enabled")]
    pub is_active: bool,
    #[serde(default)]
    pub scope: CouponScope,
    #[serde(default)]
    pub allowed_users: Vec<UserId>,
}

/// PUT /admin/products/{id}: create or replace a product.
#[tracing::instrument(skip(state, req))]
pub async fn put_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    caller.require_admin()?;
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest("price must not be negative".to_string()));
    }
    if req.track_quantity && !req.allow_backorder && req.stock < 0 {
        return Err(ApiError::BadRequest(
            "stock must not be negative unless backorders are allowed".to_string(),
        ));
    }

    let product = Product {
        sku: req.sku.unwrap_or_else(|| id.clone()),
        id: id.into(),
        name: req.name,
        price: Money::from_cents(req.price_cents),
        category: req.category.map(CategoryId::new),
        stock: req.stock,
        low_stock_threshold: req.low_stock_threshold,
        track_quantity: req.track_quantity,
        allow_backorder: req.allow_backorder,
        is_active: req.is_active,
    };

    state.pipeline.store().save_product(product.clone()).await?;
    tracing::info!(product_id = %product.id, stock = product.stock, "product saved");
    Ok(Json(product))
}

/// PUT /admin/coupons/{code}: create or replace a coupon, keeping its
/// redemption history.
#[tracing::instrument(skip(state, req))]
pub async fn put_coupon<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(code): Path<String>,
    Json(req): Json<CouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    caller.require_admin()?;
    if req.ends_at < req.starts_at {
        return Err(ApiError::BadRequest(
            "ends_at must not be before starts_at".to_string(),
        ));
    }

    let code = CouponCode::new(&code);
    let store = state.pipeline.store();
    let previous = store.get_coupon(&code).await?;

    let mut coupon = Coupon::new(code, req.discount, req.starts_at, req.ends_at)
        .with_minimum_order(Money::from_cents(req.minimum_order_cents))
        .with_scope(req.scope);
    coupon.maximum_discount_amount = req.maximum_discount_cents.map(Money::from_cents);
    coupon.usage_limit = req.usage_limit;
    coupon.usage_limit_per_user = req.usage_limit_per_user;
    coupon.is_active = req.is_active;
    coupon.allowed_users = req.allowed_users;
    if let Some(previous) = previous {
        coupon.used_count = previous.used_count;
        coupon.usage_history = previous.usage_history;
    }

    store.save_coupon(coupon.clone()).await?;
    tracing::info!(coupon = %coupon.code, "coupon saved");
    Ok(Json(coupon))
}

//! Product snapshots as seen by the order pipeline.

use serde::{Deserialize, Serialize};

use crate::Money;

/// Product identifier (SKU-like string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Catalog category identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A catalog product.
///
/// The catalog owns products; the stock ledger is the only writer of
/// `stock` while orders are being placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: Money,
    #[serde(default)]
    pub category: Option<CategoryId>,
    /// May only go negative when `allow_backorder` is set.
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub track_quantity: bool,
    pub allow_backorder: bool,
    pub is_active: bool,
}

impl Product {
    /// Creates an active, quantity-tracked product without backorders.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Self {
        let id = id.into();
        Self {
            sku: id.as_str().to_string(),
            id,
            name: name.into(),
            price,
            category: None,
            stock,
            low_stock_threshold: 10,
            track_quantity: true,
            allow_backorder: false,
            is_active: true,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_backorder(mut self, allow: bool) -> Self {
        self.allow_backorder = allow;
        self
    }

    pub fn untracked(mut self) -> Self {
        self.track_quantity = false;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns true when a reservation must be checked against stock on hand.
    pub fn enforces_stock(&self) -> bool {
        self.track_quantity && !self.allow_backorder
    }

    pub fn is_in_stock(&self) -> bool {
        !self.enforces_stock() || self.stock > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.track_quantity && self.stock <= self.low_stock_threshold
    }
}

/// Edge-triggered low-stock check: stock moved from strictly above the
/// threshold to at or below it.
pub fn crossed_low_stock(previous: i64, current: i64, threshold: i64) -> bool {
    previous > threshold && current <= threshold
}

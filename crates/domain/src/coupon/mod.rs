//! Coupon model and eligibility engine.

mod engine;

pub use engine::{CouponLine, Eligibility, IneligibleReason, evaluate};

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, Money, ProductId};

/// Coupon code, normalised to trimmed upper case so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CouponCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CouponCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a coupon reduces the eligible amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the eligible amount, in basis points (1000 = 10%).
    Percentage { basis_points: u32 },
    /// Flat amount off.
    Fixed { amount: Money },
}

impl Discount {
    /// Whole-percent shorthand.
    pub fn percent(percent: u32) -> Self {
        Discount::Percentage {
            basis_points: percent * 100,
        }
    }

    pub fn fixed(amount: Money) -> Self {
        Discount::Fixed { amount }
    }

    /// Raw discount on `amount`, before any caps.
    pub fn apply_to(&self, amount: Money) -> Money {
        match self {
            Discount::Percentage { basis_points } => amount.percentage(*basis_points),
            Discount::Fixed { amount: flat } => *flat,
        }
    }
}

/// Product and category restrictions narrowing the eligible amount.
///
/// Applicable sets include; excluded sets always win. With every set empty
/// the coupon applies to the whole order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponScope {
    #[serde(default)]
    pub applicable_products: Vec<ProductId>,
    #[serde(default)]
    pub excluded_products: Vec<ProductId>,
    #[serde(default)]
    pub applicable_categories: Vec<CategoryId>,
    #[serde(default)]
    pub excluded_categories: Vec<CategoryId>,
}

impl CouponScope {
    pub fn is_restricted(&self) -> bool {
        !(self.applicable_products.is_empty()
            && self.excluded_products.is_empty()
            && self.applicable_categories.is_empty()
            && self.excluded_categories.is_empty())
    }

    fn has_inclusions(&self) -> bool {
        !(self.applicable_products.is_empty() && self.applicable_categories.is_empty())
    }

    /// Returns true if the line counts towards the eligible amount.
    pub fn admits(&self, product_id: &ProductId, category: Option<&CategoryId>) -> bool {
        let excluded = self.excluded_products.contains(product_id)
            || category.is_some_and(|c| self.excluded_categories.contains(c));
        if excluded {
            return false;
        }

        if !self.has_inclusions() {
            return true;
        }

        self.applicable_products.contains(product_id)
            || category.is_some_and(|c| self.applicable_categories.contains(c))
    }
}

/// One redemption of a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUsage {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub discount: Money,
    pub used_at: DateTime<Utc>,
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: CouponCode,
    pub discount: Discount,
    #[serde(default)]
    pub minimum_order_amount: Money,
    #[serde(default)]
    pub maximum_discount_amount: Option<Money>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_limit_per_user: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub scope: CouponScope,
    /// Empty means every user may redeem.
    #[serde(default)]
    pub allowed_users: Vec<UserId>,
    #[serde(default)]
    pub usage_history: Vec<CouponUsage>,
}

impl Coupon {
    /// Creates an active, unrestricted coupon valid over `starts_at..=ends_at`.
    pub fn new(
        code: impl Into<CouponCode>,
        discount: Discount,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code: code.into(),
            discount,
            minimum_order_amount: Money::zero(),
            maximum_discount_amount: None,
            usage_limit: None,
            usage_limit_per_user: None,
            used_count: 0,
            starts_at,
            ends_at,
            is_active: true,
            scope: CouponScope::default(),
            allowed_users: Vec::new(),
            usage_history: Vec::new(),
        }
    }

    pub fn with_minimum_order(mut self, amount: Money) -> Self {
        self.minimum_order_amount = amount;
        self
    }

    pub fn with_maximum_discount(mut self, amount: Money) -> Self {
        self.maximum_discount_amount = Some(amount);
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_usage_limit_per_user(mut self, limit: u32) -> Self {
        self.usage_limit_per_user = Some(limit);
        self
    }

    pub fn with_scope(mut self, scope: CouponScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn allow_user(mut self, user_id: UserId) -> Self {
        self.allowed_users.push(user_id);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Number of times `user_id` has redeemed this coupon.
    pub fn uses_by(&self, user_id: UserId) -> u32 {
        self.usage_history
            .iter()
            .filter(|usage| usage.user_id == user_id)
            .count() as u32
    }

    /// Checks the usage counters that can change between evaluation and
    /// redemption under concurrent orders.
    pub fn check_redeemable(&self, user_id: UserId) -> Result<(), IneligibleReason> {
        if let Some(limit) = self.usage_limit
            && self.used_count >= limit
        {
            return Err(IneligibleReason::UsageLimitReached { limit });
        }
        if let Some(limit) = self.usage_limit_per_user
            && self.uses_by(user_id) >= limit
        {
            return Err(IneligibleReason::PerUserLimitReached { limit });
        }
        Ok(())
    }

    /// Appends a redemption and bumps `used_count`.
    pub fn record_usage(&mut self, usage: CouponUsage) {
        self.used_count += 1;
        self.usage_history.push(usage);
    }
}

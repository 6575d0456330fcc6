//! Coupon eligibility and discount evaluation.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Coupon;
use crate::{CategoryId, Money, ProductId};

/// One priced line of a cart, as seen by scope narrowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponLine {
    pub product_id: ProductId,
    pub category: Option<CategoryId>,
    /// Unit price times quantity.
    pub amount: Money,
}

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibleReason {
    #[error("coupon is not active")]
    Inactive,

    #[error("coupon is not valid until {starts_at}")]
    NotYetValid { starts_at: DateTime<Utc> },

    #[error("coupon expired at {ends_at}")]
    Expired { ends_at: DateTime<Utc> },

    #[error("coupon usage limit of {limit} reached")]
    UsageLimitReached { limit: u32 },

    #[error("coupon is not available to this user")]
    UserNotAllowed,

    #[error("coupon already used the maximum of {limit} time(s) by this user")]
    PerUserLimitReached { limit: u32 },

    #[error("no item in the order is eligible for this coupon")]
    NoEligibleItems,
}

/// Outcome of evaluating a coupon against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible {
        discount: Money,
        eligible_amount: Money,
    },
    Ineligible(IneligibleReason),
    BelowMinimumOrder {
        minimum: Money,
        order_amount: Money,
    },
}

impl Eligibility {
    /// Discount to apply; zero unless eligible.
    pub fn discount(&self) -> Money {
        match self {
            Eligibility::Eligible { discount, .. } => *discount,
            _ => Money::zero(),
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. })
    }
}

/// Evaluates `coupon` for `user_id` on an order worth `order_amount`.
///
/// Checks run in a fixed order: validity, user eligibility, minimum order,
/// then scope narrowing. The first failing check decides the outcome.
pub fn evaluate(
    coupon: &Coupon,
    user_id: UserId,
    order_amount: Money,
    lines: &[CouponLine],
    now: DateTime<Utc>,
) -> Eligibility {
    if !coupon.is_active {
        return Eligibility::Ineligible(IneligibleReason::Inactive);
    }
    if now < coupon.starts_at {
        return Eligibility::Ineligible(IneligibleReason::NotYetValid {
            starts_at: coupon.starts_at,
        });
    }
    if now > coupon.ends_at {
        return Eligibility::Ineligible(IneligibleReason::Expired {
            ends_at: coupon.ends_at,
        });
    }
    if let Some(limit) = coupon.usage_limit
        && coupon.used_count >= limit
    {
        return Eligibility::Ineligible(IneligibleReason::UsageLimitReached { limit });
    }

    if !coupon.allowed_users.is_empty() && !coupon.allowed_users.contains(&user_id) {
        return Eligibility::Ineligible(IneligibleReason::UserNotAllowed);
    }
    if let Some(limit) = coupon.usage_limit_per_user
        && coupon.uses_by(user_id) >= limit
    {
        return Eligibility::Ineligible(IneligibleReason::PerUserLimitReached { limit });
    }

    if order_amount < coupon.minimum_order_amount {
        return Eligibility::BelowMinimumOrder {
            minimum: coupon.minimum_order_amount,
            order_amount,
        };
    }

    let eligible_amount = if coupon.scope.is_restricted() {
        let mut admitted = lines
            .iter()
            .filter(|line| coupon.scope.admits(&line.product_id, line.category.as_ref()))
            .peekable();
        if admitted.peek().is_none() {
            return Eligibility::Ineligible(IneligibleReason::NoEligibleItems);
        }
        admitted.map(|line| line.amount).sum()
    } else {
        order_amount
    };

    let mut discount = coupon.discount.apply_to(eligible_amount);
    if let Some(cap) = coupon.maximum_discount_amount {
        discount = discount.min(cap);
    }
    let discount = discount.min(eligible_amount).non_negative();

    Eligibility::Eligible {
        discount,
        eligible_amount,
    }
}

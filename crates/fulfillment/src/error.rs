//! Fulfillment error types.

use domain::{CouponCode, IneligibleReason, Money, OrderError, ProductId};
use store::StoreError;
use thiserror::Error;

use crate::ledger::StockError;

/// Which coupon constraint failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon {code}: {reason}")]
    Ineligible {
        code: CouponCode,
        reason: IneligibleReason,
    },

    #[error("coupon {code} requires a minimum order of {minimum}, order is {order_amount}")]
    BelowMinimumOrder {
        code: CouponCode,
        minimum: Money,
        order_amount: Money,
    },
}

impl CouponRejection {
    pub fn code(&self) -> &CouponCode {
        match self {
            CouponRejection::Ineligible { code, .. } => code,
            CouponRejection::BelowMinimumOrder { code, .. } => code,
        }
    }
}

/// Errors returned by the order pipeline.
///
/// Every failure of an operation is one of these; nothing panics.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Missing product, order or coupon.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Inactive product or malformed input.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// A stock reservation was refused.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// The coupon cannot be applied to this order.
    #[error("Invalid coupon: {0}")]
    InvalidCoupon(CouponRejection),

    /// The state machine has no such edge.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// The caller may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage or transport failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FulfillmentError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FulfillmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short label used as the `reason` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::NotFound { .. } => "not_found",
            FulfillmentError::Invalid(_) => "invalid",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::InvalidCoupon(_) => "invalid_coupon",
            FulfillmentError::InvalidTransition { .. } => "invalid_transition",
            FulfillmentError::Forbidden(_) => "forbidden",
            FulfillmentError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => FulfillmentError::NotFound { entity, id },
            other => FulfillmentError::Internal(other.to_string()),
        }
    }
}

impl From<StockError> for FulfillmentError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InvalidQuantity { .. } => FulfillmentError::Invalid(err.to_string()),
            StockError::ProductNotFound(id) => FulfillmentError::not_found("Product", id),
            StockError::InsufficientStock {
                product_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StockError::Store(err) => err.into(),
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatusTransition { from, to } => {
                FulfillmentError::InvalidTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            OrderError::InvalidPaymentTransition { from, to } => {
                FulfillmentError::InvalidTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            other => FulfillmentError::Invalid(other.to_string()),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

//! Domain layer for the storefront core.
//!
//! This crate holds everything that can be decided without I/O:
//! - [`Money`] arithmetic in cents
//! - [`Product`] snapshots and low-stock crossing detection
//! - [`Coupon`] model and the coupon eligibility/discount engine
//! - [`Order`] entity with its order-status and payment-status state machines

pub mod coupon;
pub mod money;
pub mod order;
pub mod product;

pub use coupon::{
    Coupon, CouponCode, CouponLine, CouponScope, CouponUsage, Discount, Eligibility,
    IneligibleReason, evaluate,
};
pub use money::Money;
pub use order::{
    Actor, Address, AppliedCoupon, HistoryEntry, LineItem, Order, OrderDraft, OrderError,
    OrderEvent, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, Pricing,
};
pub use product::{CategoryId, Product, ProductId, crossed_low_stock};

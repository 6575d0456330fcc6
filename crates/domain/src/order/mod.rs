//! Order entity, state machines and related types.

mod entity;
mod events;
mod status;
mod value_objects;

pub use entity::{Order, OrderDraft};
pub use events::{OrderEvent, PaymentStatusChangedData, StatusChangedData};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{
    Actor, Address, AppliedCoupon, HistoryEntry, LineItem, OrderNumber, PaymentMethod, Pricing,
};

use thiserror::Error;

use crate::{Money, ProductId};

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Requested order-status edge is not in the transition table.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Requested payment-status edge is not in the transition table.
    #[error("Invalid payment status transition: {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Discount exceeds what the order is worth.
    #[error("Order total cannot be negative: {total}")]
    NegativeTotal { total: Money },

    /// Amounts too large to represent in cents.
    #[error("Order amount is out of range")]
    AmountOverflow,
}

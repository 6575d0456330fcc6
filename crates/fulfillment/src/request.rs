//! Pipeline requests and replies.

use common::{Identity, OrderId, UserId};
use domain::{
    Address, CouponCode, Eligibility, Money, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
};
use serde::{Deserialize, Serialize};

/// One cart line: which product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Request to turn a cart into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<CouponCode>,
    pub note: Option<String>,
}

impl PlaceOrder {
    pub fn new(user_id: UserId, items: Vec<CartItem>, shipping_address: Address) -> Self {
        Self {
            user_id,
            items,
            shipping_address,
            billing_address: None,
            payment_method: PaymentMethod::default(),
            coupon_code: None,
            note: None,
        }
    }

    pub fn with_coupon(mut self, code: impl Into<CouponCode>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Request to move an order along the fulfilment state machine.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub by: Identity,
}

impl StatusUpdate {
    pub fn new(order_id: OrderId, status: OrderStatus, by: Identity) -> Self {
        Self {
            order_id,
            status,
            note: None,
            by,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Request to move an order along the payment state machine.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    pub note: Option<String>,
    pub by: Identity,
}

impl PaymentUpdate {
    pub fn new(order_id: OrderId, status: PaymentStatus, by: Identity) -> Self {
        Self {
            order_id,
            status,
            note: None,
            by,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Read-only coupon check against a cart.
#[derive(Debug, Clone)]
pub struct CouponCheck {
    pub user_id: UserId,
    pub code: CouponCode,
    pub items: Vec<CartItem>,
}

/// Outcome of a coupon check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponQuote {
    pub code: CouponCode,
    pub subtotal: Money,
    pub eligibility: Eligibility,
    pub discount: Money,
    pub subtotal_after_discount: Money,
}

//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{Identity, OrderId, Role, UserId};
use serde::{Deserialize, Serialize};

use crate::{CouponCode, Money, ProductId};

/// Human-readable order reference, e.g. `ORD-20240615-1A2B3C4D`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derives the order number from the placement date and the order id.
    pub fn generate(order_id: OrderId, placed_at: DateTime<Utc>) -> Self {
        let suffix = order_id.as_uuid().simple().to_string()[..8].to_uppercase();
        Self(format!("ORD-{}-{}", placed_at.format("%Y%m%d"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line of an order, frozen at placement time.
///
/// Later catalog edits never reach an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            sku: sku.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// How the shopper intends to pay. Gateway integration lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    Wallet,
    CashOnDelivery,
}

/// Summary of the coupon applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: CouponCode,
    pub discount: Money,
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pricing {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
}

impl Pricing {
    /// `subtotal + tax + shipping - discount`.
    pub fn total(&self) -> Money {
        self.subtotal + self.tax_amount + self.shipping_amount - self.discount_amount
    }
}

/// Who caused a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Actor {
    System,
    Customer(UserId),
    Admin(UserId),
}

impl From<Identity> for Actor {
    fn from(identity: Identity) -> Self {
        match identity.role {
            Role::Admin => Actor::Admin(identity.user_id),
            Role::Customer => Actor::Customer(identity.user_id),
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::System => write!(f, "system"),
            Actor::Customer(id) => write!(f, "customer:{id}"),
            Actor::Admin(id) => write!(f, "admin:{id}"),
        }
    }
}

/// One append-only entry of a status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry<S> {
    pub status: S,
    pub at: DateTime<Utc>,
    pub actor: Actor,
    #[serde(default)]
    pub note: Option<String>,
}

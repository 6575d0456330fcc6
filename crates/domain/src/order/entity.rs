//! Order entity.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    Actor, Address, AppliedCoupon, HistoryEntry, LineItem, OrderError, OrderEvent, OrderNumber,
    OrderStatus, PaymentMethod, PaymentStatus, Pricing,
    events::{PaymentStatusChangedData, StatusChangedData},
};
use crate::Money;

/// Everything needed to place an order, before it exists.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub coupon: Option<AppliedCoupon>,
    pub note: Option<String>,
}

impl OrderDraft {
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::total_price).sum()
    }

    pub fn pricing(&self) -> Pricing {
        Pricing {
            subtotal: self.subtotal(),
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
            discount_amount: self
                .coupon
                .as_ref()
                .map(|coupon| coupon.discount)
                .unwrap_or_default(),
        }
    }

    /// Total with every step checked, `None` if any amount overflows.
    fn checked_total(&self) -> Option<Money> {
        let subtotal = self.items.iter().try_fold(Money::zero(), |sum, item| {
            sum.checked_add(item.unit_price.checked_times(item.quantity)?)
        })?;
        let discount = self
            .coupon
            .as_ref()
            .map(|coupon| coupon.discount)
            .unwrap_or_default();
        subtotal
            .checked_add(self.tax_amount)?
            .checked_add(self.shipping_amount)?
            .checked_sub(discount)
    }
}

/// A placed order.
///
/// Line items and amounts are fixed at placement. Afterwards only the
/// status fields and their histories change, and only through
/// [`Order::apply`] with events produced by the command methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    ordered_at: DateTime<Utc>,
    items: Vec<LineItem>,
    shipping_address: Address,
    billing_address: Address,
    payment_method: PaymentMethod,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    discount_amount: Money,
    total_amount: Money,
    coupon: Option<AppliedCoupon>,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    status_history: Vec<HistoryEntry<OrderStatus>>,
    payment_history: Vec<HistoryEntry<PaymentStatus>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    /// Storage version for optimistic concurrency; bumped by the store.
    #[serde(default)]
    version: u64,
}

impl Order {
    /// Places a new order in `Pending`/`Pending` with one history entry.
    pub fn place(draft: OrderDraft, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(item) = draft.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }

        let total = draft.checked_total().ok_or(OrderError::AmountOverflow)?;
        let pricing = draft.pricing();
        if total.is_negative() {
            return Err(OrderError::NegativeTotal { total });
        }

        let id = OrderId::new();
        let billing_address = draft
            .billing_address
            .unwrap_or_else(|| draft.shipping_address.clone());

        Ok(Order {
            id,
            order_number: OrderNumber::generate(id, now),
            user_id: draft.user_id,
            ordered_at: now,
            items: draft.items,
            shipping_address: draft.shipping_address,
            billing_address,
            payment_method: draft.payment_method,
            subtotal: pricing.subtotal,
            tax_amount: pricing.tax_amount,
            shipping_amount: pricing.shipping_amount,
            discount_amount: pricing.discount_amount,
            total_amount: total,
            coupon: draft.coupon,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            status_history: vec![HistoryEntry {
                status: OrderStatus::Pending,
                at: now,
                actor: Actor::Customer(draft.user_id),
                note: draft.note,
            }],
            payment_history: Vec::new(),
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: 0,
        })
    }

    /// Applies an accepted state change.
    pub fn apply(&mut self, event: OrderEvent) {
        match event {
            OrderEvent::StatusChanged(data) => self.apply_status_changed(data),
            OrderEvent::PaymentStatusChanged(data) => self.apply_payment_status_changed(data),
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn pricing(&self) -> Pricing {
        Pricing {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
            discount_amount: self.discount_amount,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn status_history(&self) -> &[HistoryEntry<OrderStatus>] {
        &self.status_history
    }

    pub fn payment_history(&self) -> &[HistoryEntry<PaymentStatus>] {
        &self.payment_history
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

// Command methods (return events)
impl Order {
    /// Requests a fulfilment-status change.
    pub fn change_status(
        &self,
        to: OrderStatus,
        actor: Actor,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        if !self.order_status.can_transition_to(to) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.order_status,
                to,
            });
        }

        Ok(OrderEvent::StatusChanged(StatusChangedData {
            from: self.order_status,
            to,
            actor,
            note,
            at: now,
        }))
    }

    /// Requests a payment-status change.
    pub fn change_payment_status(
        &self,
        to: PaymentStatus,
        actor: Actor,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        if !self.payment_status.can_transition_to(to) {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
                to,
            });
        }

        Ok(OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from: self.payment_status,
            to,
            actor,
            note,
            at: now,
        }))
    }
}

// Apply event helpers
impl Order {
    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.order_status = data.to;
        match data.to {
            OrderStatus::Delivered => self.delivered_at = Some(data.at),
            OrderStatus::Cancelled => {
                self.cancelled_at = Some(data.at);
                self.cancellation_reason = data.note.clone();
            }
            _ => {}
        }
        self.status_history.push(HistoryEntry {
            status: data.to,
            at: data.at,
            actor: data.actor,
            note: data.note,
        });
    }

    fn apply_payment_status_changed(&mut self, data: PaymentStatusChangedData) {
        self.payment_status = data.to;
        self.payment_history.push(HistoryEntry {
            status: data.to,
            at: data.at,
            actor: data.actor,
            note: data.note,
        });
    }
}

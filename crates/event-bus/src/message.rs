//! Notification payloads.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Money, Order, OrderEvent, ProductId};
use serde::{Deserialize, Serialize};

use crate::Topic;

/// Stock level of one product after a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product_id: ProductId,
    pub stock: i64,
    pub is_in_stock: bool,
    pub low_stock: bool,
}

/// A newly placed order, for the admin feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub total_amount: Money,
    pub item_count: usize,
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            user_id: order.user_id(),
            total_amount: order.total_amount(),
            item_count: order.item_count(),
        }
    }
}

/// An accepted order-status or payment-status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub order_number: String,
    pub old_status: String,
    pub new_status: String,
    pub total_amount: Money,
}

/// A tracked product crossed its low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub product_id: ProductId,
    pub name: String,
    pub stock: i64,
    pub threshold: i64,
}

/// Everything that can be published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum BusMessage {
    StockUpdated(StockUpdate),
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderUpdate),
    PaymentStatusChanged(OrderUpdate),
    LowStockAlert(LowStockAlert),
}

impl BusMessage {
    /// Builds the update message for an applied order event.
    pub fn order_update(order: &Order, event: &OrderEvent) -> Self {
        let update = OrderUpdate {
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            old_status: event.old_status().to_string(),
            new_status: event.new_status().to_string(),
            total_amount: order.total_amount(),
        };
        match event {
            OrderEvent::StatusChanged(_) => BusMessage::OrderStatusChanged(update),
            OrderEvent::PaymentStatusChanged(_) => BusMessage::PaymentStatusChanged(update),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BusMessage::StockUpdated(_) => "stock_updated",
            BusMessage::OrderPlaced(_) => "order_placed",
            BusMessage::OrderStatusChanged(_) => "order_status_changed",
            BusMessage::PaymentStatusChanged(_) => "payment_status_changed",
            BusMessage::LowStockAlert(_) => "low_stock_alert",
        }
    }
}

/// A message as delivered to one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    #[serde(serialize_with = "serialize_topic")]
    pub topic: Topic,
    pub message: BusMessage,
    pub published_at: DateTime<Utc>,
}

fn serialize_topic<S: serde::Serializer>(topic: &Topic, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(topic)
}

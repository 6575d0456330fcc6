//! Order state-change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Actor, OrderStatus, PaymentStatus};

/// Accepted state changes on an order.
///
/// Command methods on [`super::Order`] validate a request against the state
/// machine and return one of these; `Order::apply` folds it into the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Fulfilment status moved along an allowed edge.
    StatusChanged(StatusChangedData),

    /// Payment status moved along an allowed edge.
    PaymentStatusChanged(PaymentStatusChangedData),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::StatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
        }
    }

    pub fn old_status(&self) -> &'static str {
        match self {
            OrderEvent::StatusChanged(data) => data.from.as_str(),
            OrderEvent::PaymentStatusChanged(data) => data.from.as_str(),
        }
    }

    pub fn new_status(&self) -> &'static str {
        match self {
            OrderEvent::StatusChanged(data) => data.to.as_str(),
            OrderEvent::PaymentStatusChanged(data) => data.to.as_str(),
        }
    }
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: Actor,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Data for PaymentStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub actor: Actor,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

//! Topic-based publish/subscribe fan-out.
//!
//! This crate provides the notification side of order fulfillment:
//! - [`Topic`] with its three families (`product:<id>`, `user:<id>`, `admin:*`)
//! - [`BusMessage`] payloads for stock, order and low-stock notifications
//! - [`EventPublisher`] trait the pipeline depends on
//! - [`EventBus`] in-process implementation with one bounded channel per subscriber
//!
//! Delivery is at-most-once to subscribers connected at publish time. There is
//! no replay.

pub mod bus;
pub mod error;
pub mod message;
pub mod topic;

pub use bus::{DEFAULT_CAPACITY, EventBus, EventPublisher, PublishReport, SubscriberId, Subscription};
pub use error::{BusError, Result};
pub use message::{BusMessage, LowStockAlert, Notification, OrderPlaced, OrderUpdate, StockUpdate};
pub use topic::Topic;

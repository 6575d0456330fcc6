//! Order fulfillment: stock ledger and order pipeline.
//!
//! The pipeline runs order placement as a saga:
//! 1. Price the cart and score the coupon
//! 2. Reserve stock line by line
//! 3. Persist the order (commit point)
//! 4. Record coupon usage
//! 5. Publish notifications
//!
//! A failure before the commit point releases the reservations already made,
//! in reverse order. A coupon that runs out after the commit point cancels
//! the order and releases its stock.

pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod request;
pub mod services;

pub use error::{CouponRejection, FulfillmentError, Result};
pub use ledger::{StockError, StockLedger, StockMovement};
pub use pipeline::OrderPipeline;
pub use request::{CartItem, CouponCheck, CouponQuote, PaymentUpdate, PlaceOrder, StatusUpdate};
pub use services::{
    ChargeContext, FlatRateShipping, FreeShipping, NoTax, PercentageTax, ShippingCalculator,
    TaxCalculator,
};

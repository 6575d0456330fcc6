//! Pluggable pricing inputs: tax and shipping.
//!
//! Rate computation itself lives outside this crate; the defaults charge
//! nothing.

pub mod shipping;
pub mod tax;

use common::UserId;
use domain::{Address, LineItem, Money};

pub use shipping::{FlatRateShipping, FreeShipping, ShippingCalculator};
pub use tax::{NoTax, PercentageTax, TaxCalculator};

/// What a calculator gets to see about the order being priced.
#[derive(Debug, Clone, Copy)]
pub struct ChargeContext<'a> {
    pub user_id: UserId,
    pub items: &'a [LineItem],
    pub subtotal: Money,
    pub shipping_address: &'a Address,
}

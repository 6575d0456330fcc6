//! Shipping calculator trait and simple implementations.

use async_trait::async_trait;
use domain::Money;

use super::ChargeContext;
use crate::Result;

/// Computes the shipping charge of an order.
#[async_trait]
pub trait ShippingCalculator: Send + Sync {
    async fn shipping_for(&self, context: ChargeContext<'_>) -> Result<Money>;
}

/// Ships everything for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShipping;

#[async_trait]
impl ShippingCalculator for FreeShipping {
    async fn shipping_for(&self, _context: ChargeContext<'_>) -> Result<Money> {
        Ok(Money::zero())
    }
}

/// One flat fee per order, waived from a subtotal threshold.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateShipping {
    fee: Money,
    free_from: Option<Money>,
}

impl FlatRateShipping {
    pub fn new(fee: Money) -> Self {
        Self {
            fee,
            free_from: None,
        }
    }

    pub fn free_from(mut self, subtotal: Money) -> Self {
        self.free_from = Some(subtotal);
        self
    }
}

#[async_trait]
impl ShippingCalculator for FlatRateShipping {
    async fn shipping_for(&self, context: ChargeContext<'_>) -> Result<Money> {
        match self.free_from {
            Some(threshold) if context.subtotal >= threshold => Ok(Money::zero()),
            _ => Ok(self.fee),
        }
    }
}

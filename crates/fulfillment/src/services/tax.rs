//! Tax calculator trait and simple implementations.

use async_trait::async_trait;
use domain::Money;

use super::ChargeContext;
use crate::Result;

/// Computes the tax amount of an order.
#[async_trait]
pub trait TaxCalculator: Send + Sync {
    async fn tax_for(&self, context: ChargeContext<'_>) -> Result<Money>;
}

/// Charges no tax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

#[async_trait]
impl TaxCalculator for NoTax {
    async fn tax_for(&self, _context: ChargeContext<'_>) -> Result<Money> {
        Ok(Money::zero())
    }
}

/// Flat rate on the subtotal, in basis points.
#[derive(Debug, Clone, Copy)]
pub struct PercentageTax {
    basis_points: u32,
}

impl PercentageTax {
    pub fn new(basis_points: u32) -> Self {
        Self { basis_points }
    }
}

#[async_trait]
impl TaxCalculator for PercentageTax {
    async fn tax_for(&self, context: ChargeContext<'_>) -> Result<Money> {
        Ok(context.subtotal.percentage(self.basis_points))
    }
}

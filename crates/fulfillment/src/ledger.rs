//! Stock ledger: the only writer of product stock during fulfillment.

use domain::ProductId;
use event_bus::StockUpdate;
use store::{AdjustOutcome, ProductStore, StockAdjustment, StockChange, StoreError};
use thiserror::Error;

/// Errors that can occur when reserving or releasing stock.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Invalid quantity for {product_id}: must be at least 1")]
    InvalidQuantity { product_id: ProductId },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One committed stock mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub previous: i64,
    pub current: i64,
    pub low_stock_threshold: i64,
    pub is_in_stock: bool,
    pub is_low_stock: bool,
    /// Edge-triggered: set only by a reservation that moved stock from above
    /// the threshold to at or below it.
    pub crossed_low_stock: bool,
}

impl StockMovement {
    fn from_change(change: StockChange, quantity: u32, is_reservation: bool) -> Self {
        Self {
            quantity,
            previous: change.previous,
            current: change.current,
            low_stock_threshold: change.low_stock_threshold,
            is_in_stock: change.is_in_stock(),
            is_low_stock: change.is_low_stock(),
            crossed_low_stock: is_reservation && change.crossed_low_stock(),
            product_id: change.product_id,
            name: change.name,
        }
    }

    pub fn stock_update(&self) -> StockUpdate {
        StockUpdate {
            product_id: self.product_id.clone(),
            stock: self.current,
            is_in_stock: self.is_in_stock,
            low_stock: self.is_low_stock,
        }
    }
}

/// Reserves and releases product stock through the store's atomic
/// conditional update.
#[derive(Clone)]
pub struct StockLedger<S> {
    store: S,
}

impl<S: ProductStore> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Takes `quantity` units of a product.
    ///
    /// Products that enforce stock are refused when fewer than `quantity`
    /// units are on hand, and nothing is written. Untracked and backorder
    /// products are always decremented.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<StockMovement, StockError> {
        self.adjust(product_id, StockAdjustment::Reserve(quantity), quantity)
            .await
    }

    /// Returns `quantity` units of a product, reversing a reservation.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn release(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<StockMovement, StockError> {
        self.adjust(product_id, StockAdjustment::Release(quantity), quantity)
            .await
    }

    async fn adjust(
        &self,
        product_id: &ProductId,
        adjustment: StockAdjustment,
        quantity: u32,
    ) -> Result<StockMovement, StockError> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity {
                product_id: product_id.clone(),
            });
        }

        let outcome = match self.store.adjust_stock(product_id, adjustment).await {
            Ok(outcome) => outcome,
            Err(StoreError::NotFound { .. }) => {
                return Err(StockError::ProductNotFound(product_id.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        match outcome {
            AdjustOutcome::Applied(change) => {
                let is_reservation = matches!(adjustment, StockAdjustment::Reserve(_));
                let movement = StockMovement::from_change(change, quantity, is_reservation);
                tracing::debug!(
                    previous = movement.previous,
                    current = movement.current,
                    crossed_low_stock = movement.crossed_low_stock,
                    "stock adjusted"
                );
                Ok(movement)
            }
            AdjustOutcome::Insufficient { available } => {
                metrics::counter!("stock_reservations_failed_total").increment(1);
                tracing::info!(requested = quantity, available, "insufficient stock");
                Err(StockError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: quantity,
                    available,
                })
            }
        }
    }
}

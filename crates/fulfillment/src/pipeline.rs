//! Order pipeline: admission, status transitions and notifications.

use std::sync::Arc;

use common::{Clock, Identity, OrderId, SystemClock};
use domain::{
    Actor, AppliedCoupon, CouponLine, CouponUsage, Eligibility, LineItem, Money, Order,
    OrderDraft, OrderEvent, OrderStatus, Product, evaluate,
};
use event_bus::{BusMessage, EventPublisher, LowStockAlert, OrderPlaced, Topic};
use store::{OrderQuery, Store, StoreError, UsageOutcome};

use crate::error::{CouponRejection, FulfillmentError, Result};
use crate::ledger::{StockLedger, StockMovement};
use crate::request::{CartItem, CouponCheck, CouponQuote, PaymentUpdate, PlaceOrder, StatusUpdate};
use crate::services::{
    ChargeContext, FreeShipping, NoTax, ShippingCalculator, TaxCalculator,
};

/// How many times a status update is retried after losing an optimistic
/// concurrency race.
const MAX_UPDATE_ATTEMPTS: u32 = 3;

const COUPON_EXHAUSTED_NOTE: &str = "coupon no longer available";

/// A cart priced against current product snapshots.
struct PricedCart {
    items: Vec<LineItem>,
    coupon_lines: Vec<CouponLine>,
    subtotal: Money,
}

/// Orchestrates order placement and order updates.
///
/// Placement is a saga: stock reservations are compensable, persisting the
/// order is the commit point and coupon usage is recorded after it.
/// Notifications go out only after the whole operation succeeded, and
/// publishing can never fail it.
pub struct OrderPipeline<S, P> {
    store: S,
    ledger: StockLedger<S>,
    publisher: P,
    clock: Arc<dyn Clock>,
    tax: Arc<dyn TaxCalculator>,
    shipping: Arc<dyn ShippingCalculator>,
}

impl<S, P> OrderPipeline<S, P>
where
    S: Store + Clone,
    P: EventPublisher,
{
    /// Creates a pipeline with the system clock, no tax and free shipping.
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            store,
            publisher,
            clock: Arc::new(SystemClock),
            tax: Arc::new(NoTax),
            shipping: Arc::new(FreeShipping),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_tax_calculator(mut self, tax: impl TaxCalculator + 'static) -> Self {
        self.tax = Arc::new(tax);
        self
    }

    pub fn with_shipping_calculator(mut self, shipping: impl ShippingCalculator + 'static) -> Self {
        self.shipping = Arc::new(shipping);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &StockLedger<S> {
        &self.ledger
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Turns a cart into a persisted `pending` order.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, items = request.items.len()))]
    pub async fn create_order(&self, request: PlaceOrder) -> Result<Order> {
        let start = std::time::Instant::now();
        let result = self.place(request).await;

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_create_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %order.id(),
                    order_number = %order.order_number(),
                    total = %order.total_amount(),
                    "order created"
                );
            }
            Err(err) => {
                metrics::counter!("orders_rejected_total", "reason" => err.kind()).increment(1);
                tracing::info!(error = %err, "order rejected");
            }
        }

        result
    }

    async fn place(&self, request: PlaceOrder) -> Result<Order> {
        let now = self.clock.now();
        let cart = self.price_cart(&request.items).await?;

        let coupon = match &request.coupon_code {
            Some(code) => {
                let coupon = self
                    .store
                    .get_coupon(code)
                    .await?
                    .ok_or_else(|| FulfillmentError::not_found("Coupon", code))?;
                let eligibility = evaluate(
                    &coupon,
                    request.user_id,
                    cart.subtotal,
                    &cart.coupon_lines,
                    now,
                );
                let discount = accept_coupon(&coupon.code, eligibility)?;
                Some(AppliedCoupon {
                    code: coupon.code,
                    discount,
                })
            }
            None => None,
        };

        let context = ChargeContext {
            user_id: request.user_id,
            items: &cart.items,
            subtotal: cart.subtotal,
            shipping_address: &request.shipping_address,
        };
        let tax_amount = self.tax.tax_for(context).await?;
        let shipping_amount = self.shipping.shipping_for(context).await?;

        let mut order = Order::place(
            OrderDraft {
                user_id: request.user_id,
                items: cart.items,
                shipping_address: request.shipping_address,
                billing_address: request.billing_address,
                payment_method: request.payment_method,
                tax_amount,
                shipping_amount,
                coupon,
                note: request.note,
            },
            now,
        )?;

        let movements = self.reserve_all(order.items()).await?;

        match self.store.insert_order(&order).await {
            Ok(version) => order.set_version(version),
            Err(err) => {
                tracing::error!(error = %err, "failed to persist order, releasing stock");
                self.release_all(&movements).await;
                return Err(FulfillmentError::Internal(err.to_string()));
            }
        }

        if let Some(applied) = order.coupon().cloned() {
            self.redeem_coupon(&order, &applied, &movements).await?;
        }

        self.publish_order_placed(&order, &movements);
        Ok(order)
    }

    /// Loads product snapshots and freezes line prices.
    async fn price_cart(&self, items: &[CartItem]) -> Result<PricedCart> {
        if items.is_empty() {
            return Err(FulfillmentError::Invalid("cart is empty".to_string()));
        }

        let mut cart = PricedCart {
            items: Vec::with_capacity(items.len()),
            coupon_lines: Vec::with_capacity(items.len()),
            subtotal: Money::zero(),
        };

        for item in items {
            if item.quantity == 0 {
                return Err(FulfillmentError::Invalid(format!(
                    "quantity for {} must be at least 1",
                    item.product_id
                )));
            }

            let product = self.load_product(item).await?;
            let line_total = product.price.checked_times(item.quantity);
            cart.subtotal = line_total
                .and_then(|total| cart.subtotal.checked_add(total))
                .ok_or_else(|| {
                    FulfillmentError::Invalid(format!(
                        "order amount out of range at {} x {}",
                        item.quantity, product.id
                    ))
                })?;
            let line = LineItem::new(
                product.id.clone(),
                product.name.clone(),
                product.sku.clone(),
                product.price,
                item.quantity,
            );
            cart.coupon_lines.push(CouponLine {
                product_id: product.id,
                category: product.category,
                amount: line.total_price(),
            });
            cart.items.push(line);
        }

        Ok(cart)
    }

    async fn load_product(&self, item: &CartItem) -> Result<Product> {
        let product = self
            .store
            .get_product(&item.product_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Product", &item.product_id))?;

        if !product.is_active {
            return Err(FulfillmentError::Invalid(format!(
                "product {} is not available",
                product.id
            )));
        }
        Ok(product)
    }

    /// Reserves every line in order; on the first failure releases what was
    /// already taken and reports the failing product.
    async fn reserve_all(&self, items: &[LineItem]) -> Result<Vec<StockMovement>> {
        let mut movements = Vec::with_capacity(items.len());

        for item in items {
            match self.ledger.reserve(&item.product_id, item.quantity).await {
                Ok(movement) => movements.push(movement),
                Err(err) => {
                    self.release_all(&movements).await;
                    return Err(err.into());
                }
            }
        }

        Ok(movements)
    }

    /// Compensates reservations in reverse order. Failures are logged; there
    /// is nothing left to roll back to.
    async fn release_all(&self, movements: &[StockMovement]) {
        for movement in movements.iter().rev() {
            match self
                .ledger
                .release(&movement.product_id, movement.quantity)
                .await
            {
                Ok(_) => {
                    metrics::counter!("stock_compensations_total").increment(1);
                }
                Err(err) => {
                    tracing::error!(
                        product_id = %movement.product_id,
                        quantity = movement.quantity,
                        error = %err,
                        "failed to release reserved stock"
                    );
                }
            }
        }
    }

    /// Records the coupon redemption after the order is persisted. If a
    /// concurrent order took the last use, the order is cancelled and its
    /// stock released. Stock stays reserved unless the cancellation is
    /// persisted.
    async fn redeem_coupon(
        &self,
        order: &Order,
        applied: &AppliedCoupon,
        movements: &[StockMovement],
    ) -> Result<()> {
        let usage = CouponUsage {
            user_id: order.user_id(),
            order_id: order.id(),
            discount: applied.discount,
            used_at: order.ordered_at(),
        };

        let failure = match self.store.record_usage(&applied.code, usage).await {
            Ok(UsageOutcome::Recorded { used_count }) => {
                metrics::counter!("coupon_redemptions_total").increment(1);
                tracing::debug!(coupon = %applied.code, used_count, "coupon redeemed");
                return Ok(());
            }
            Ok(UsageOutcome::Rejected(reason)) => {
                FulfillmentError::InvalidCoupon(CouponRejection::Ineligible {
                    code: applied.code.clone(),
                    reason,
                })
            }
            Err(err) => FulfillmentError::Internal(err.to_string()),
        };

        tracing::warn!(order_id = %order.id(), error = %failure, "coupon redemption failed, cancelling order");
        match self.cancel_unredeemed(order.id()).await {
            Ok(_) => {
                self.release_all(movements).await;
                Err(failure)
            }
            Err(err) => {
                tracing::error!(
                    order_id = %order.id(),
                    error = %err,
                    "order without coupon redemption could not be cancelled, keeping its stock"
                );
                Err(FulfillmentError::Internal(format!(
                    "order {} kept after failed coupon redemption ({failure}): {err}",
                    order.id()
                )))
            }
        }
    }

    async fn cancel_unredeemed(&self, order_id: OrderId) -> Result<Order> {
        let (order, _) = self
            .persist_change(order_id, |order| {
                Ok(order.change_status(
                    OrderStatus::Cancelled,
                    Actor::System,
                    Some(COUPON_EXHAUSTED_NOTE.to_string()),
                    self.clock.now(),
                )?)
            })
            .await?;
        Ok(order)
    }

    fn publish_order_placed(&self, order: &Order, movements: &[StockMovement]) {
        self.publisher
            .publish(Topic::Admin, BusMessage::OrderPlaced(OrderPlaced::from(order)));

        for movement in movements {
            self.publish_stock(movement);
        }
    }

    fn publish_stock(&self, movement: &StockMovement) {
        self.publisher.publish(
            Topic::Product(movement.product_id.clone()),
            BusMessage::StockUpdated(movement.stock_update()),
        );

        if movement.crossed_low_stock {
            metrics::counter!("low_stock_alerts_total").increment(1);
            tracing::warn!(
                product_id = %movement.product_id,
                stock = movement.current,
                threshold = movement.low_stock_threshold,
                "product crossed low-stock threshold"
            );
            self.publisher.publish(
                Topic::Admin,
                BusMessage::LowStockAlert(LowStockAlert {
                    product_id: movement.product_id.clone(),
                    name: movement.name.clone(),
                    stock: movement.current,
                    threshold: movement.low_stock_threshold,
                }),
            );
        }
    }

    /// Moves an order along the fulfilment state machine.
    ///
    /// Admins may take any allowed edge. Customers may only cancel their own
    /// orders. Cancelling restocks the line items; coupon usage stays recorded.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, status = %request.status))]
    pub async fn update_order_status(&self, request: StatusUpdate) -> Result<Order> {
        let StatusUpdate {
            order_id,
            status,
            note,
            by,
        } = request;

        let (order, event) = self
            .transition(order_id, by, |order| {
                if !by.is_admin() && status != OrderStatus::Cancelled {
                    return Err(FulfillmentError::Forbidden(
                        "customers may only cancel orders".to_string(),
                    ));
                }
                Ok(order.change_status(status, Actor::from(by), note.clone(), self.clock.now())?)
            })
            .await?;

        if status == OrderStatus::Cancelled {
            self.restock(&order).await;
        }

        metrics::counter!("order_status_transitions_total", "kind" => "order", "to" => status.as_str())
            .increment(1);
        self.publish_order_update(&order, &event);
        Ok(order)
    }

    /// Moves an order along the payment state machine. Admin only.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, status = %request.status))]
    pub async fn update_payment_status(&self, request: PaymentUpdate) -> Result<Order> {
        let PaymentUpdate {
            order_id,
            status,
            note,
            by,
        } = request;

        if !by.is_admin() {
            return Err(FulfillmentError::Forbidden(
                "only admins may change payment status".to_string(),
            ));
        }

        let (order, event) = self
            .transition(order_id, by, |order| {
                Ok(order.change_payment_status(
                    status,
                    Actor::from(by),
                    note.clone(),
                    self.clock.now(),
                )?)
            })
            .await?;

        metrics::counter!("order_status_transitions_total", "kind" => "payment", "to" => status.as_str())
            .increment(1);
        self.publish_order_update(&order, &event);
        Ok(order)
    }

    /// Runs `decide` against an order the caller may see.
    async fn transition<F>(
        &self,
        order_id: OrderId,
        by: Identity,
        decide: F,
    ) -> Result<(Order, OrderEvent)>
    where
        F: Fn(&Order) -> Result<OrderEvent>,
    {
        self.persist_change(order_id, |order| {
            if !is_visible(order, &by) {
                return Err(FulfillmentError::not_found("Order", order_id));
            }
            decide(order)
        })
        .await
    }

    /// Load, decide, apply, persist; retried when another writer updated the
    /// order in between.
    async fn persist_change<F>(&self, order_id: OrderId, decide: F) -> Result<(Order, OrderEvent)>
    where
        F: Fn(&Order) -> Result<OrderEvent>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or_else(|| FulfillmentError::not_found("Order", order_id))?;
            let event = decide(&order)?;
            order.apply(event.clone());

            match self.store.update_order(&order).await {
                Ok(version) => {
                    order.set_version(version);
                    tracing::info!(
                        event = event.event_type(),
                        from = event.old_status(),
                        to = event.new_status(),
                        "order updated"
                    );
                    return Ok((order, event));
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::debug!(attempt, "order changed concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Returns the stock of a cancelled order.
    async fn restock(&self, order: &Order) {
        for item in order.items() {
            match self.ledger.release(&item.product_id, item.quantity).await {
                Ok(movement) => self.publish_stock(&movement),
                Err(err) => {
                    tracing::warn!(
                        order_id = %order.id(),
                        product_id = %item.product_id,
                        error = %err,
                        "could not restock cancelled line"
                    );
                }
            }
        }
    }

    fn publish_order_update(&self, order: &Order, event: &OrderEvent) {
        let message = BusMessage::order_update(order, event);
        self.publisher
            .publish(Topic::User(order.user_id()), message.clone());
        self.publisher.publish(Topic::Admin, message);
    }

    /// Scores a coupon against a cart without reserving or recording anything.
    #[tracing::instrument(skip(self, check), fields(coupon = %check.code))]
    pub async fn evaluate_coupon(&self, check: CouponCheck) -> Result<CouponQuote> {
        let cart = self.price_cart(&check.items).await?;
        let coupon = self
            .store
            .get_coupon(&check.code)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Coupon", &check.code))?;

        let eligibility = evaluate(
            &coupon,
            check.user_id,
            cart.subtotal,
            &cart.coupon_lines,
            self.clock.now(),
        );
        let discount = eligibility.discount();

        Ok(CouponQuote {
            code: coupon.code,
            subtotal: cart.subtotal,
            eligibility,
            discount,
            subtotal_after_discount: cart.subtotal - discount,
        })
    }

    /// Fetches one order. Customers only see their own.
    pub async fn get_order(&self, order_id: OrderId, viewer: &Identity) -> Result<Order> {
        self.load_visible_order(order_id, viewer).await
    }

    /// Lists orders newest first. Customers are restricted to their own.
    pub async fn list_orders(&self, viewer: &Identity, query: OrderQuery) -> Result<Vec<Order>> {
        let query = if viewer.is_admin() {
            query
        } else {
            query.user_id(viewer.user_id)
        };
        Ok(self.store.list_orders(query).await?)
    }

    async fn load_visible_order(&self, order_id: OrderId, viewer: &Identity) -> Result<Order> {
        match self.store.get_order(order_id).await? {
            Some(order) if is_visible(&order, viewer) => Ok(order),
            _ => Err(FulfillmentError::not_found("Order", order_id)),
        }
    }
}

/// Maps the engine's outcome to the discount to apply, or the rejection.
fn is_visible(order: &Order, viewer: &Identity) -> bool {
    viewer.is_admin() || order.user_id() == viewer.user_id
}

fn accept_coupon(code: &domain::CouponCode, eligibility: Eligibility) -> Result<Money> {
    match eligibility {
        Eligibility::Eligible { discount, .. } => Ok(discount),
        Eligibility::Ineligible(reason) => {
            Err(FulfillmentError::InvalidCoupon(CouponRejection::Ineligible {
                code: code.clone(),
                reason,
            }))
        }
        Eligibility::BelowMinimumOrder {
            minimum,
            order_amount,
        } => Err(FulfillmentError::InvalidCoupon(
            CouponRejection::BelowMinimumOrder {
                code: code.clone(),
                minimum,
                order_amount,
            },
        )),
    }
}

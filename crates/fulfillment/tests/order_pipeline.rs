//! End-to-end tests for the order pipeline over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use common::{FixedClock, Identity, OrderId, UserId};
use domain::{
    Address, Coupon, CouponCode, CouponUsage, Discount, IneligibleReason, Money, Order,
    OrderStatus, Product, ProductId,
};
use event_bus::{BusMessage, EventBus, Subscription, Topic};
use fulfillment::{
    CartItem, CouponCheck, CouponRejection, FulfillmentError, OrderPipeline, PlaceOrder,
    StatusUpdate,
};
use futures_util::future::join_all;
use store::{
    AdjustOutcome, CouponStore, InMemoryStore, OrderQuery, OrderStore, ProductStore,
    StockAdjustment, UsageOutcome,
};

type Pipeline = OrderPipeline<InMemoryStore, EventBus>;

fn address() -> Address {
    Address {
        full_name: "Grace Hopper".to_string(),
        line1: "1 Compiler Way".to_string(),
        city: "Arlington".to_string(),
        region: Some("VA".to_string()),
        postal_code: "22201".to_string(),
        country: "US".to_string(),
        ..Default::default()
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn save10() -> Coupon {
    Coupon::new(
        "SAVE10",
        Discount::percent(10),
        now() - Duration::days(30),
        now() + Duration::days(30),
    )
    .with_minimum_order(Money::from_dollars(50))
    .with_maximum_discount(Money::from_dollars(20))
}

async fn pipeline_with(products: Vec<Product>, coupons: Vec<Coupon>) -> (Pipeline, InMemoryStore) {
    let store = InMemoryStore::new();
    for product in products {
        store.save_product(product).await.unwrap();
    }
    for coupon in coupons {
        store.save_coupon(coupon).await.unwrap();
    }
    let pipeline = OrderPipeline::new(store.clone(), EventBus::default())
        .with_clock(FixedClock::new(now()));
    (pipeline, store)
}

async fn stock_of(store: &impl ProductStore, id: &str) -> i64 {
    store
        .get_product(&ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .stock
}

fn listen(pipeline: &Pipeline, topics: &[Topic]) -> Subscription {
    let bus = pipeline.publisher();
    let subscription = bus.connect();
    for topic in topics {
        bus.subscribe(topic.clone(), subscription.id()).unwrap();
    }
    subscription
}

fn names(subscription: &mut Subscription) -> Vec<&'static str> {
    subscription
        .drain()
        .iter()
        .map(|notification| notification.message.name())
        .collect()
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn totals_and_frozen_prices() {
        let (pipeline, store) = pipeline_with(
            vec![
                Product::new("SKU-SHIRT", "Shirt", Money::from_cents(2_500), 50),
                Product::new("SKU-HAT", "Hat", Money::from_cents(1_250), 50),
            ],
            Vec::new(),
        )
        .await;

        let order = pipeline
            .create_order(PlaceOrder::new(
                UserId::new(),
                vec![CartItem::new("SKU-SHIRT", 2), CartItem::new("SKU-HAT", 1)],
                address(),
            ))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.subtotal(), Money::from_cents(6_250));
        assert_eq!(order.total_amount(), Money::from_cents(6_250));
        assert_eq!(order.billing_address(), order.shipping_address());
        assert_eq!(stock_of(&store, "SKU-SHIRT").await, 48);
        assert_eq!(stock_of(&store, "SKU-HAT").await, 49);

        // Repricing the catalogue does not touch placed orders.
        let mut shirt = store
            .get_product(&ProductId::new("SKU-SHIRT"))
            .await
            .unwrap()
            .unwrap();
        shirt.price = Money::from_cents(9_900);
        store.save_product(shirt).await.unwrap();

        let admin = Identity::admin(UserId::new());
        let stored = pipeline.get_order(order.id(), &admin).await.unwrap();
        assert_eq!(stored.items()[0].unit_price, Money::from_cents(2_500));
        assert_eq!(stored.total_amount(), Money::from_cents(6_250));
    }

    #[tokio::test]
    async fn failed_line_releases_earlier_reservations() {
        let (pipeline, store) = pipeline_with(
            vec![
                Product::new("SKU-A", "Alpha", Money::from_dollars(10), 10),
                Product::new("SKU-B", "Beta", Money::from_dollars(10), 10),
                Product::new("SKU-C", "Gamma", Money::from_dollars(10), 1),
            ],
            Vec::new(),
        )
        .await;
        let mut admin_feed = listen(&pipeline, &[Topic::Admin, Topic::product("SKU-A")]);

        let err = pipeline
            .create_order(PlaceOrder::new(
                UserId::new(),
                vec![
                    CartItem::new("SKU-A", 2),
                    CartItem::new("SKU-B", 3),
                    CartItem::new("SKU-C", 2),
                ],
                address(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::InsufficientStock {
                ref product_id,
                requested: 2,
                available: 1,
            } if product_id.as_str() == "SKU-C"
        ));
        assert_eq!(stock_of(&store, "SKU-A").await, 10);
        assert_eq!(stock_of(&store, "SKU-B").await, 10);
        assert_eq!(stock_of(&store, "SKU-C").await, 1);
        assert_eq!(store.order_count().await, 0);
        assert!(names(&mut admin_feed).is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (pipeline, _store) = pipeline_with(Vec::new(), Vec::new()).await;
        let err = pipeline
            .create_order(PlaceOrder::new(
                UserId::new(),
                vec![CartItem::new("SKU-NOPE", 1)],
                address(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "Product", .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_unit_is_sold_exactly_once() {
        let (pipeline, store) = pipeline_with(
            vec![Product::new("SKU-LAST", "Last one", Money::from_dollars(99), 1)],
            Vec::new(),
        )
        .await;
        let pipeline = Arc::new(pipeline);

        let attempts = (0..2).map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .create_order(PlaceOrder::new(
                        UserId::new(),
                        vec![CartItem::new("SKU-LAST", 1)],
                        address(),
                    ))
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results.iter().any(|result| matches!(
            result,
            Err(FulfillmentError::InsufficientStock { available: 0, .. })
        )));
        assert_eq!(stock_of(&store, "SKU-LAST").await, 0);
        assert_eq!(store.order_count().await, 1);
    }
}

mod coupons {
    use super::*;

    #[tokio::test]
    async fn save10_discounts_qualifying_orders_only() {
        let (pipeline, store) = pipeline_with(
            vec![
                Product::new("SKU-DESK", "Desk", Money::from_dollars(300), 5),
                Product::new("SKU-PEN", "Pen", Money::from_dollars(40), 5),
            ],
            vec![save10()],
        )
        .await;
        let user = UserId::new();

        let order = pipeline
            .create_order(
                PlaceOrder::new(user, vec![CartItem::new("SKU-DESK", 1)], address())
                    .with_coupon("save10"),
            )
            .await
            .unwrap();
        assert_eq!(order.subtotal(), Money::from_dollars(300));
        assert_eq!(order.discount_amount(), Money::from_dollars(20));
        assert_eq!(order.total_amount(), Money::from_dollars(280));

        let coupon = store.get_coupon(&CouponCode::new("SAVE10")).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
        assert_eq!(coupon.uses_by(user), 1);

        let err = pipeline
            .create_order(
                PlaceOrder::new(user, vec![CartItem::new("SKU-PEN", 1)], address())
                    .with_coupon("SAVE10"),
            )
            .await
            .unwrap_err();
        let FulfillmentError::InvalidCoupon(CouponRejection::BelowMinimumOrder {
            minimum,
            order_amount,
            ..
        }) = err
        else {
            panic!("expected a minimum-order rejection, got {err:?}");
        };
        assert_eq!(minimum, Money::from_dollars(50));
        assert_eq!(order_amount, Money::from_dollars(40));
        assert_eq!(stock_of(&store, "SKU-PEN").await, 5);
    }

    #[tokio::test]
    async fn fixed_amount_coupon_is_taken_off_the_subtotal() {
        let coupon = Coupon::new(
            "TWENTY",
            Discount::fixed(Money::from_dollars(25)),
            now() - Duration::days(1),
            now() + Duration::days(1),
        );
        let (pipeline, _store) = pipeline_with(
            vec![Product::new("SKU-CHAIR", "Chair", Money::from_dollars(300), 5)],
            vec![coupon],
        )
        .await;

        let order = pipeline
            .create_order(
                PlaceOrder::new(UserId::new(), vec![CartItem::new("SKU-CHAIR", 1)], address())
                    .with_coupon("TWENTY"),
            )
            .await
            .unwrap();
        assert_eq!(order.discount_amount(), Money::from_dollars(25));
        assert_eq!(order.total_amount(), Money::from_dollars(275));
    }

    #[tokio::test]
    async fn per_user_limit_is_never_exceeded() {
        let (pipeline, store) = pipeline_with(
            vec![Product::new("SKU-DESK", "Desk", Money::from_dollars(300), 10)],
            vec![save10().with_usage_limit_per_user(1)],
        )
        .await;
        let first_user = UserId::new();
        let place = |user| {
            PlaceOrder::new(user, vec![CartItem::new("SKU-DESK", 1)], address()).with_coupon("SAVE10")
        };

        pipeline.create_order(place(first_user)).await.unwrap();
        let err = pipeline.create_order(place(first_user)).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::InvalidCoupon(CouponRejection::Ineligible {
                reason: IneligibleReason::PerUserLimitReached { limit: 1 },
                ..
            })
        ));

        pipeline.create_order(place(UserId::new())).await.unwrap();

        let coupon = store.get_coupon(&CouponCode::new("SAVE10")).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 2);
        assert_eq!(coupon.uses_by(first_user), 1);
        assert_eq!(stock_of(&store, "SKU-DESK").await, 8);
    }

    #[tokio::test]
    async fn cancelling_keeps_the_redemption() {
        let (pipeline, store) = pipeline_with(
            vec![Product::new("SKU-DESK", "Desk", Money::from_dollars(300), 10)],
            vec![save10().with_usage_limit_per_user(1)],
        )
        .await;
        let user = UserId::new();
        let place =
            || PlaceOrder::new(user, vec![CartItem::new("SKU-DESK", 1)], address()).with_coupon("SAVE10");

        let order = pipeline.create_order(place()).await.unwrap();
        pipeline
            .update_order_status(StatusUpdate::new(
                order.id(),
                OrderStatus::Cancelled,
                Identity::customer(user),
            ))
            .await
            .unwrap();

        let coupon = store.get_coupon(&CouponCode::new("SAVE10")).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
        assert_eq!(coupon.usage_history.len(), 1);
        assert_eq!(coupon.usage_history[0].order_id, order.id());
        assert_eq!(stock_of(&store, "SKU-DESK").await, 10);

        let err = pipeline.create_order(place()).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidCoupon(_)));
    }

    #[tokio::test]
    async fn quote_reports_ineligibility_without_side_effects() {
        let (pipeline, store) = pipeline_with(
            vec![Product::new("SKU-PEN", "Pen", Money::from_dollars(40), 5)],
            vec![save10()],
        )
        .await;

        let quote = pipeline
            .evaluate_coupon(CouponCheck {
                user_id: UserId::new(),
                code: CouponCode::new("SAVE10"),
                items: vec![CartItem::new("SKU-PEN", 2)],
            })
            .await
            .unwrap();
        assert!(quote.eligibility.is_eligible());
        assert_eq!(quote.discount, Money::from_dollars(8));
        assert_eq!(quote.subtotal_after_discount, Money::from_dollars(72));

        let quote = pipeline
            .evaluate_coupon(CouponCheck {
                user_id: UserId::new(),
                code: CouponCode::new("SAVE10"),
                items: vec![CartItem::new("SKU-PEN", 1)],
            })
            .await
            .unwrap();
        assert!(!quote.eligibility.is_eligible());
        assert_eq!(quote.discount, Money::zero());

        let coupon = store.get_coupon(&CouponCode::new("SAVE10")).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 0);
        assert_eq!(stock_of(&store, "SKU-PEN").await, 5);
    }

    #[tokio::test]
    async fn unknown_coupon_is_not_found() {
        let (pipeline, _store) = pipeline_with(
            vec![Product::new("SKU-PEN", "Pen", Money::from_dollars(40), 5)],
            Vec::new(),
        )
        .await;
        let err = pipeline
            .create_order(
                PlaceOrder::new(UserId::new(), vec![CartItem::new("SKU-PEN", 1)], address())
                    .with_coupon("GHOST"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "Coupon", .. }));
    }

    /// Serves coupons from a snapshot taken before the last use was spent,
    /// so redemption loses the race after the order is persisted. An admin
    /// can move the order along while the usage is being recorded.
    #[derive(Clone)]
    struct StaleCoupons {
        inner: InMemoryStore,
        snapshot: Coupon,
        advance_to: Vec<OrderStatus>,
    }

    impl StaleCoupons {
        async fn advance(&self, order_id: OrderId) {
            for status in &self.advance_to {
                let mut order = self.inner.get_order(order_id).await.unwrap().unwrap();
                let event = order
                    .change_status(*status, domain::Actor::Admin(UserId::new()), None, now())
                    .unwrap();
                order.apply(event);
                self.inner.update_order(&order).await.unwrap();
            }
        }
    }

    #[async_trait]
    impl ProductStore for StaleCoupons {
        async fn get_product(&self, id: &ProductId) -> store::Result<Option<Product>> {
            self.inner.get_product(id).await
        }

        async fn save_product(&self, product: Product) -> store::Result<()> {
            self.inner.save_product(product).await
        }

        async fn adjust_stock(
            &self,
            id: &ProductId,
            adjustment: StockAdjustment,
        ) -> store::Result<AdjustOutcome> {
            self.inner.adjust_stock(id, adjustment).await
        }
    }

    #[async_trait]
    impl OrderStore for StaleCoupons {
        async fn insert_order(&self, order: &Order) -> store::Result<u64> {
            self.inner.insert_order(order).await
        }

        async fn get_order(&self, id: OrderId) -> store::Result<Option<Order>> {
            self.inner.get_order(id).await
        }

        async fn update_order(&self, order: &Order) -> store::Result<u64> {
            self.inner.update_order(order).await
        }

        async fn list_orders(&self, query: OrderQuery) -> store::Result<Vec<Order>> {
            self.inner.list_orders(query).await
        }
    }

    #[async_trait]
    impl CouponStore for StaleCoupons {
        async fn get_coupon(&self, _code: &CouponCode) -> store::Result<Option<Coupon>> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn save_coupon(&self, coupon: Coupon) -> store::Result<()> {
            self.inner.save_coupon(coupon).await
        }

        async fn record_usage(
            &self,
            code: &CouponCode,
            usage: CouponUsage,
        ) -> store::Result<UsageOutcome> {
            self.advance(usage.order_id).await;
            self.inner.record_usage(code, usage).await
        }
    }

    async fn racing_pipeline(
        advance_to: Vec<OrderStatus>,
    ) -> (OrderPipeline<StaleCoupons, EventBus>, InMemoryStore) {
        let inner = InMemoryStore::new();
        inner
            .save_product(Product::new("SKU-DESK", "Desk", Money::from_dollars(300), 3))
            .await
            .unwrap();
        let snapshot = save10().with_usage_limit(1);
        let mut spent = snapshot.clone();
        spent.record_usage(CouponUsage {
            user_id: UserId::new(),
            order_id: OrderId::new(),
            discount: Money::from_dollars(20),
            used_at: now(),
        });
        inner.save_coupon(spent).await.unwrap();

        let store = StaleCoupons {
            inner: inner.clone(),
            snapshot,
            advance_to,
        };
        let pipeline = OrderPipeline::new(store, EventBus::default()).with_clock(FixedClock::new(now()));
        (pipeline, inner)
    }

    fn desks_with_coupon(user: UserId) -> PlaceOrder {
        PlaceOrder::new(user, vec![CartItem::new("SKU-DESK", 2)], address()).with_coupon("SAVE10")
    }

    #[tokio::test]
    async fn exhausted_coupon_cancels_the_persisted_order() {
        let (pipeline, inner) = racing_pipeline(Vec::new()).await;
        let user = UserId::new();

        let err = pipeline.create_order(desks_with_coupon(user)).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::InvalidCoupon(CouponRejection::Ineligible {
                reason: IneligibleReason::UsageLimitReached { limit: 1 },
                ..
            })
        ));

        assert_eq!(stock_of(&inner, "SKU-DESK").await, 3);
        let orders = inner.list_orders(OrderQuery::for_user(user)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status(), OrderStatus::Cancelled);
        assert_eq!(orders[0].status_history().last().unwrap().actor, domain::Actor::System);

        let coupon = inner.get_coupon(&CouponCode::new("SAVE10")).await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
    }

    #[tokio::test]
    async fn cancellation_reloads_an_order_that_moved_meanwhile() {
        let (pipeline, inner) = racing_pipeline(vec![OrderStatus::Confirmed]).await;
        let user = UserId::new();

        let err = pipeline.create_order(desks_with_coupon(user)).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidCoupon(_)));

        let orders = inner.list_orders(OrderQuery::for_user(user)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status(), OrderStatus::Cancelled);
        assert_eq!(orders[0].status_history().len(), 3);
        assert_eq!(stock_of(&inner, "SKU-DESK").await, 3);
    }

    #[tokio::test]
    async fn order_that_cannot_be_cancelled_keeps_its_stock() {
        let (pipeline, inner) = racing_pipeline(vec![
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ])
        .await;
        let user = UserId::new();

        let err = pipeline.create_order(desks_with_coupon(user)).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::Internal(_)));

        let orders = inner.list_orders(OrderQuery::for_user(user)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status(), OrderStatus::Shipped);
        assert_eq!(stock_of(&inner, "SKU-DESK").await, 1);
    }
}

mod transitions {
    use super::*;

    async fn placed() -> (Pipeline, InMemoryStore, Order) {
        let (pipeline, store) = pipeline_with(
            vec![Product::new("SKU-BOX", "Box", Money::from_dollars(15), 30)],
            Vec::new(),
        )
        .await;
        let order = pipeline
            .create_order(PlaceOrder::new(
                UserId::new(),
                vec![CartItem::new("SKU-BOX", 3)],
                address(),
            ))
            .await
            .unwrap();
        (pipeline, store, order)
    }

    async fn move_to(pipeline: &Pipeline, order: &Order, status: OrderStatus) -> fulfillment::Result<Order> {
        pipeline
            .update_order_status(StatusUpdate::new(
                order.id(),
                status,
                Identity::admin(UserId::new()),
            ))
            .await
    }

    #[tokio::test]
    async fn only_table_edges_are_taken() {
        let (pipeline, _store, order) = placed().await;

        let err = move_to(&pipeline, &order, OrderStatus::Shipped).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::InvalidTransition { ref from, ref to } if from == "pending" && to == "shipped"
        ));
        let unchanged = pipeline
            .get_order(order.id(), &Identity::admin(UserId::new()))
            .await
            .unwrap();
        assert_eq!(unchanged, order);

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            move_to(&pipeline, &order, status).await.unwrap();
        }

        let err = move_to(&pipeline, &order, OrderStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition { .. }));

        let delivered = move_to(&pipeline, &order, OrderStatus::Returned).await.unwrap();
        assert_eq!(delivered.status(), OrderStatus::Returned);
        assert!(delivered.delivered_at().is_some());
        assert_eq!(delivered.status_history().len(), 6);
    }

    #[tokio::test]
    async fn cancelling_restocks_and_notifies_owner_and_admins() {
        let (pipeline, store, order) = placed().await;
        assert_eq!(stock_of(&store, "SKU-BOX").await, 27);
        let mut owner_feed = listen(&pipeline, &[Topic::User(order.user_id())]);
        let mut admin_feed = listen(&pipeline, &[Topic::Admin]);
        let mut product_feed = listen(&pipeline, &[Topic::product("SKU-BOX")]);

        let cancelled = move_to(&pipeline, &order, OrderStatus::Cancelled).await.unwrap();
        assert!(cancelled.cancelled_at().is_some());
        assert_eq!(stock_of(&store, "SKU-BOX").await, 30);

        let owner = owner_feed.drain();
        assert_eq!(owner.len(), 1);
        let BusMessage::OrderStatusChanged(update) = &owner[0].message else {
            panic!("expected a status update");
        };
        assert_eq!(update.old_status, "pending");
        assert_eq!(update.new_status, "cancelled");

        assert_eq!(names(&mut admin_feed), vec!["order_status_changed"]);
        assert_eq!(names(&mut product_feed), vec!["stock_updated"]);
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn low_stock_alert_fires_once_per_crossing() {
        let (pipeline, _store) = pipeline_with(
            vec![Product::new("SKU-LAMP", "Lamp", Money::from_dollars(30), 12).with_low_stock_threshold(10)],
            Vec::new(),
        )
        .await;
        let mut admin_feed = listen(&pipeline, &[Topic::Admin]);
        let mut product_feed = listen(&pipeline, &[Topic::product("SKU-LAMP")]);
        let user = UserId::new();

        pipeline
            .create_order(PlaceOrder::new(user, vec![CartItem::new("SKU-LAMP", 5)], address()))
            .await
            .unwrap();
        pipeline
            .create_order(PlaceOrder::new(user, vec![CartItem::new("SKU-LAMP", 3)], address()))
            .await
            .unwrap();

        assert_eq!(
            names(&mut admin_feed),
            vec!["order_placed", "low_stock_alert", "order_placed"]
        );

        let stock: Vec<_> = product_feed
            .drain()
            .iter()
            .map(|notification| match &notification.message {
                BusMessage::StockUpdated(update) => (update.stock, update.low_stock),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(stock, vec![(7, true), (4, true)]);
    }

    #[tokio::test]
    async fn rejected_orders_publish_nothing() {
        let (pipeline, _store) = pipeline_with(
            vec![Product::new("SKU-LAMP", "Lamp", Money::from_dollars(30), 1)],
            Vec::new(),
        )
        .await;
        let mut feed = listen(&pipeline, &[Topic::Admin, Topic::product("SKU-LAMP")]);

        pipeline
            .create_order(PlaceOrder::new(
                UserId::new(),
                vec![CartItem::new("SKU-LAMP", 2)],
                address(),
            ))
            .await
            .unwrap_err();
        assert!(feed.try_recv().is_none());
    }
}

use chrono::{Duration, Utc};
use common::UserId;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::{
    Actor, Address, Coupon, CouponLine, CouponScope, Discount, LineItem, Money, Order, OrderDraft,
    OrderStatus, PaymentMethod, evaluate,
};

fn bench_evaluate_coupon(c: &mut Criterion) {
    let now = Utc::now();
    let user = UserId::new();
    let coupon = Coupon::new(
        "BENCH15",
        Discount::percent(15),
        now - Duration::days(1),
        now + Duration::days(1),
    )
    .with_maximum_discount(Money::from_dollars(50))
    .with_scope(CouponScope {
        applicable_categories: vec!["even".into()],
        ..Default::default()
    });
    let lines: Vec<CouponLine> = (0..50)
        .map(|i| CouponLine {
            product_id: format!("SKU-{i:03}").into(),
            category: Some(if i % 2 == 0 { "even" } else { "odd" }.into()),
            amount: Money::from_cents(1000 + i),
        })
        .collect();
    let total: Money = lines.iter().map(|line| line.amount).sum();

    c.bench_function("domain/evaluate_coupon_50_lines", |b| {
        b.iter(|| evaluate(black_box(&coupon), user, total, black_box(&lines), now));
    });
}

fn bench_order_lifecycle(c: &mut Criterion) {
    let draft = OrderDraft {
        user_id: UserId::new(),
        items: (0..10)
            .map(|i| {
                LineItem::new(
                    format!("SKU-{i:03}"),
                    "Benchmark Widget",
                    format!("BW-{i}"),
                    Money::from_cents(1000),
                    2,
                )
            })
            .collect(),
        shipping_address: Address::default(),
        billing_address: None,
        payment_method: PaymentMethod::Card,
        tax_amount: Money::zero(),
        shipping_amount: Money::zero(),
        coupon: None,
        note: None,
    };

    c.bench_function("domain/place_and_deliver_order", |b| {
        b.iter(|| {
            let now = Utc::now();
            let mut order = Order::place(draft.clone(), now).unwrap();
            for next in [
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ] {
                let event = order.change_status(next, Actor::System, None, now).unwrap();
                order.apply(event);
            }
            order
        });
    });
}

criterion_group!(benches, bench_evaluate_coupon, bench_order_lifecycle);
criterion_main!(benches);

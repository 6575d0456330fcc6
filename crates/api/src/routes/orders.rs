//! Order placement, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, UserId};
use domain::{
    Actor, Address, HistoryEntry, LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus,
};
use fulfillment::{CartItem, PaymentUpdate, PlaceOrder, StatusUpdate};
use serde::{Deserialize, Serialize};
use store::{OrderQuery, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartItem>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentStatusChangeRequest {
    pub status: PaymentStatus,
    pub note: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub ordered_at: String,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub status_history: Vec<HistoryEntryResponse>,
    pub payment_history: Vec<HistoryEntryResponse>,
    pub version: u64,
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub status: &'static str,
    pub at: String,
    pub actor: Actor,
    pub note: Option<String>,
}

impl HistoryEntryResponse {
    fn from_entry<T: Copy>(entry: &HistoryEntry<T>, name: impl Fn(T) -> &'static str) -> Self {
        Self {
            status: name(entry.status),
            at: entry.at.to_rfc3339(),
            actor: entry.actor,
            note: entry.note.clone(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let pricing = order.pricing();
        Self {
            id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status(),
            payment_status: order.payment_status(),
            payment_method: order.payment_method(),
            items: order.items().to_vec(),
            subtotal_cents: pricing.subtotal.cents(),
            discount_cents: pricing.discount_amount.cents(),
            tax_cents: pricing.tax_amount.cents(),
            shipping_cents: pricing.shipping_amount.cents(),
            total_cents: pricing.total().cents(),
            coupon_code: order.coupon().map(|c| c.code.to_string()),
            shipping_address: order.shipping_address().clone(),
            billing_address: order.billing_address().clone(),
            ordered_at: order.ordered_at().to_rfc3339(),
            delivered_at: order.delivered_at().map(|at| at.to_rfc3339()),
            cancelled_at: order.cancelled_at().map(|at| at.to_rfc3339()),
            cancellation_reason: order.cancellation_reason().map(String::from),
            status_history: order
                .status_history()
                .iter()
                .map(|entry| HistoryEntryResponse::from_entry(entry, |s: OrderStatus| s.as_str()))
                .collect(),
            payment_history: order
                .payment_history()
                .iter()
                .map(|entry| {
                    HistoryEntryResponse::from_entry(entry, |s: PaymentStatus| s.as_str())
                })
                .collect(),
            version: order.version(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order for the calling user.
#[tracing::instrument(skip(state, req), fields(user_id = %caller.0.user_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let mut request = PlaceOrder::new(caller.0.user_id, req.items, req.shipping_address)
        .with_payment_method(req.payment_method);
    if let Some(address) = req.billing_address {
        request = request.with_billing_address(address);
    }
    if let Some(code) = req.coupon_code.as_deref() {
        request = request.with_coupon(code);
    }
    if let Some(note) = req.note {
        request = request.with_note(note);
    }

    let order = state.pipeline.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: list orders, newest first. Customers see only their own.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(user_id) = params.user_id {
        query = query.user_id(user_id);
    }
    if let Some(status) = params.status {
        query = query.status(status);
    }
    if let Some(status) = params.payment_status {
        query = query.payment_status(status);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let orders = state.pipeline.list_orders(&caller.0, query).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.pipeline.get_order(order_id, &caller.0).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/status: move the order along its fulfilment states.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let mut update = StatusUpdate::new(order_id, req.status, caller.0);
    if let Some(note) = req.note {
        update = update.with_note(note);
    }

    let order = state.pipeline.update_order_status(update).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/payment-status: record a payment outcome. Admin only.
#[tracing::instrument(skip(state, req))]
pub async fn update_payment_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<PaymentStatusChangeRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let mut update = PaymentUpdate::new(order_id, req.status, caller.0);
    if let Some(note) = req.note {
        update = update.with_note(note);
    }

    let order = state.pipeline.update_payment_status(update).await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

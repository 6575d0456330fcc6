//! HTTP API server for the storefront order-fulfillment core.
//!
//! Exposes order placement, order and payment status changes, coupon
//! validation and catalog upserts over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use event_bus::EventBus;
use fulfillment::OrderPipeline;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub pipeline: OrderPipeline<S, EventBus>,
    pub bus: EventBus,
    /// Which store backs the pipeline, reported by `/health`.
    pub backend: &'static str,
}

impl<S: Store + Clone> AppState<S> {
    pub fn new(store: S, bus: EventBus, backend: &'static str) -> Self {
        Self {
            pipeline: OrderPipeline::new(store, bus.clone()),
            bus,
            backend,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::update_status::<S>))
        .route(
            "/orders/{id}/payment-status",
            post(routes::orders::update_payment_status::<S>),
        )
        .route("/coupons/validate", post(routes::coupons::validate::<S>))
        .route("/admin/products/{id}", put(routes::admin::put_product::<S>))
        .route("/admin/coupons/{code}", put(routes::admin::put_coupon::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

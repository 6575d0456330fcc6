//! Coupon validation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::CouponCode;
use fulfillment::{CartItem, CouponCheck, CouponQuote};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;

#[derive(Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub items: Vec<CartItem>,
}

/// POST /coupons/validate: quote a coupon against a cart without redeeming it.
#[tracing::instrument(skip(state, req))]
pub async fn validate<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Json(req): Json<ValidateCouponRequest>,
) -> Result<Json<CouponQuote>, ApiError> {
    let quote = state
        .pipeline
        .evaluate_coupon(CouponCheck {
            user_id: caller.0.user_id,
            code: CouponCode::new(&req.code),
            items: req.items,
        })
        .await?;
    Ok(Json(quote))
}

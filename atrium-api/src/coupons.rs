use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use atrium_booking::CouponPreview;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/coupons/validate", post(validate_coupon))
}

#[derive(Debug, Deserialize)]
struct ValidateCouponRequest {
    code: String,
    amount: i64,
}

async fn validate_coupon(
    State(state): State<AppState>,
    Json(req): Json<ValidateCouponRequest>,
) -> Result<Json<CouponPreview>, ApiError> {
    let preview = state.gate.validate_coupon(&req.code, req.amount).await?;
    Ok(Json(preview))
}

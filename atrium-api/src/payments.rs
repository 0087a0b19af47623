use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use atrium_booking::SubmitPaymentRequest;
use atrium_core::payment::Payment;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", post(submit_payment))
        .route("/v1/payments/{id}", get(get_payment))
}

#[derive(Debug, Serialize)]
struct PaymentResponse {
    #[serde(flatten)]
    payment: Payment,
    currency: String,
}

impl PaymentResponse {
    fn new(state: &AppState, payment: Payment) -> Self {
        Self {
            payment,
            currency: state.currency.clone(),
        }
    }
}

/// A declined attempt is still a created resource: the response carries the
/// payment with status FAILED and the booking stays PENDING for a retry.
async fn submit_payment(
    State(state): State<AppState>,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = state.gate.submit_payment(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse::new(&state, payment)),
    ))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.gate.payment(id).await?;
    Ok(Json(PaymentResponse::new(&state, payment)))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atrium_booking::models::Booking;
use atrium_booking::CreateBookingRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    #[serde(flatten)]
    booking: Booking,
    currency: String,
}

impl BookingResponse {
    fn new(state: &AppState, booking: Booking) -> Self {
        Self {
            booking,
            currency: state.currency.clone(),
        }
    }
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = state.coordinator.create_booking(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::new(&state, booking)),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.coordinator.booking(id).await?;
    Ok(Json(BookingResponse::new(&state, booking)))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    customer_id: Uuid,
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = state
        .coordinator
        .customer_bookings(params.customer_id)
        .await?;
    Ok(Json(
        bookings
            .into_iter()
            .map(|booking| BookingResponse::new(&state, booking))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    actor_id: Uuid,
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.coordinator.cancel_booking(id, req.actor_id).await?;
    Ok(Json(BookingResponse::new(&state, booking)))
}

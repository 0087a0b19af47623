use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use atrium_booking::{AvailabilityFilter, BookingError};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/availability/stream", get(stream_availability))
        .route("/v1/hotels/{hotel_id}/availability", get(hotel_availability))
}

/// Live availability deltas as server-sent events. The query string narrows
/// the feed to one room category or one hotel; with no filter the client
/// gets everything. Events before the subscription are gone, so clients
/// pair this with the snapshot endpoint.
async fn stream_availability(
    State(state): State<AppState>,
    Query(filter): Query<AvailabilityFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.broadcaster.subscribe(filter).map(|event| {
        let sse = Event::default()
            .event(event.kind.as_str())
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().comment("unserializable event"));
        Ok::<_, Infallible>(sse)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize)]
struct CategoryAvailability {
    room_category_id: Uuid,
    name: String,
    max_guests: u32,
    total_units: u32,
    available_units: u32,
}

/// Current counts for every room category of a hotel, for the initial
/// render before switching to the stream.
async fn hotel_availability(
    State(state): State<AppState>,
    Path(hotel_id): Path<Uuid>,
) -> Result<Json<Vec<CategoryAvailability>>, ApiError> {
    if state.catalog.hotel_operator(hotel_id).await?.is_none() {
        return Err(BookingError::NotFound {
            entity: "Hotel",
            id: hotel_id.to_string(),
        }
        .into());
    }

    let categories = state.catalog.hotel_categories(hotel_id).await?;
    Ok(Json(
        categories
            .into_iter()
            .map(|category| CategoryAvailability {
                room_category_id: category.id,
                name: category.name,
                max_guests: category.max_guests,
                total_units: category.total_units,
                available_units: category.available_units,
            })
            .collect(),
    ))
}

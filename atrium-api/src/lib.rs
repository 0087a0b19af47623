use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod availability;
pub mod bookings;
pub mod coupons;
pub mod error;
pub mod payments;
pub mod state;

pub use state::AppState;

/// Assemble the full HTTP surface over a wired [`AppState`].
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(bookings::routes())
        .merge(payments::routes())
        .merge(coupons::routes())
        .merge(availability::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy from config. "*" or an unparseable origin means permissive.
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    match allowed_origin {
        "*" => cors.allow_origin(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => cors.allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS origin in config, allowing any");
                cors.allow_origin(Any)
            }
        },
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

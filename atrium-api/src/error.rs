use atrium_booking::repository::StoreError;
use atrium_booking::BookingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Translates the booking core's failure taxonomy into HTTP responses.
/// Client mistakes echo their message; internal trouble is logged in full
/// and answered with a generic body.
#[derive(Debug)]
pub struct ApiError(BookingError);

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(BookingError::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BookingError::OutOfInventory { .. } => (StatusCode::CONFLICT, self.0.to_string()),
            BookingError::InvalidCoupon(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            BookingError::InvalidState(_) => (StatusCode::CONFLICT, self.0.to_string()),
            BookingError::Forbidden(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            BookingError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            BookingError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            BookingError::Provider(_) => {
                tracing::error!("Payment provider failure: {}", self.0);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment provider unavailable".to_string(),
                )
            }
            BookingError::Invariant(_) | BookingError::Store(_) => {
                tracing::error!("Internal error: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let response = ApiError::from(BookingError::Forbidden("not yours".to_string()));
        assert_eq!(
            response.into_response().status(),
            StatusCode::FORBIDDEN
        );

        let response = ApiError::from(BookingError::OutOfInventory {
            requested: 1,
            available: 0,
        });
        assert_eq!(response.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_trouble_is_a_500() {
        let response = ApiError::from(StoreError::Backend("pool exhausted".to_string()));
        assert_eq!(
            response.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

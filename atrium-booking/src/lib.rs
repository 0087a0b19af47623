pub mod coordinator;
pub mod events;
pub mod gate;
pub mod models;
pub mod repository;

pub use coordinator::{CreateBookingRequest, ReservationCoordinator};
pub use events::{
    AvailabilityBroadcaster, AvailabilityEvent, AvailabilityEventKind, AvailabilityFilter,
    AvailabilitySubscription,
};
pub use gate::{CouponPreview, PaymentGate, SubmitPaymentRequest};
pub use models::{Booking, BookingStatus};
pub use repository::{
    BookingStore, CatalogStore, CouponStore, InventoryLedger, LedgerError, PaymentStore,
    StoreError, StoreResult,
};

/// Failure taxonomy for the booking core. Every fallible operation in the
/// coordinator and the payment gate resolves to one of these, so callers can
/// tell a sold-out room from a bad coupon from a storage outage.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("No units available: requested {requested}, available {available}")]
    OutOfInventory { requested: u32, available: u32 },

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    /// A stored counter or record contradicts its own bounds. Never returned
    /// for ordinary user mistakes; seeing one means a write path has a bug.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => BookingError::NotFound {
                entity: "Room category",
                id: id.to_string(),
            },
            LedgerError::OutOfInventory {
                requested,
                available,
            } => BookingError::OutOfInventory {
                requested,
                available,
            },
            LedgerError::ExceedsCapacity { .. } => BookingError::Invariant(err.to_string()),
            LedgerError::Backend(msg) => BookingError::Store(StoreError::Backend(msg)),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

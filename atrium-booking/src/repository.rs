use async_trait::async_trait;
use atrium_catalog::{Coupon, PriceTier, RoomCategory};
use atrium_core::payment::Payment;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus};

/// Failures coming out of a storage backend. `Conflict` signals a write the
/// backend refused because it would break an integrity rule (a duplicate
/// live payment, a status that already moved, a counter past its bound);
/// everything else (connection loss, serialization, pool exhaustion) is
/// `Backend`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the two ledger operations. Split from [`StoreError`] because
/// `OutOfInventory` is an expected outcome the coordinator acts on, not a
/// storage fault.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Room category {0} not found")]
    NotFound(Uuid),
    #[error("No units available: requested {requested}, available {available}")]
    OutOfInventory { requested: u32, available: u32 },
    #[error(
        "Release exceeds capacity for room category {room_category_id}: \
         {available} available + {released} released > {total} total"
    )]
    ExceedsCapacity {
        room_category_id: Uuid,
        available: u32,
        released: u32,
        total: u32,
    },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// The availability counter for room categories. Both operations are atomic
/// check-and-update: when two requests race for the last unit, exactly one
/// `reserve` wins and the other sees `OutOfInventory`.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Take `units` off the category's availability. Returns the count left
    /// after the reservation.
    async fn reserve(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError>;

    /// Put `units` back. Returns the count after the release. A release that
    /// would push availability past `total_units` is refused with
    /// `ExceedsCapacity`; that only happens when a caller releases a hold
    /// twice, and it must be surfaced, not absorbed.
    async fn release(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError>;
}

/// Read access to hotels, room categories and their price tables.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn room_category(&self, id: Uuid) -> StoreResult<Option<RoomCategory>>;

    async fn price_tiers(&self, room_category_id: Uuid) -> StoreResult<Vec<PriceTier>>;

    /// Categories of one hotel, for availability snapshots.
    async fn hotel_categories(&self, hotel_id: Uuid) -> StoreResult<Vec<RoomCategory>>;

    /// The account that operates the hotel, if the hotel exists.
    async fn hotel_operator(&self, hotel_id: Uuid) -> StoreResult<Option<Uuid>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Cancel the booking and put its inventory back in one atomic step:
    /// the compare-and-set from `from` to CANCELLED and the availability
    /// increment commit together or not at all. Returns the availability
    /// after the release, or `None` when the stored status no longer matched
    /// `from`, which is how racing cancels resolve to exactly one winner. A
    /// release that would push availability past `total_units` rolls the
    /// whole step back with `Conflict`.
    async fn cancel_and_release(
        &self,
        id: Uuid,
        from: BookingStatus,
        room_category_id: Uuid,
        units: u32,
    ) -> StoreResult<Option<u32>>;

    /// A customer's bookings, newest first.
    async fn customer_bookings(&self, customer_id: Uuid) -> StoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Record a fresh PENDING attempt. Rejected with `Conflict` when the
    /// booking already carries a payment that is not FAILED.
    async fn create_payment(&self, payment: &Payment) -> StoreResult<()>;

    async fn payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;

    /// The booking's PENDING or COMPLETED payment, if one exists. FAILED
    /// attempts do not count; the customer may retry after a decline.
    async fn live_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>>;

    /// Settlement succeeded: mark the payment COMPLETED with the provider's
    /// reference, confirm the booking, and count the coupon redemption if one
    /// was applied. One atomic write; a settled payment must never be visible
    /// next to a still-pending booking.
    async fn complete_payment(
        &self,
        payment_id: Uuid,
        booking_id: Uuid,
        transaction_ref: &str,
        redeemed_coupon: Option<&str>,
    ) -> StoreResult<()>;

    /// Settlement declined or errored: mark the attempt FAILED. The booking
    /// row is untouched.
    async fn fail_payment(&self, payment_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn coupon(&self, code: &str) -> StoreResult<Option<Coupon>>;
}

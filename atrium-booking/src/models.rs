use atrium_catalog::RoomCategory;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BookingError, BookingResult};

/// Lifecycle of a booking.
///
/// ```text
/// PENDING ---> CONFIRMED ---> COMPLETED
///    |             |
///    +-----> CANCELLED <------+
/// ```
///
/// `COMPLETED` is reached by the checkout sweep after the stay ends, never by
/// a guest-facing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Active bookings hold one inventory unit.
    pub fn holds_inventory(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub hotel_id: Uuid,
    pub room_category_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    /// Pre-discount stay total in minor units. Coupons are applied at payment
    /// time and never rewrite this figure.
    pub total_price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        customer_id: Uuid,
        category: &RoomCategory,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guest_count: u32,
        total_price: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            hotel_id: category.hotel_id,
            room_category_id: category.id,
            check_in,
            check_out,
            guest_count,
            total_price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Payment settled. Only a pending booking can be confirmed.
    pub fn confirm(&mut self) -> BookingResult<()> {
        match self.status {
            BookingStatus::Pending => {
                self.transition(BookingStatus::Confirmed);
                Ok(())
            }
            other => Err(BookingError::InvalidState(format!(
                "Cannot confirm a booking in status {other}"
            ))),
        }
    }

    /// Guest or operator withdrawal, allowed while the booking still holds
    /// its inventory unit. A second cancel is rejected rather than ignored so
    /// the unit is released exactly once.
    pub fn cancel(&mut self) -> BookingResult<()> {
        if self.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(
                "Booking is already cancelled".to_string(),
            ));
        }
        if !self.status.holds_inventory() {
            return Err(BookingError::InvalidState(format!(
                "Cannot cancel a booking in status {}",
                self.status
            )));
        }
        self.transition(BookingStatus::Cancelled);
        Ok(())
    }

    /// Stay finished. Driven by the checkout sweep, CONFIRMED only.
    pub fn complete(&mut self) -> BookingResult<()> {
        match self.status {
            BookingStatus::Confirmed => {
                self.transition(BookingStatus::Completed);
                Ok(())
            }
            other => Err(BookingError::InvalidState(format!(
                "Cannot complete a booking in status {other}"
            ))),
        }
    }

    fn transition(&mut self, next: BookingStatus) {
        self.status = next;
        self.updated_at = Utc::now();
    }
}

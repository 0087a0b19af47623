use std::sync::Arc;

use atrium_catalog::quote_stay;
use atrium_core::notify::{BookingNotice, Notifier};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{AvailabilityBroadcaster, AvailabilityEvent, AvailabilityEventKind};
use crate::models::Booking;
use crate::repository::{BookingStore, CatalogStore, InventoryLedger, StoreError};
use crate::{BookingError, BookingResult};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub room_category_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
}

/// Drives a booking through its lifecycle while keeping the inventory
/// ledger, the booking store and the availability feed consistent with
/// each other.
pub struct ReservationCoordinator {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn InventoryLedger>,
    bookings: Arc<dyn BookingStore>,
    broadcaster: AvailabilityBroadcaster,
    notifier: Arc<dyn Notifier>,
}

impl ReservationCoordinator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn InventoryLedger>,
        bookings: Arc<dyn BookingStore>,
        broadcaster: AvailabilityBroadcaster,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            bookings,
            broadcaster,
            notifier,
        }
    }

    /// Create a PENDING booking, taking one unit off the category's
    /// availability. Price is quoted from the category's tier table;
    /// coupons come into play at payment time, not here.
    pub async fn create_booking(&self, req: CreateBookingRequest) -> BookingResult<Booking> {
        let category = self
            .catalog
            .room_category(req.room_category_id)
            .await?
            .ok_or(BookingError::NotFound {
                entity: "Room category",
                id: req.room_category_id.to_string(),
            })?;

        if req.guest_count == 0 {
            return Err(BookingError::Validation(
                "At least one guest is required".to_string(),
            ));
        }
        if req.guest_count > category.max_guests {
            return Err(BookingError::Validation(format!(
                "{} sleeps at most {} guests, got {}",
                category.name, category.max_guests, req.guest_count
            )));
        }

        let tiers = self.catalog.price_tiers(category.id).await?;
        let quote = quote_stay(&category, &tiers, req.guest_count, req.check_in, req.check_out)
            .map_err(|err| BookingError::Validation(err.to_string()))?;

        let available_after = self.ledger.reserve(category.id, 1).await?;

        let booking = Booking::new(
            req.customer_id,
            &category,
            req.check_in,
            req.check_out,
            req.guest_count,
            quote.total,
        );
        if let Err(err) = self.bookings.create_booking(&booking).await {
            // Hand the unit back so the failed create leaves no trace
            if let Err(release_err) = self.ledger.release(category.id, 1).await {
                error!(
                    room_category_id = %category.id,
                    error = %release_err,
                    "Could not release unit after aborted booking create"
                );
            }
            return Err(err.into());
        }

        info!(
            booking_id = %booking.id,
            room_category_id = %category.id,
            nights = quote.nights,
            total = quote.total,
            available_after,
            "Booking created"
        );

        self.broadcaster.publish(AvailabilityEvent::new(
            AvailabilityEventKind::BookingCreated,
            category.id,
            category.hotel_id,
            available_after,
        ));
        self.dispatch_notice(BookingNotice::Created, &booking);

        Ok(booking)
    }

    /// Cancel a booking and return its unit to the pool. Allowed to the
    /// booking's customer and to the operator of the hotel; the status flip
    /// and the release are a single store write, so the unit comes back
    /// exactly once no matter how many cancels race and a cancel can never
    /// strand a hold.
    pub async fn cancel_booking(&self, booking_id: Uuid, actor_id: Uuid) -> BookingResult<Booking> {
        let mut booking =
            self.bookings
                .booking(booking_id)
                .await?
                .ok_or(BookingError::NotFound {
                    entity: "Booking",
                    id: booking_id.to_string(),
                })?;

        if booking.customer_id != actor_id {
            let operator = self.catalog.hotel_operator(booking.hotel_id).await?;
            if operator != Some(actor_id) {
                warn!(
                    booking_id = %booking.id,
                    actor_id = %actor_id,
                    "Rejected cancel by unrelated account"
                );
                return Err(BookingError::Forbidden(
                    "Only the booking's customer or the hotel operator may cancel it".to_string(),
                ));
            }
        }

        let prior = booking.status;
        booking.cancel()?;

        let released = self
            .bookings
            .cancel_and_release(booking.id, prior, booking.room_category_id, 1)
            .await
            .map_err(|err| match err {
                // A refused release means the counter already holds every
                // unit; the store rolled the status flip back with it
                StoreError::Conflict(detail) => BookingError::Invariant(detail),
                other => BookingError::Store(other),
            })?;
        let Some(available_after) = released else {
            return Err(BookingError::InvalidState(format!(
                "Booking is no longer {prior}"
            )));
        };

        info!(
            booking_id = %booking.id,
            room_category_id = %booking.room_category_id,
            available_after,
            "Booking cancelled"
        );

        self.broadcaster.publish(AvailabilityEvent::new(
            AvailabilityEventKind::BookingCancelled,
            booking.room_category_id,
            booking.hotel_id,
            available_after,
        ));
        self.dispatch_notice(BookingNotice::Cancelled, &booking);

        Ok(booking)
    }

    pub async fn booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound {
                entity: "Booking",
                id: booking_id.to_string(),
            })
    }

    pub async fn customer_bookings(&self, customer_id: Uuid) -> BookingResult<Vec<Booking>> {
        Ok(self.bookings.customer_bookings(customer_id).await?)
    }

    fn dispatch_notice(&self, notice: BookingNotice, booking: &Booking) {
        let notifier = Arc::clone(&self.notifier);
        let booking_id = booking.id;
        let customer_id = booking.customer_id;
        tokio::spawn(async move {
            if let Err(err) = notifier.booking_notice(notice, booking_id, customer_id).await {
                warn!(%booking_id, error = %err, "Notification dispatch failed");
            }
        });
    }
}

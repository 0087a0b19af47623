use async_trait::async_trait;
use uuid::Uuid;

use crate::CoreResult;

/// Which booking transition a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingNotice {
    Created,
    Confirmed,
    Cancelled,
}

impl BookingNotice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingNotice::Created => "created",
            BookingNotice::Confirmed => "confirmed",
            BookingNotice::Cancelled => "cancelled",
        }
    }
}

/// Outbound customer notification (email/SMS delivery lives elsewhere).
/// Callers invoke this fire-and-forget after a state transition commits;
/// a delivery failure must never roll the transition back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_notice(
        &self,
        notice: BookingNotice,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> CoreResult<()>;
}

/// Notifier that only writes to the log. Stands in for the real email/SMS
/// dispatcher in tests and local development.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_notice(
        &self,
        notice: BookingNotice,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> CoreResult<()> {
        tracing::info!(
            booking_id = %booking_id,
            customer_id = %customer_id,
            "Booking {} notice queued",
            notice.as_str()
        );
        Ok(())
    }
}

use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityEventKind {
    BookingCreated,
    BookingConfirmed,
    BookingCancelled,
}

impl AvailabilityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityEventKind::BookingCreated => "BOOKING_CREATED",
            AvailabilityEventKind::BookingConfirmed => "BOOKING_CONFIRMED",
            AvailabilityEventKind::BookingCancelled => "BOOKING_CANCELLED",
        }
    }
}

/// Snapshot of a room category's availability after a booking transition.
/// Carries the post-transition count so subscribers can render it without a
/// follow-up read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityEvent {
    pub room_category_id: Uuid,
    pub hotel_id: Uuid,
    pub available_units: u32,
    pub kind: AvailabilityEventKind,
    /// Unix seconds at publish time.
    pub occurred_at: i64,
}

impl AvailabilityEvent {
    pub fn new(
        kind: AvailabilityEventKind,
        room_category_id: Uuid,
        hotel_id: Uuid,
        available_units: u32,
    ) -> Self {
        Self {
            room_category_id,
            hotel_id,
            available_units,
            kind,
            occurred_at: Utc::now().timestamp(),
        }
    }
}

/// What a subscriber wants to hear about. Unset fields match everything, so
/// the default filter is a firehose.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AvailabilityFilter {
    pub room_category_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
}

impl AvailabilityFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_room_category(room_category_id: Uuid) -> Self {
        Self {
            room_category_id: Some(room_category_id),
            hotel_id: None,
        }
    }

    pub fn for_hotel(hotel_id: Uuid) -> Self {
        Self {
            room_category_id: None,
            hotel_id: Some(hotel_id),
        }
    }

    pub fn matches(&self, event: &AvailabilityEvent) -> bool {
        self.room_category_id
            .is_none_or(|id| id == event.room_category_id)
            && self.hotel_id.is_none_or(|id| id == event.hotel_id)
    }
}

/// In-process fan-out of availability changes.
///
/// Delivery is at most once and only to subscribers connected at publish
/// time: events are not persisted, a subscriber that connects late starts
/// from the next event, and one that falls behind the channel capacity
/// loses the oldest events. Clients needing the current state fetch a
/// snapshot first and use the stream as a delta feed.
#[derive(Clone)]
pub struct AvailabilityBroadcaster {
    tx: broadcast::Sender<AvailabilityEvent>,
}

impl AvailabilityBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AvailabilityEvent) {
        tracing::debug!(
            room_category_id = %event.room_category_id,
            kind = event.kind.as_str(),
            available_units = event.available_units,
            "Publishing availability event"
        );
        // Send only errors when nobody is subscribed
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, filter: AvailabilityFilter) -> AvailabilitySubscription {
        AvailabilitySubscription {
            inner: BroadcastStream::new(self.tx.subscribe()),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's filtered view of the broadcast. Dropping it is the
/// deregistration; the broadcaster forgets the subscriber immediately.
pub struct AvailabilitySubscription {
    inner: BroadcastStream<AvailabilityEvent>,
    filter: AvailabilityFilter,
}

impl AvailabilitySubscription {
    /// Next event that passes the filter, or `None` once the broadcaster is
    /// gone.
    pub async fn recv(&mut self) -> Option<AvailabilityEvent> {
        use tokio_stream::StreamExt;
        self.next().await
    }
}

impl Stream for AvailabilitySubscription {
    type Item = AvailabilityEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if this.filter.matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "Availability subscriber lagged, events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

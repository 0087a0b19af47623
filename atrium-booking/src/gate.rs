use std::sync::Arc;

use atrium_catalog::CouponOutcome;
use atrium_core::notify::{BookingNotice, Notifier};
use atrium_core::payment::{
    Payment, PaymentInstrument, PaymentMethod, PaymentProcessor, PaymentStatus, SettlementOutcome,
};
use atrium_core::pii::Masked;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{AvailabilityBroadcaster, AvailabilityEvent, AvailabilityEventKind};
use crate::models::{Booking, BookingStatus};
use crate::repository::{BookingStore, CatalogStore, CouponStore, PaymentStore, StoreError};
use crate::{BookingError, BookingResult};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPaymentRequest {
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub instrument: PaymentInstrument,
    pub coupon_code: Option<String>,
}

/// What a coupon would do to an amount. Preview only; nothing is reserved
/// and the figures are recomputed from scratch when the payment is
/// actually submitted.
#[derive(Debug, Clone, Serialize)]
pub struct CouponPreview {
    pub valid: bool,
    pub discount: i64,
    pub final_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponPreview {
    fn accepted(outcome: CouponOutcome) -> Self {
        Self {
            valid: true,
            discount: outcome.discount,
            final_amount: outcome.final_amount,
            message: None,
        }
    }

    fn rejected(amount: i64, message: String) -> Self {
        Self {
            valid: false,
            discount: 0,
            final_amount: amount,
            message: Some(message),
        }
    }
}

/// Payment intake for pending bookings. Verification of the individual
/// channels (bKash, Nagad, bank transfer) lives behind the processor
/// trait; the gate owns the bookkeeping around the attempt.
pub struct PaymentGate {
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentStore>,
    coupons: Arc<dyn CouponStore>,
    catalog: Arc<dyn CatalogStore>,
    processor: Arc<dyn PaymentProcessor>,
    broadcaster: AvailabilityBroadcaster,
    notifier: Arc<dyn Notifier>,
}

impl PaymentGate {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentStore>,
        coupons: Arc<dyn CouponStore>,
        catalog: Arc<dyn CatalogStore>,
        processor: Arc<dyn PaymentProcessor>,
        broadcaster: AvailabilityBroadcaster,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            bookings,
            payments,
            coupons,
            catalog,
            processor,
            broadcaster,
            notifier,
        }
    }

    /// Preview a coupon against an amount. Rejections come back inside the
    /// preview rather than as errors, so the checkout page has one shape to
    /// render; only storage trouble makes this fail.
    pub async fn validate_coupon(&self, code: &str, amount: i64) -> BookingResult<CouponPreview> {
        if amount < 0 {
            return Err(BookingError::Validation(
                "Amount must not be negative".to_string(),
            ));
        }

        let Some(coupon) = self.coupons.coupon(code).await? else {
            return Ok(CouponPreview::rejected(
                amount,
                format!("Unknown coupon code {code}"),
            ));
        };

        match coupon.apply(amount, Utc::now()) {
            Ok(outcome) => Ok(CouponPreview::accepted(outcome)),
            Err(err) => Ok(CouponPreview::rejected(amount, err.to_string())),
        }
    }

    /// Take a payment for a pending booking. On settlement the booking is
    /// confirmed and any coupon redemption is counted, atomically; on a
    /// decline the attempt is recorded FAILED and the booking keeps its
    /// inventory hold so the customer can retry.
    pub async fn submit_payment(&self, req: SubmitPaymentRequest) -> BookingResult<Payment> {
        let booking =
            self.bookings
                .booking(req.booking_id)
                .await?
                .ok_or(BookingError::NotFound {
                    entity: "Booking",
                    id: req.booking_id.to_string(),
                })?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidState(format!(
                "Cannot pay for a booking in status {}",
                booking.status
            )));
        }
        if let Some(existing) = self.payments.live_payment_for_booking(booking.id).await? {
            return Err(BookingError::InvalidState(format!(
                "Booking already has a {} payment",
                existing.status.as_str()
            )));
        }

        // Coupon is applied authoritatively here; preview figures from the
        // validate endpoint are never trusted
        let mut amount = booking.total_price;
        let mut redeemed_code: Option<String> = None;
        if let Some(code) = req.coupon_code.as_deref() {
            let coupon = self.coupons.coupon(code).await?.ok_or_else(|| {
                BookingError::InvalidCoupon(format!("Unknown coupon code {code}"))
            })?;
            let outcome = coupon
                .apply(amount, Utc::now())
                .map_err(|err| BookingError::InvalidCoupon(err.to_string()))?;
            info!(
                booking_id = %booking.id,
                code,
                discount = outcome.discount,
                "Coupon applied to payment"
            );
            amount = outcome.final_amount;
            redeemed_code = Some(coupon.code);
        }

        let mut payment = Payment::new(booking.id, req.method, amount);
        self.payments
            .create_payment(&payment)
            .await
            .map_err(conflict_is_invalid_state)?;

        match self.processor.settle(&payment, &req.instrument).await {
            Ok(SettlementOutcome::Settled { transaction_ref }) => {
                let transaction_ref = Masked::from(transaction_ref);
                if let Err(err) = self
                    .payments
                    .complete_payment(
                        payment.id,
                        booking.id,
                        transaction_ref.inner(),
                        redeemed_code.as_deref(),
                    )
                    .await
                {
                    // The booking left PENDING while the provider settled
                    // (e.g. a racing cancel). Close the attempt out so the
                    // booking is not wedged; the settled funds need manual
                    // reconciliation.
                    if let StoreError::Conflict(_) = &err {
                        error!(
                            booking_id = %booking.id,
                            payment_id = %payment.id,
                            %transaction_ref,
                            "Settled payment could not confirm booking; marking attempt failed"
                        );
                        if let Err(mark_err) = self.payments.fail_payment(payment.id).await {
                            error!(
                                payment_id = %payment.id,
                                error = %mark_err,
                                "Could not mark conflicted payment failed"
                            );
                        }
                    }
                    return Err(conflict_is_invalid_state(err));
                }

                payment.status = PaymentStatus::Completed;
                payment.transaction_ref = Some(transaction_ref);
                payment.updated_at = Utc::now();

                info!(
                    booking_id = %booking.id,
                    payment_id = %payment.id,
                    method = payment.method.as_str(),
                    amount = payment.amount,
                    "Payment settled, booking confirmed"
                );

                self.publish_confirmed(&booking).await;
                self.dispatch_notice(BookingNotice::Confirmed, &booking);

                Ok(payment)
            }
            Ok(SettlementOutcome::Declined { reason }) => {
                self.payments.fail_payment(payment.id).await?;

                warn!(
                    booking_id = %booking.id,
                    payment_id = %payment.id,
                    %reason,
                    "Payment declined, booking stays pending"
                );

                payment.status = PaymentStatus::Failed;
                payment.updated_at = Utc::now();

                Ok(payment)
            }
            Err(err) => {
                // Provider unreachable or misbehaving: the attempt is dead,
                // the booking and its hold are untouched
                if let Err(mark_err) = self.payments.fail_payment(payment.id).await {
                    error!(
                        payment_id = %payment.id,
                        error = %mark_err,
                        "Could not mark payment failed after provider error"
                    );
                }
                Err(BookingError::Provider(err.to_string()))
            }
        }
    }

    pub async fn payment(&self, payment_id: Uuid) -> BookingResult<Payment> {
        self.payments
            .payment(payment_id)
            .await?
            .ok_or(BookingError::NotFound {
                entity: "Payment",
                id: payment_id.to_string(),
            })
    }

    /// Confirmation does not move the availability counter, but UIs watch
    /// for it to flip pending badges, so it goes out with the current count.
    async fn publish_confirmed(&self, booking: &Booking) {
        match self.catalog.room_category(booking.room_category_id).await {
            Ok(Some(category)) => self.broadcaster.publish(AvailabilityEvent::new(
                AvailabilityEventKind::BookingConfirmed,
                category.id,
                category.hotel_id,
                category.available_units,
            )),
            Ok(None) => warn!(
                room_category_id = %booking.room_category_id,
                "Room category vanished before confirmation event"
            ),
            Err(err) => warn!(
                room_category_id = %booking.room_category_id,
                error = %err,
                "Could not read availability for confirmation event"
            ),
        }
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

fn conflict_is_invalid_state(err: StoreError) -> BookingError {
    match err {
        StoreError::Conflict(msg) => BookingError::InvalidState(msg),
        other => BookingError::Store(other),
    }
}

use std::sync::Arc;

use atrium_booking::repository::{
    BookingStore, CatalogStore, CouponStore, InventoryLedger, PaymentStore,
};
use atrium_booking::{AvailabilityBroadcaster, PaymentGate, ReservationCoordinator};
use atrium_core::notify::Notifier;
use atrium_core::payment::PaymentProcessor;

/// Shared handles for the request handlers. Cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ReservationCoordinator>,
    pub gate: Arc<PaymentGate>,
    pub catalog: Arc<dyn CatalogStore>,
    pub broadcaster: AvailabilityBroadcaster,
    pub currency: String,
}

impl AppState {
    /// Wire the coordinator and the payment gate over one set of stores.
    /// Both binaries and tests go through here so the wiring can't drift.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn InventoryLedger>,
        bookings: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentStore>,
        coupons: Arc<dyn CouponStore>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn Notifier>,
        broadcaster: AvailabilityBroadcaster,
        currency: String,
    ) -> Self {
        let coordinator = Arc::new(ReservationCoordinator::new(
            catalog.clone(),
            ledger,
            bookings.clone(),
            broadcaster.clone(),
            notifier.clone(),
        ));
        let gate = Arc::new(PaymentGate::new(
            bookings,
            payments,
            coupons,
            catalog.clone(),
            processor,
            broadcaster.clone(),
            notifier,
        ));

        Self {
            coordinator,
            gate,
            catalog,
            broadcaster,
            currency,
        }
    }
}

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use atrium_booking::models::{Booking, BookingStatus};
use atrium_booking::repository::{
    BookingStore, CatalogStore, CouponStore, InventoryLedger, LedgerError, PaymentStore,
    StoreError, StoreResult,
};
use atrium_catalog::{Coupon, PriceTier, RoomCategory};
use atrium_core::payment::{Payment, PaymentStatus};
use atrium_core::pii::Masked;

#[derive(Default)]
struct MemoryInner {
    /// hotel id -> operator account id
    hotels: HashMap<Uuid, Uuid>,
    categories: HashMap<Uuid, RoomCategory>,
    tiers: HashMap<Uuid, Vec<PriceTier>>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    coupons: HashMap<String, Coupon>,
}

/// Store keeping everything in process memory behind one mutex. Backs the
/// test suites and zero-infrastructure local runs. Every trait method is a
/// single lock acquisition, which is what makes reserve/release and the
/// settlement write atomic here.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_hotel(&self, hotel_id: Uuid, operator_id: Uuid) {
        self.lock().hotels.insert(hotel_id, operator_id);
    }

    pub fn insert_room_category(&self, category: RoomCategory) {
        self.lock().categories.insert(category.id, category);
    }

    pub fn insert_price_tier(&self, tier: PriceTier) {
        let mut inner = self.lock();
        let tiers = inner.tiers.entry(tier.room_category_id).or_default();
        // One tier per (category, guest_count), same key the table enforces
        match tiers.iter_mut().find(|t| t.guest_count == tier.guest_count) {
            Some(existing) => *existing = tier,
            None => tiers.push(tier),
        }
    }

    pub fn insert_coupon(&self, coupon: Coupon) {
        self.lock().coupons.insert(coupon.code.clone(), coupon);
    }

    pub fn coupon_used_count(&self, code: &str) -> Option<u32> {
        self.lock().coupons.get(code).map(|c| c.used_count)
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn reserve(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError> {
        let mut inner = self.lock();
        let category = inner
            .categories
            .get_mut(&room_category_id)
            .ok_or(LedgerError::NotFound(room_category_id))?;

        if category.available_units < units {
            return Err(LedgerError::OutOfInventory {
                requested: units,
                available: category.available_units,
            });
        }

        category.available_units -= units;
        Ok(category.available_units)
    }

    async fn release(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError> {
        let mut inner = self.lock();
        let category = inner
            .categories
            .get_mut(&room_category_id)
            .ok_or(LedgerError::NotFound(room_category_id))?;

        let mut updated = category.clone();
        updated.available_units = updated.available_units.saturating_add(units);
        if !updated.units_in_bounds() {
            error!(
                %room_category_id,
                available = category.available_units,
                released = units,
                total = category.total_units,
                "Refusing release beyond capacity"
            );
            return Err(LedgerError::ExceedsCapacity {
                room_category_id,
                available: category.available_units,
                released: units,
                total: category.total_units,
            });
        }

        *category = updated;
        Ok(category.available_units)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn room_category(&self, id: Uuid) -> StoreResult<Option<RoomCategory>> {
        Ok(self.lock().categories.get(&id).cloned())
    }

    async fn price_tiers(&self, room_category_id: Uuid) -> StoreResult<Vec<PriceTier>> {
        Ok(self
            .lock()
            .tiers
            .get(&room_category_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn hotel_categories(&self, hotel_id: Uuid) -> StoreResult<Vec<RoomCategory>> {
        let inner = self.lock();
        let mut categories: Vec<RoomCategory> = inner
            .categories
            .values()
            .filter(|c| c.hotel_id == hotel_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn hotel_operator(&self, hotel_id: Uuid) -> StoreResult<Option<Uuid>> {
        Ok(self.lock().hotels.get(&hotel_id).copied())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.bookings.contains_key(&booking.id) {
            return Err(StoreError::Conflict(format!(
                "Booking {} already exists",
                booking.id
            )));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.lock().bookings.get(&id).cloned())
    }

    async fn cancel_and_release(
        &self,
        id: Uuid,
        from: BookingStatus,
        room_category_id: Uuid,
        units: u32,
    ) -> StoreResult<Option<u32>> {
        let mut inner = self.lock();

        match inner.bookings.get(&id) {
            Some(booking) if booking.status == from => {}
            _ => return Ok(None),
        }

        // Nothing is mutated until both the CAS and the release have passed
        // their checks; one lock makes the pair atomic
        let available_after = {
            let category = inner
                .categories
                .get_mut(&room_category_id)
                .ok_or_else(|| {
                    StoreError::Backend(format!(
                        "Room category {room_category_id} missing during cancel"
                    ))
                })?;

            let mut updated = category.clone();
            updated.available_units = updated.available_units.saturating_add(units);
            if !updated.units_in_bounds() {
                error!(
                    booking_id = %id,
                    %room_category_id,
                    available = category.available_units,
                    released = units,
                    total = category.total_units,
                    "Refusing cancel: release beyond capacity"
                );
                return Err(StoreError::Conflict(format!(
                    "Release of {units} units would exceed capacity for room category \
                     {room_category_id}: {} available of {} total",
                    category.available_units, category.total_units
                )));
            }

            *category = updated;
            category.available_units
        };

        if let Some(booking) = inner.bookings.get_mut(&id) {
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = Utc::now();
        }

        Ok(Some(available_after))
    }

    async fn customer_bookings(&self, customer_id: Uuid) -> StoreResult<Vec<Booking>> {
        let inner = self.lock();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut inner = self.lock();
        let has_live = inner
            .payments
            .values()
            .any(|p| p.booking_id == payment.booking_id && p.status != PaymentStatus::Failed);
        if has_live {
            return Err(StoreError::Conflict(format!(
                "Booking {} already has a live payment",
                payment.booking_id
            )));
        }
        inner.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.lock().payments.get(&id).cloned())
    }

    async fn live_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self
            .lock()
            .payments
            .values()
            .find(|p| p.booking_id == booking_id && p.status != PaymentStatus::Failed)
            .cloned())
    }

    async fn complete_payment(
        &self,
        payment_id: Uuid,
        booking_id: Uuid,
        transaction_ref: &str,
        redeemed_coupon: Option<&str>,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        let now = Utc::now();

        if !inner.payments.contains_key(&payment_id) {
            return Err(StoreError::Backend(format!(
                "Payment {payment_id} missing during settlement"
            )));
        }
        match inner.bookings.get(&booking_id) {
            Some(booking) if booking.status == BookingStatus::Pending => {}
            Some(booking) => {
                return Err(StoreError::Conflict(format!(
                    "Booking {booking_id} is {} rather than PENDING",
                    booking.status
                )))
            }
            None => {
                return Err(StoreError::Backend(format!(
                    "Booking {booking_id} missing during settlement"
                )))
            }
        }

        if let Some(booking) = inner.bookings.get_mut(&booking_id) {
            booking.status = BookingStatus::Confirmed;
            booking.updated_at = now;
        }
        if let Some(payment) = inner.payments.get_mut(&payment_id) {
            payment.status = PaymentStatus::Completed;
            payment.transaction_ref = Some(Masked::from(transaction_ref.to_string()));
            payment.updated_at = now;
        }
        if let Some(code) = redeemed_coupon {
            match inner.coupons.get_mut(code) {
                Some(coupon) if coupon.has_uses_left() => coupon.used_count += 1,
                Some(_) => warn!(
                    code,
                    "Coupon exhausted between validation and settlement; redemption not counted"
                ),
                None => warn!(code, "Coupon vanished before redemption could be counted"),
            }
        }

        Ok(())
    }

    async fn fail_payment(&self, payment_id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock();
        match inner.payments.get_mut(&payment_id) {
            Some(payment) if !payment.status.is_terminal() => {
                payment.status = PaymentStatus::Failed;
                payment.updated_at = Utc::now();
                Ok(())
            }
            Some(payment) => Err(StoreError::Backend(format!(
                "Payment {payment_id} is {} and cannot be marked failed",
                payment.status.as_str()
            ))),
            None => Err(StoreError::Backend(format!(
                "Payment {payment_id} missing"
            ))),
        }
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn coupon(&self, code: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.lock().coupons.get(code).cloned())
    }
}

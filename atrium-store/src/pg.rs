use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use atrium_booking::models::{Booking, BookingStatus};
use atrium_booking::repository::{
    BookingStore, CatalogStore, CouponStore, InventoryLedger, LedgerError, PaymentStore,
    StoreError, StoreResult,
};
use atrium_catalog::{Coupon, PriceTier, RoomCategory};
use atrium_core::payment::{Payment, PaymentMethod, PaymentStatus};
use atrium_core::pii::Masked;

/// Postgres-backed store. Queries are runtime-checked (`sqlx::query` plus
/// binds) so the workspace builds without a live database; both ledger
/// operations are single conditional UPDATEs, which is where their
/// atomicity comes from.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn ledger_backend(err: sqlx::Error) -> LedgerError {
    LedgerError::Backend(err.to_string())
}

fn parse_booking_status(raw: &str) -> Result<BookingStatus, StoreError> {
    match raw {
        "PENDING" => Ok(BookingStatus::Pending),
        "CONFIRMED" => Ok(BookingStatus::Confirmed),
        "CANCELLED" => Ok(BookingStatus::Cancelled),
        "COMPLETED" => Ok(BookingStatus::Completed),
        other => Err(StoreError::Backend(format!(
            "Unknown booking status {other}"
        ))),
    }
}

fn parse_payment_status(raw: &str) -> Result<PaymentStatus, StoreError> {
    match raw {
        "PENDING" => Ok(PaymentStatus::Pending),
        "COMPLETED" => Ok(PaymentStatus::Completed),
        "FAILED" => Ok(PaymentStatus::Failed),
        other => Err(StoreError::Backend(format!(
            "Unknown payment status {other}"
        ))),
    }
}

fn parse_payment_method(raw: &str) -> Result<PaymentMethod, StoreError> {
    match raw {
        "BKASH" => Ok(PaymentMethod::Bkash),
        "NAGAD" => Ok(PaymentMethod::Nagad),
        "BANK" => Ok(PaymentMethod::Bank),
        other => Err(StoreError::Backend(format!(
            "Unknown payment method {other}"
        ))),
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    hotel_id: Uuid,
    name: String,
    max_guests: i32,
    base_price: i64,
    total_units: i32,
    available_units: i32,
}

impl From<CategoryRow> for RoomCategory {
    fn from(row: CategoryRow) -> Self {
        RoomCategory {
            id: row.id,
            hotel_id: row.hotel_id,
            name: row.name,
            max_guests: row.max_guests as u32,
            base_price: row.base_price,
            total_units: row.total_units as u32,
            available_units: row.available_units as u32,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TierRow {
    room_category_id: Uuid,
    guest_count: i32,
    nightly_price: i64,
}

impl From<TierRow> for PriceTier {
    fn from(row: TierRow) -> Self {
        PriceTier {
            room_category_id: row.room_category_id,
            guest_count: row.guest_count as u32,
            nightly_price: row.nightly_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    hotel_id: Uuid,
    room_category_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guest_count: i32,
    total_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            hotel_id: row.hotel_id,
            room_category_id: row.room_category_id,
            check_in: row.check_in,
            check_out: row.check_out,
            guest_count: row.guest_count as u32,
            total_price: row.total_price,
            status: parse_booking_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    method: String,
    amount: i64,
    status: String,
    transaction_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            method: parse_payment_method(&row.method)?,
            amount: row.amount,
            status: parse_payment_status(&row.status)?,
            transaction_ref: row.transaction_ref.map(Masked::from),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    code: String,
    discount: i64,
    is_percentage: bool,
    min_amount: Option<i64>,
    max_discount: Option<i64>,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    usage_limit: Option<i32>,
    used_count: i32,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            code: row.code,
            discount: row.discount,
            is_percentage: row.is_percentage,
            min_amount: row.min_amount,
            max_discount: row.max_discount,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            usage_limit: row.usage_limit.map(|limit| limit as u32),
            used_count: row.used_count as u32,
        }
    }
}

#[async_trait]
impl InventoryLedger for PgStore {
    async fn reserve(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError> {
        let available: Option<i32> = sqlx::query_scalar(
            "UPDATE room_categories
             SET available_units = available_units - $2
             WHERE id = $1 AND available_units >= $2
             RETURNING available_units",
        )
        .bind(room_category_id)
        .bind(units as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_backend)?;

        if let Some(left) = available {
            return Ok(left as u32);
        }

        // No row moved: the category is missing or short on units
        let current: Option<i32> =
            sqlx::query_scalar("SELECT available_units FROM room_categories WHERE id = $1")
                .bind(room_category_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ledger_backend)?;

        match current {
            Some(available) => Err(LedgerError::OutOfInventory {
                requested: units,
                available: available as u32,
            }),
            None => Err(LedgerError::NotFound(room_category_id)),
        }
    }

    async fn release(&self, room_category_id: Uuid, units: u32) -> Result<u32, LedgerError> {
        let available: Option<i32> = sqlx::query_scalar(
            "UPDATE room_categories
             SET available_units = available_units + $2
             WHERE id = $1 AND available_units + $2 <= total_units
             RETURNING available_units",
        )
        .bind(room_category_id)
        .bind(units as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_backend)?;

        if let Some(now_available) = available {
            return Ok(now_available as u32);
        }

        let counts: Option<(i32, i32)> = sqlx::query_as(
            "SELECT available_units, total_units FROM room_categories WHERE id = $1",
        )
        .bind(room_category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_backend)?;

        match counts {
            Some((available, total)) => {
                error!(
                    %room_category_id,
                    available,
                    released = units,
                    total,
                    "Refusing release beyond capacity"
                );
                Err(LedgerError::ExceedsCapacity {
                    room_category_id,
                    available: available as u32,
                    released: units,
                    total: total as u32,
                })
            }
            None => Err(LedgerError::NotFound(room_category_id)),
        }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn room_category(&self, id: Uuid) -> StoreResult<Option<RoomCategory>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, hotel_id, name, max_guests, base_price, total_units, available_units
             FROM room_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(RoomCategory::from))
    }

    async fn price_tiers(&self, room_category_id: Uuid) -> StoreResult<Vec<PriceTier>> {
        let rows: Vec<TierRow> = sqlx::query_as(
            "SELECT room_category_id, guest_count, nightly_price
             FROM price_tiers WHERE room_category_id = $1
             ORDER BY guest_count",
        )
        .bind(room_category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(PriceTier::from).collect())
    }

    async fn hotel_categories(&self, hotel_id: Uuid) -> StoreResult<Vec<RoomCategory>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, hotel_id, name, max_guests, base_price, total_units, available_units
             FROM room_categories WHERE hotel_id = $1
             ORDER BY name",
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(RoomCategory::from).collect())
    }

    async fn hotel_operator(&self, hotel_id: Uuid) -> StoreResult<Option<Uuid>> {
        sqlx::query_scalar("SELECT operator_id FROM hotels WHERE id = $1")
            .bind(hotel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO bookings
             (id, customer_id, hotel_id, room_category_id, check_in, check_out,
              guest_count, total_price, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(booking.id)
        .bind(booking.customer_id)
        .bind(booking.hotel_id)
        .bind(booking.room_category_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guest_count as i32)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, customer_id, hotel_id, room_category_id, check_in, check_out,
                    guest_count, total_price, status, created_at, updated_at
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn cancel_and_release(
        &self,
        id: Uuid,
        from: BookingStatus,
        room_category_id: Uuid,
        units: u32,
    ) -> StoreResult<Option<u32>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let cancelled = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = now()
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if cancelled.rows_affected() == 0 {
            // Dropping the tx rolls everything back
            return Ok(None);
        }

        let available: Option<i32> = sqlx::query_scalar(
            "UPDATE room_categories
             SET available_units = available_units + $2
             WHERE id = $1 AND available_units + $2 <= total_units
             RETURNING available_units",
        )
        .bind(room_category_id)
        .bind(units as i32)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(available) = available else {
            let counts: Option<(i32, i32)> = sqlx::query_as(
                "SELECT available_units, total_units FROM room_categories WHERE id = $1",
            )
            .bind(room_category_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;

            return Err(match counts {
                Some((available, total)) => {
                    error!(
                        booking_id = %id,
                        %room_category_id,
                        available,
                        released = units,
                        total,
                        "Refusing cancel: release beyond capacity"
                    );
                    StoreError::Conflict(format!(
                        "Release of {units} units would exceed capacity for room category \
                         {room_category_id}: {available} available of {total} total"
                    ))
                }
                None => StoreError::Backend(format!(
                    "Room category {room_category_id} missing during cancel"
                )),
            });
        };

        tx.commit().await.map_err(backend)?;
        Ok(Some(available as u32))
    }

    async fn customer_bookings(&self, customer_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            "SELECT id, customer_id, hotel_id, room_category_id, check_in, check_out,
                    guest_count, total_price, status, created_at, updated_at
             FROM bookings WHERE customer_id = $1
             ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn create_payment(&self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO payments
             (id, booking_id, method, amount, status, transaction_ref, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.method.as_str())
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.transaction_ref.as_ref().map(|r| r.inner().as_str()))
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.constraint() == Some("idx_payments_live") => {
                StoreError::Conflict(format!(
                    "Booking {} already has a live payment",
                    payment.booking_id
                ))
            }
            _ => backend(err),
        })?;

        Ok(())
    }

    async fn payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, booking_id, method, amount, status, transaction_ref,
                    created_at, updated_at
             FROM payments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Payment::try_from).transpose()
    }

    async fn live_payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, booking_id, method, amount, status, transaction_ref,
                    created_at, updated_at
             FROM payments WHERE booking_id = $1 AND status <> 'FAILED'",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Payment::try_from).transpose()
    }

    async fn complete_payment(
        &self,
        payment_id: Uuid,
        booking_id: Uuid,
        transaction_ref: &str,
        redeemed_coupon: Option<&str>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let confirmed = sqlx::query(
            "UPDATE bookings SET status = 'CONFIRMED', updated_at = now()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if confirmed.rows_affected() == 0 {
            // Dropping the tx rolls everything back
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                    .bind(booking_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?;

            return Err(match status {
                Some(status) => StoreError::Conflict(format!(
                    "Booking {booking_id} is {status} rather than PENDING"
                )),
                None => StoreError::Backend(format!(
                    "Booking {booking_id} missing during settlement"
                )),
            });
        }

        let settled = sqlx::query(
            "UPDATE payments SET status = 'COMPLETED', transaction_ref = $2, updated_at = now()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(payment_id)
        .bind(transaction_ref)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if settled.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "Payment {payment_id} missing or not PENDING during settlement"
            )));
        }

        if let Some(code) = redeemed_coupon {
            let counted = sqlx::query(
                "UPDATE coupons SET used_count = used_count + 1
                 WHERE code = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
            )
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if counted.rows_affected() == 0 {
                warn!(
                    code,
                    "Coupon exhausted between validation and settlement; redemption not counted"
                );
            }
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn fail_payment(&self, payment_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'FAILED', updated_at = now()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "Payment {payment_id} was not PENDING"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl CouponStore for PgStore {
    async fn coupon(&self, code: &str) -> StoreResult<Option<Coupon>> {
        let row: Option<CouponRow> = sqlx::query_as(
            "SELECT code, discount, is_percentage, min_amount, max_discount,
                    valid_from, valid_to, usage_limit, used_count
             FROM coupons WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Coupon::from))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An admin-defined discount rule. Free-standing: bookings reference a
/// coupon by code but never own it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    /// Percentage (0..=100) when `is_percentage`, otherwise a flat amount
    /// in minor currency units.
    pub discount: i64,
    pub is_percentage: bool,
    /// Minimum qualifying amount, if any.
    pub min_amount: Option<i64>,
    /// Cap on the computed discount; meaningful for percentage coupons only.
    pub max_discount: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
}

/// Discount computed for a qualifying amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CouponOutcome {
    pub discount: i64,
    pub final_amount: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("Coupon is not active yet")]
    NotYetValid,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    Exhausted,
    #[error("Amount is below the coupon minimum of {0}")]
    BelowMinimum(i64),
}

impl Coupon {
    pub fn has_uses_left(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.used_count < limit,
            None => true,
        }
    }

    /// Validate the coupon against `amount` at `now` and compute the
    /// discount. Pure: `used_count` moves only when a payment that
    /// redeemed the coupon settles, so an abandoned checkout never burns
    /// a redemption.
    pub fn apply(&self, amount: i64, now: DateTime<Utc>) -> Result<CouponOutcome, CouponError> {
        if now < self.valid_from {
            return Err(CouponError::NotYetValid);
        }
        if now > self.valid_to {
            return Err(CouponError::Expired);
        }
        if !self.has_uses_left() {
            return Err(CouponError::Exhausted);
        }
        if let Some(min) = self.min_amount {
            if amount < min {
                return Err(CouponError::BelowMinimum(min));
            }
        }

        // Amounts arrive off the wire unchecked; saturate rather than overflow
        let mut discount = if self.is_percentage {
            amount.saturating_mul(self.discount) / 100
        } else {
            self.discount
        };
        if self.is_percentage {
            if let Some(cap) = self.max_discount {
                discount = discount.min(cap);
            }
        }
        // A discount can never turn the total negative
        let discount = discount.clamp(0, amount);

        Ok(CouponOutcome {
            discount,
            final_amount: amount - discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open_coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "WELCOME10".to_string(),
            discount: 10,
            is_percentage: true,
            min_amount: None,
            max_discount: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(30),
            usage_limit: None,
            used_count: 0,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let outcome = open_coupon().apply(10_000, Utc::now()).unwrap();
        assert_eq!(outcome.discount, 1_000);
        assert_eq!(outcome.final_amount, 9_000);
    }

    #[test]
    fn test_flat_discount() {
        let mut coupon = open_coupon();
        coupon.is_percentage = false;
        coupon.discount = 750;

        let outcome = coupon.apply(10_000, Utc::now()).unwrap();
        assert_eq!(outcome.discount, 750);
        assert_eq!(outcome.final_amount, 9_250);
    }

    #[test]
    fn test_percentage_cap_applies() {
        let mut coupon = open_coupon();
        coupon.discount = 50;
        coupon.max_discount = Some(2_000);

        let outcome = coupon.apply(10_000, Utc::now()).unwrap();
        assert_eq!(outcome.discount, 2_000);
        assert_eq!(outcome.final_amount, 8_000);
    }

    #[test]
    fn test_flat_discount_clamped_to_amount() {
        let mut coupon = open_coupon();
        coupon.is_percentage = false;
        coupon.discount = 9_999;

        let outcome = coupon.apply(500, Utc::now()).unwrap();
        assert_eq!(outcome.discount, 500);
        assert_eq!(outcome.final_amount, 0);
    }

    #[test]
    fn test_window_checks() {
        let now = Utc::now();
        let mut coupon = open_coupon();

        coupon.valid_from = now + Duration::days(1);
        assert_eq!(coupon.apply(10_000, now), Err(CouponError::NotYetValid));

        coupon.valid_from = now - Duration::days(10);
        coupon.valid_to = now - Duration::days(1);
        assert_eq!(coupon.apply(10_000, now), Err(CouponError::Expired));
    }

    #[test]
    fn test_usage_limit_exhaustion() {
        let mut coupon = open_coupon();
        coupon.usage_limit = Some(1);
        coupon.used_count = 1;

        assert_eq!(coupon.apply(10_000, Utc::now()), Err(CouponError::Exhausted));
    }

    #[test]
    fn test_minimum_amount() {
        let mut coupon = open_coupon();
        coupon.min_amount = Some(5_000);

        assert_eq!(
            coupon.apply(4_999, Utc::now()),
            Err(CouponError::BelowMinimum(5_000))
        );
        assert!(coupon.apply(5_000, Utc::now()).is_ok());
    }

    #[test]
    fn test_percentage_on_huge_amount_does_not_overflow() {
        let outcome = open_coupon().apply(i64::MAX, Utc::now()).unwrap();
        assert_eq!(outcome.discount, i64::MAX / 100);
        assert_eq!(outcome.final_amount, i64::MAX - i64::MAX / 100);
    }

    #[test]
    fn test_discount_never_negative() {
        let mut coupon = open_coupon();
        coupon.is_percentage = false;
        coupon.discount = -100;

        let outcome = coupon.apply(1_000, Utc::now()).unwrap();
        assert_eq!(outcome.discount, 0);
        assert_eq!(outcome.final_amount, 1_000);
    }

    #[test]
    fn test_validation_does_not_touch_used_count() {
        let coupon = open_coupon();
        let before = coupon.used_count;
        let _ = coupon.apply(10_000, Utc::now()).unwrap();
        assert_eq!(coupon.used_count, before);
    }
}

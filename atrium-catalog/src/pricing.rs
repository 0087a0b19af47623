use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::room::{PriceTier, RoomCategory};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Stay must be at least one night: check-in {check_in}, check-out {check_out}")]
    InvalidStay {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

/// A priced stay, before any coupon discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub nightly_rate: i64,
    pub nights: i64,
    pub total: i64,
}

/// Resolve the nightly rate for `guest_count` against a sparse occupancy
/// price table.
///
/// Resolution contract: exact match on guest count; otherwise the tier
/// with the largest guest count at or below the requested one; if every
/// tier sits above the request, the lowest tier; if no tiers exist, the
/// category's base price. Owners define e.g. 1/2/4-guest prices rather
/// than every integer, so the fallback is business logic, not a
/// convenience.
pub fn nightly_rate(category: &RoomCategory, tiers: &[PriceTier], guest_count: u32) -> i64 {
    let mut nearest_below: Option<&PriceTier> = None;
    let mut lowest: Option<&PriceTier> = None;

    for tier in tiers {
        if tier.guest_count == guest_count {
            return tier.nightly_price;
        }
        if tier.guest_count < guest_count
            && nearest_below.is_none_or(|best| tier.guest_count > best.guest_count)
        {
            nearest_below = Some(tier);
        }
        if lowest.is_none_or(|best| tier.guest_count < best.guest_count) {
            lowest = Some(tier);
        }
    }

    nearest_below
        .or(lowest)
        .map(|tier| tier.nightly_price)
        .unwrap_or(category.base_price)
}

/// Number of nights in a stay. Check-out must fall strictly after
/// check-in, which with whole dates means at least one night.
pub fn stay_nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, PricingError> {
    let nights = (check_out - check_in).num_days();
    if nights < 1 {
        return Err(PricingError::InvalidStay {
            check_in,
            check_out,
        });
    }
    Ok(nights)
}

/// Price a stay for the given party size and date range.
pub fn quote_stay(
    category: &RoomCategory,
    tiers: &[PriceTier],
    guest_count: u32,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Quote, PricingError> {
    let nights = stay_nights(check_in, check_out)?;
    let rate = nightly_rate(category, tiers, guest_count);
    Ok(Quote {
        nightly_rate: rate,
        nights,
        total: rate * nights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn category() -> RoomCategory {
        RoomCategory::new(Uuid::new_v4(), "Superior King", 4, 3_000_00, 5)
    }

    fn tiers(category: &RoomCategory, table: &[(u32, i64)]) -> Vec<PriceTier> {
        table
            .iter()
            .map(|&(guests, price)| PriceTier::new(category.id, guests, price))
            .collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_exact_tier_match() {
        let category = category();
        let tiers = tiers(&category, &[(1, 1000), (3, 2500)]);
        assert_eq!(nightly_rate(&category, &tiers, 1), 1000);
        assert_eq!(nightly_rate(&category, &tiers, 3), 2500);
    }

    #[test]
    fn test_nearest_lower_tier_wins() {
        let category = category();
        let tiers = tiers(&category, &[(1, 1000), (3, 2500)]);
        // 2 guests resolves to the 1-guest tier, 4 to the 3-guest tier
        assert_eq!(nightly_rate(&category, &tiers, 2), 1000);
        assert_eq!(nightly_rate(&category, &tiers, 4), 2500);
    }

    #[test]
    fn test_below_all_tiers_falls_to_lowest() {
        let category = category();
        let tiers = tiers(&category, &[(2, 1800), (4, 3200)]);
        assert_eq!(nightly_rate(&category, &tiers, 1), 1800);
    }

    #[test]
    fn test_no_tiers_uses_base_price() {
        let category = category();
        assert_eq!(nightly_rate(&category, &[], 2), category.base_price);
    }

    #[test]
    fn test_stay_nights_counts_whole_nights() {
        assert_eq!(stay_nights(date("2025-03-01"), date("2025-03-02")).unwrap(), 1);
        assert_eq!(stay_nights(date("2025-03-01"), date("2025-03-05")).unwrap(), 4);
    }

    #[test]
    fn test_zero_or_negative_stay_rejected() {
        assert!(stay_nights(date("2025-03-01"), date("2025-03-01")).is_err());
        assert!(stay_nights(date("2025-03-05"), date("2025-03-01")).is_err());
    }

    #[test]
    fn test_quote_multiplies_rate_by_nights() {
        let category = category();
        let tiers = tiers(&category, &[(2, 2000)]);
        let quote = quote_stay(
            &category,
            &tiers,
            2,
            date("2025-03-01"),
            date("2025-03-04"),
        )
        .unwrap();

        assert_eq!(quote.nightly_rate, 2000);
        assert_eq!(quote.nights, 3);
        assert_eq!(quote.total, 6000);
    }
}

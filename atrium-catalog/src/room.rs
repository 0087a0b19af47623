use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable room type within a hotel. `available_units` is the
/// authoritative count of units still on sale; only the inventory ledger
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCategory {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub name: String,
    pub max_guests: u32,
    /// Nightly price used when the category has no price tiers at all.
    pub base_price: i64,
    pub total_units: u32,
    pub available_units: u32,
}

impl RoomCategory {
    pub fn new(
        hotel_id: Uuid,
        name: impl Into<String>,
        max_guests: u32,
        base_price: i64,
        total_units: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            name: name.into(),
            max_guests,
            base_price,
            total_units,
            available_units: total_units,
        }
    }

    /// Invariant: 0 <= available_units <= total_units. `available_units`
    /// is unsigned, so only the upper bound can be violated.
    pub fn units_in_bounds(&self) -> bool {
        self.available_units <= self.total_units
    }

    pub fn fits_guests(&self, guest_count: u32) -> bool {
        guest_count >= 1 && guest_count <= self.max_guests
    }
}

/// One row of a category's occupancy price table: the nightly price when
/// exactly `guest_count` guests stay. Unique per (category, guest_count).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceTier {
    pub room_category_id: Uuid,
    pub guest_count: u32,
    pub nightly_price: i64,
}

impl PriceTier {
    pub fn new(room_category_id: Uuid, guest_count: u32, nightly_price: i64) -> Self {
        Self {
            room_category_id,
            guest_count,
            nightly_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_starts_fully_available() {
        let category = RoomCategory::new(Uuid::new_v4(), "Deluxe Twin", 3, 4_500_00, 8);
        assert_eq!(category.available_units, 8);
        assert!(category.units_in_bounds());
    }

    #[test]
    fn test_fits_guests_bounds() {
        let category = RoomCategory::new(Uuid::new_v4(), "Deluxe Twin", 3, 4_500_00, 8);
        assert!(!category.fits_guests(0));
        assert!(category.fits_guests(1));
        assert!(category.fits_guests(3));
        assert!(!category.fits_guests(4));
    }
}

pub mod coupon;
pub mod pricing;
pub mod room;

pub use coupon::{Coupon, CouponError, CouponOutcome};
pub use pricing::{nightly_rate, quote_stay, stay_nights, PricingError, Quote};
pub use room::{PriceTier, RoomCategory};

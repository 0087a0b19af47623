use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for sensitive payment data (wallet numbers, bank accounts) that
/// masks its value in Debug and Display output. Serialization passes the
/// real value through, since API responses and store writes need it; the
/// wrapper exists to stop accidental leakage via log macros.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn inner(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_masked() {
        let wallet = Masked("01811223344".to_string());
        assert_eq!(format!("{wallet}"), "********");
        assert_eq!(format!("{wallet:?}"), "********");
    }

    #[test]
    fn test_into_inner_returns_real_value() {
        let wallet = Masked("01811223344".to_string());
        assert_eq!(wallet.into_inner(), "01811223344");
    }
}

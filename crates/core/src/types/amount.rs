//! Currency-agnostic monetary amount using decimal arithmetic.
//!
//! The print shop quotes prices in whole "units" (a mono page costs 2, a color
//! page 10) but stationery prices may carry fractions, so amounts are kept as
//! [`Decimal`] rather than floats.
//!
//! On the wire an amount is a plain JSON number. Deserialization also accepts
//! numeric strings, which some backend responses use.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-currency-specific amount of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create an amount from a whole number of units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<u32> for Amount {
    fn from(units: u32) -> Self {
        Self(Decimal::from(units))
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul<u32> for Amount {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0.normalize();
        if value.fract().is_zero()
            && let Some(whole) = value.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        match value.to_f64() {
            Some(float) => serializer.serialize_f64(float),
            None => serializer.serialize_str(&value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amount_serializes_as_integer() {
        let json = serde_json::to_string(&Amount::from_units(32)).unwrap();
        assert_eq!(json, "32");
    }

    #[test]
    fn test_fractional_amount_serializes_as_number() {
        let amount = Amount::new(Decimal::new(125, 1));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12.5");
    }

    #[test]
    fn test_deserialize_accepts_numbers_and_strings() {
        let from_number: Amount = serde_json::from_str("160").unwrap();
        let from_string: Amount = serde_json::from_str("\"160\"").unwrap();
        assert_eq!(from_number, Amount::from_units(160));
        assert_eq!(from_string, Amount::from_units(160));
    }

    #[test]
    fn test_arithmetic() {
        let total: Amount = [Amount::from_units(2), Amount::from_units(3)]
            .into_iter()
            .sum();
        assert_eq!(total * 2, Amount::from_units(10));
        assert_eq!(Amount::new(Decimal::new(250, 2)).to_string(), "2.5");
    }

    #[test]
    fn test_is_negative() {
        assert!(Amount::new(Decimal::new(-1, 0)).is_negative());
        assert!(!Amount::ZERO.is_negative());
    }
}

//! Amount type for signed monetary values read from French exports.
//!
//! This module provides the `Amount` type which wraps `Decimal`. Positive values are credits
//! (money in), negative values are debits (money out).

use crate::ingest::parse_amount;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Represents a signed monetary amount.
///
/// Parsing follows the locale rules of the ingestion engine: the first comma is the decimal
/// separator and whitespace is a thousands separator. Serialization is a plain JSON number so
/// that the reconciliation service can consume it directly.
///
/// # Examples
///
/// ```
/// # use recon_ingest::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-1 234,500").unwrap();
/// assert_eq!(amount.to_string(), "-1,234.500");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The nearest `f64`, for the JSON shapes of the reconciliation service.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Returns true if the amount is a credit.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the amount is a debit.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// `None` when the sum is outside the `Decimal` range.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

/// An error that occurs when a string holds no number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountError(String);

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an amount", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
            .map(Amount)
            .ok_or_else(|| AmountError(s.to_string()))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.0.abs().to_f64().unwrap_or_default();
        write!(f, "{sign}{}", format_num::format_num!(",.3", num))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        rust_decimal::serde::float::deserialize(deserializer).map(Amount)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

/// Saturates at `Decimal::MAX` and `Decimal::MIN`.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

/// Saturates at `Decimal::MAX` and `Decimal::MIN`.
impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(Amount::from_str("12,500").unwrap(), amount("12.5"));
    }

    #[test]
    fn test_parse_failure() {
        let err = Amount::from_str("abc").unwrap_err();
        assert_eq!(err.to_string(), "'abc' is not an amount");
    }

    #[test]
    fn test_display() {
        assert_eq!(amount("500").to_string(), "500.000");
        assert_eq!(amount("-25.5").to_string(), "-25.500");
        assert_eq!(amount("1234567.891").to_string(), "1,234,567.891");
        assert_eq!(Amount::ZERO.to_string(), "0.000");
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&amount("-10.75")).unwrap();
        assert_eq!(json, "-10.75");
    }

    #[test]
    fn test_deserialize_number() {
        let parsed: Amount = serde_json::from_str("989.25").unwrap();
        assert_eq!(parsed, amount("989.25"));
    }

    #[test]
    fn test_sign() {
        assert!(amount("1").is_positive());
        assert!(amount("-1").is_negative());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::ZERO.is_negative());
    }

    #[test]
    fn test_arithmetic() {
        let total: Amount = [amount("500"), amount("-25.5")].iter().sum();
        assert_eq!(total, amount("474.5"));
        assert_eq!(amount("500") - amount("25.5"), amount("474.5"));
        assert_eq!(-amount("3"), amount("-3"));
    }

    #[test]
    fn test_arithmetic_saturates() {
        let big = amount("79000000000000000000000000000");
        assert_eq!(big.checked_add(big), None);
        assert_eq!((-big).checked_sub(big), None);
        assert_eq!(big + big, Amount::new(Decimal::MAX));
        assert_eq!(-big - big, Amount::new(Decimal::MIN));
        let total: Amount = [big, big, -big].iter().sum();
        assert_eq!(total, Amount::new(Decimal::MAX - big.value()));
        assert_eq!(amount("1").checked_add(amount("2")), Some(amount("3")));
    }
}

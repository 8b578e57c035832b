//! Amount type for handling the numeric values typed into budget fields.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may or may not include thousands separators, e.g. `1,234.5`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents a numeric budget value.
///
/// Formatting (whether commas were present) is considered significant for equality, so for
/// numeric comparisons you should access the `Decimal` value and use that.
///
/// # Examples
///
/// ```
/// # use fund_budget::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("1234.5").unwrap();
/// let b = Amount::from_str("1,234.5").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// assert_eq!(b.to_string(), "1,234.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value.
    value: Decimal,
    /// Whether commas are present as thousands separators when written to a `String`.
    commas: bool,
}

impl Amount {
    /// Creates a new Amount from a Decimal value, written without thousands separators.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            commas: false,
        }
    }

    /// Creates a new Amount from a Decimal value, written with thousands separators.
    pub const fn grouped(value: Decimal) -> Self {
        Self {
            value,
            commas: true,
        }
    }

    /// Parses `s`, treating blank or non-numeric input as zero.
    pub fn parse_or_zero(s: &str) -> Self {
        Amount::from_str(s).unwrap_or_default()
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is negative. Zero is never negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }
}

/// Removes thousands separators from `s`. Other characters are left alone.
pub fn strip_grouping(s: &str) -> String {
    s.replace(',', "")
}

/// Writes `value` in its shortest plain decimal form, e.g. `470` or `1234.5`.
pub fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Writes `value` with a comma between every three integer digits. The digits come from the
/// decimal's own string form, so nothing is lost to rounding, and the scale is kept as is.
///
/// ```
/// # use fund_budget::model::group_thousands;
/// # use rust_decimal::Decimal;
/// # use std::str::FromStr;
/// let value = Decimal::from_str("-12345678901234567.50").unwrap();
/// assert_eq!(group_thousands(value), "-12,345,678,901,234,567.50");
/// ```
pub fn group_thousands(value: Decimal) -> String {
    let digits = value.abs().to_string();
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + integer.len() / 3 + 1);
    if !value.is_zero() && value.is_sign_negative() {
        out.push('-');
    }
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// An error that can occur when parsing strings into `Decimal` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // Handle empty string
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let without_commas = strip_grouping(trimmed);
        let commas = without_commas.len() < trimmed.len();

        let value = match Decimal::from_str(&without_commas) {
            Ok(value) => value,
            // Exponent forms such as `1e3` are valid input for a number field.
            Err(e) => Decimal::from_scientific(&without_commas).map_err(|_| AmountError(e))?,
        };
        Ok(Amount { value, commas })
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = self.value().normalize();
        if !self.commas {
            return write!(f, "{value}");
        }

        f.write_str(&group_thousands(value))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
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

//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Result<Self, OrderIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(OrderIdError::Empty); }
        if value.len() > 64 { return Err(OrderIdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderIdError {
    #[error("order id empty")]
    Empty,
    #[error("order id too long")]
    TooLong,
}

/// Cart line quantity, always within `[Quantity::MIN, Quantity::MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;

    /// Clamps any integer into the allowed range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u32)
    }

    /// Parses form input by its leading integer, so `"2.7"` is 2. Input with
    /// no leading integer, or a leading zero value, falls back to 1.
    pub fn parse_input(raw: &str) -> Self {
        let raw = raw.trim_start();
        let sign = usize::from(raw.starts_with(&['-', '+'][..]));
        let end = raw[sign..].find(|c: char| !c.is_ascii_digit()).map_or(raw.len(), |i| i + sign);
        if end == sign {
            return Self::one();
        }
        match raw[..end].parse::<i64>() {
            Ok(0) => Self::one(),
            Ok(n) => Self::clamped(n),
            // Too many digits for i64.
            Err(_) if raw.starts_with('-') => Self(Self::MIN),
            Err(_) => Self(Self::MAX),
        }
    }

    pub fn one() -> Self { Self(Self::MIN) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn is_max(&self) -> bool { self.0 == Self::MAX }
    pub fn increment(&self) -> Self { Self::clamped(i64::from(self.0) + 1) }
}

impl Default for Quantity { fn default() -> Self { Self::one() } }

impl From<i64> for Quantity {
    fn from(value: i64) -> Self { Self::clamped(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

impl From<Quantity> for Decimal {
    fn from(q: Quantity) -> Self { Decimal::from(q.0) }
}

/// Rounds to cents, half away from zero, always carrying two decimal places.
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

/// Rounds a monetary amount for display. Arithmetic stays unrounded.
pub fn display_amount(amount: Decimal) -> String { to_cents(amount).to_string() }

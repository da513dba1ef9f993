//! Money amounts in integer minor units

use crate::CaseError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MINOR_PER_UNIT: u64 = 100;

/// A non-negative money amount stored as hundredths of the currency unit.
///
/// Parsing is strict: `"12"`, `"12.5"` and `"12.50"` are accepted,
/// while empty strings, signs, exponents, more than two fractional
/// digits, or anything non-numeric are rejected rather than zero-filled.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub fn zero() -> Self {
        Self(0)
    }

    /// Amount from whole currency units.
    pub fn units(value: u64) -> Self {
        Self(value.saturating_mul(MINOR_PER_UNIT))
    }

    /// Amount from minor units (hundredths).
    pub fn from_minor(value: u64) -> Self {
        Self(value)
    }

    pub fn minor(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_UNIT,
            self.0 % MINOR_PER_UNIT
        )
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::zero(), Amount::saturating_add)
    }
}

impl<'a> std::iter::Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Amount {
    type Err = CaseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CaseError::Validation(format!("invalid amount: {raw:?}"));
        let trimmed = raw.trim();

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if trimmed.ends_with('.') {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let minor: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(MINOR_PER_UNIT)
            .and_then(|v| v.checked_add(minor))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

/// Parse a review score. Only integer strings are accepted; clamping to
/// the 1–10 range is the review engine's job.
pub fn parse_score(raw: &str) -> Result<i64, CaseError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CaseError::Validation(format!("invalid score: {raw:?}")))
}

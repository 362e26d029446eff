//! # Fixed-Point Amounts
//!
//! Monetary values with exactly six fractional digits, stored as integer
//! micro-units. Prices and deposits travel as decimal strings on the wire
//! and are never represented as binary floating point — repeated 10%
//! computations must not drift.
//!
//! The 10% figure (deposits, the arbitration fee) is recomputed from the
//! price at every site that needs it; nothing accumulates a running fee.

use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// Number of fractional digits carried by an [`Amount`].
pub const AMOUNT_SCALE: u32 = 6;

const MICROS_PER_UNIT: i64 = 1_000_000;

/// A non-negative monetary amount in integer micro-units (10^-6).
///
/// Parsed from and serialized as a canonical decimal string with trailing
/// zeros trimmed (`"0.2"`, not `"0.200000"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Construct from raw micro-units.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidAmount`] if `micros` is negative.
    pub fn from_micros(micros: i64) -> Result<Self, EscrowError> {
        if micros < 0 {
            return Err(EscrowError::InvalidAmount(micros.to_string()));
        }
        Ok(Self(micros))
    }

    /// The raw micro-unit value.
    pub fn as_micros(&self) -> i64 {
        self.0
    }

    /// Parse a decimal string (`"2.0"`, `"1.55"`, `"0.000001"`).
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidAmount`] for empty or non-numeric
    /// input, negative values, more than six fractional digits, or values
    /// that overflow the micro-unit range.
    pub fn parse(s: &str) -> Result<Self, EscrowError> {
        let invalid = || EscrowError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
            return Err(invalid());
        }

        let (int_part, frac_part) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };
        // "1." and ".5" are accepted; "." alone is not.
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac_part.len() > AMOUNT_SCALE as usize {
            return Err(invalid());
        }

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut frac: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        frac *= 10_i64.pow(AMOUNT_SCALE - frac_part.len() as u32);

        whole
            .checked_mul(MICROS_PER_UNIT)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// `round6(value * 0.10)` — ten percent with round-half-up on the
    /// seventh fractional digit.
    pub fn ten_percent(&self) -> Amount {
        let q = self.0 / 10;
        let r = self.0 % 10;
        Amount(if r >= 5 { q + 1 } else { q })
    }

    /// Whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / MICROS_PER_UNIT;
        let frac = self.0 % MICROS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Amount {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> Self {
        a.to_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = EscrowError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

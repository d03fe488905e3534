use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::DomainError;

/// Trait for monetary amounts with fixed decimal precision
///
/// Deltas are signed: a debit is applied as a negative amount, so the
/// implementing type must be able to represent values below zero even
/// though stored balances never are.
pub trait Amount:
    Copy
    + Ord
    + Add<Output = Self>
    + Sub<Output = Self>
    + Default
    + Send
    + Sync
    + fmt::Debug
    + 'static
{
    /// Parse from a decimal string (e.g., "100.50")
    fn from_decimal_str(s: &str) -> Result<Self, DomainError>;

    /// Render as a decimal string with 2 decimal places
    fn to_decimal_string(&self) -> String;

    /// Checked addition, returns None on overflow
    fn checked_add(&self, other: Self) -> Option<Self>;

    /// Checked subtraction, returns None on underflow
    fn checked_sub(&self, other: Self) -> Option<Self>;

    /// Zero value
    fn zero() -> Self;

    /// Strictly positive check, the engine's minimum for any transfer amount
    fn is_positive(&self) -> bool {
        *self > Self::zero()
    }
}

/// Fixed-point currency amount stored as signed centavos (i64, scale 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Centavos(i64);

impl Centavos {
    const SCALE: i64 = 100;

    /// Create from a raw centavo count
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw centavo count
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl Amount for Centavos {
    fn from_decimal_str(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();

        let (is_negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (integer_part, decimal_part) = match s.split_once('.') {
            Some((int, dec)) => (int, dec),
            None => (s, ""),
        };

        // At most 2 decimal places, digits only: a sign or second
        // separator embedded after the point is malformed
        if decimal_part.len() > 2 || !decimal_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidAmount);
        }

        let integer: i64 = integer_part
            .parse()
            .map_err(|_| DomainError::InvalidAmount)?;
        if integer < 0 {
            // A second sign inside the integer part is malformed
            return Err(DomainError::InvalidAmount);
        }

        let centavos: i64 = if decimal_part.is_empty() {
            0
        } else {
            format!("{:0<2}", decimal_part)
                .parse()
                .map_err(|_| DomainError::InvalidAmount)?
        };

        let scaled = integer
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(centavos))
            .ok_or(DomainError::Overflow)?;

        Ok(Self(if is_negative { -scaled } else { scaled }))
    }

    fn to_decimal_string(&self) -> String {
        let abs = self.0.abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, abs / Self::SCALE, abs % Self::SCALE)
    }

    fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    fn zero() -> Self {
        Self(0)
    }
}

impl Add for Centavos {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Centavos {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for Centavos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

// Amounts cross the gateway boundary as decimal strings, never raw centavos
impl Serialize for Centavos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Centavos {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Centavos::from_decimal_str(&s).map_err(serde::de::Error::custom)
    }
}

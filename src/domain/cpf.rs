use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Validated CPF, the natural key accounts are resolved by
///
/// Stored normalized as 11 ASCII digits. Accepts both the bare form
/// ("12345678909") and the punctuated form ("123.456.789-09") on parse,
/// and verifies both mod-11 check digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// The normalized 11-digit string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check_digit(digits: &[u8], len: usize) -> u8 {
        // Weights descend from len+1 down to 2 over the first `len` digits
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, &d)| u32::from(d) * (len as u32 + 1 - i as u32))
            .sum();
        ((sum * 10) % 11 % 10) as u8
    }
}

impl FromStr for Cpf {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !matches!(c, '.' | '-')).collect();

        if normalized.len() != 11 || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidIdentifier(s.to_string()));
        }

        let digits: Vec<u8> = normalized.bytes().map(|b| b - b'0').collect();

        // Repdigit sequences like 111.111.111-11 pass the checksum but are
        // not issuable CPFs
        if digits.iter().all(|&d| d == digits[0]) {
            return Err(DomainError::InvalidIdentifier(s.to_string()));
        }

        if Self::check_digit(&digits, 9) != digits[9] || Self::check_digit(&digits, 10) != digits[10]
        {
            return Err(DomainError::InvalidIdentifier(s.to_string()));
        }

        Ok(Self(normalized))
    }
}

impl TryFrom<String> for Cpf {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

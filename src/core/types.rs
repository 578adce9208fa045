//! Core type definitions used throughout the codebase

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Simulation turn counter
pub type Turn = u32;

/// Rejection produced when parsing a country code or edge key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("country code must be three ASCII letters, got {0:?}")]
    InvalidCountryCode(String),

    #[error("edge key must look like \"AAA|BBB\" with distinct codes, got {0:?}")]
    InvalidEdgeKey(String),
}

/// ISO 3166-1 alpha-3 style country code ("DEU", "FRA", ...)
///
/// Stored inline as three uppercase ASCII bytes, so ordering is the
/// lexicographic ordering of the code string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode([u8; 3]);

impl CountryCode {
    /// Parse a code, normalising to uppercase
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let bytes = raw.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(CodeError::InvalidCountryCode(raw.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII letters
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.as_str().to_string()
    }
}

/// Unordered country pair, normalised so that `low < high`
///
/// This is the single canonical key for everything stored per border:
/// relation edges, postures and relation-effect ledger entries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EdgeKey {
    low: CountryCode,
    high: CountryCode,
}

impl EdgeKey {
    /// Build a key from either argument order. Returns `None` for a self-pair.
    pub fn new(a: CountryCode, b: CountryCode) -> Option<Self> {
        match a.cmp(&b) {
            Ordering::Less => Some(Self { low: a, high: b }),
            Ordering::Greater => Some(Self { low: b, high: a }),
            Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> CountryCode {
        self.low
    }

    pub fn high(&self) -> CountryCode {
        self.high
    }

    pub fn contains(&self, code: CountryCode) -> bool {
        self.low == code || self.high == code
    }

    /// The endpoint opposite to `code`, if `code` is on this edge
    pub fn other(&self, code: CountryCode) -> Option<CountryCode> {
        if self.low == code {
            Some(self.high)
        } else if self.high == code {
            Some(self.low)
        } else {
            None
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let invalid = || CodeError::InvalidEdgeKey(raw.to_string());
        let (a, b) = raw.split_once('|').ok_or_else(invalid)?;
        let a = CountryCode::parse(a).map_err(|_| invalid())?;
        let b = CountryCode::parse(b).map_err(|_| invalid())?;
        Self::new(a, b).ok_or_else(invalid)
    }
}

impl Ord for EdgeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.low, self.high).cmp(&(other.low, other.high))
    }
}

impl PartialOrd for EdgeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.low, self.high)
    }
}

impl fmt::Debug for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeKey({}|{})", self.low, self.high)
    }
}

impl FromStr for EdgeKey {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EdgeKey {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EdgeKey> for String {
    fn from(key: EdgeKey) -> Self {
        key.to_string()
    }
}

/// Round half-up (toward positive infinity), i.e. `floor(x + 0.5)`
///
/// `f64::round` rounds half away from zero, which disagrees for negative
/// half-way values such as -2.5.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

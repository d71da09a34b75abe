//! Purchase prices.
//!
//! Prices are typed in by people who use either `,` or `.` as the decimal
//! separator, so both are accepted. Internally a price is a whole number of
//! cents.

use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
  #[error("price may only contain digits and, optionally, two decimal places")]
  Malformed,
  #[error("price is too large")]
  Overflow,
}

/// A non-negative amount in cents.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Price(i64);

static PRICE_RE: OnceLock<Regex> = OnceLock::new();

fn price_regex() -> &'static Regex {
  PRICE_RE.get_or_init(|| {
    Regex::new(r"^(?<whole>[0-9]+)(?:[.,](?<frac>[0-9]{1,2}))?$")
      .unwrap_or_else(|e| panic!("price regex failed to compile: {e}"))
  })
}

impl Price {
  pub const ZERO: Self = Self(0);

  pub fn from_cents(cents: i64) -> Option<Self> {
    (cents >= 0).then_some(Self(cents))
  }

  pub fn cents(self) -> i64 { self.0 }

  /// Parse `"12"`, `"12.5"`, `"12,50"` and friends.
  pub fn parse(text: &str) -> Result<Self, PriceError> {
    let caps = price_regex()
      .captures(text.trim())
      .ok_or(PriceError::Malformed)?;

    let whole: i64 = caps["whole"].parse().map_err(|_| PriceError::Overflow)?;
    let frac = match caps.name("frac").map(|m| m.as_str()) {
      None => 0,
      // One digit means tenths: "12,5" is twelve and a half.
      Some(d) if d.len() == 1 => i64::from(d.as_bytes()[0] - b'0') * 10,
      Some(d) => d.parse::<i64>().map_err(|_| PriceError::Malformed)?,
    };

    whole
      .checked_mul(100)
      .and_then(|c| c.checked_add(frac))
      .map(Self)
      .ok_or(PriceError::Overflow)
  }
}

impl FromStr for Price {
  type Err = PriceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Price {
  type Error = PriceError;

  fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<Price> for String {
  fn from(p: Price) -> Self { p.to_string() }
}

impl fmt::Display for Price {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
  }
}

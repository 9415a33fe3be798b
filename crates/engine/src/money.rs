use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed amount of money in **integer cents**.
///
/// Balances, budget totals and transaction amounts are all stored as `i64`
/// cents; `Money` is the typed view used at the edges (parsing user input,
/// printing reports).
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "12,34".parse().unwrap();
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string (`.` or `,` separator, optional sign, at most
    /// two fractional digits) into cents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| EngineError::InvalidAmount(msg.to_string());

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, trimmed[1..].trim_start()),
            Some(b'+') => (false, trimmed[1..].trim_start()),
            _ => (false, trimmed),
        };
        if digits.is_empty() {
            return Err(invalid("empty amount"));
        }

        let normalized = digits.replace(',', ".");
        let (units, fraction) = normalized
            .split_once('.')
            .unwrap_or((normalized.as_str(), ""));

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
            return Err(invalid("invalid amount"));
        }
        if fraction.len() > 2 {
            return Err(invalid("too many decimals"));
        }

        let units: i64 = units.parse().map_err(|_| invalid("amount too large"))?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("invalid amount"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("invalid amount"))?,
        };

        let cents = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction_cents))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(7).to_string(), "0.07");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_both_separators() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().cents(), -1);
        assert_eq!(" +3 ".parse::<Money>().unwrap().cents(), 300);
        assert_eq!("4.".parse::<Money>().unwrap().cents(), 400);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("1e3".parse::<Money>().is_err());
    }
}

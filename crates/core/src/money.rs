//! Money in the store's single currency.

use core::iter::Sum;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An amount in minor currency units (e.g. cents).
///
/// There is exactly one store currency, so no currency code is carried.
/// Arithmetic saturates at `u64::MAX` rather than wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

const MINOR_PER_MAJOR: u64 = 100;

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Price of `quantity` units at this unit price.
    pub fn times(self, quantity: u32) -> Amount {
        Amount(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Parse a decimal amount in major units (`"100"`, `"99.5"`, `"99.50"`).
    pub fn parse_major(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(DomainError::validation("amount is empty"));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(format!(
                "amount '{raw}' has more than two decimal places"
            )));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(DomainError::validation(format!("amount '{raw}' is not a decimal")));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| DomainError::validation(format!("amount '{raw}' is too large")))?
        };
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => u64::from(frac.as_bytes()[0] - b'0') * 10,
            _ => frac.parse().unwrap_or(0),
        };

        whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(frac))
            .map(Amount)
            .ok_or_else(|| DomainError::validation(format!("amount '{raw}' is too large")))
    }

    /// Convert a backend numeric (major units, possibly fractional) into an amount.
    ///
    /// Rounds to the nearest minor unit.
    pub fn from_major_f64(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::validation(format!("amount {value} is not a valid price")));
        }
        let minor = (value * MINOR_PER_MAJOR as f64).round();
        if minor > u64::MAX as f64 {
            return Err(DomainError::validation(format!("amount {value} is too large")));
        }
        Ok(Amount(minor as u64))
    }

    /// Major-unit decimal with exactly two places, e.g. `250.00`.
    pub fn to_major_string(self) -> String {
        format!("{}.{:02}", self.0 / MINOR_PER_MAJOR, self.0 % MINOR_PER_MAJOR)
    }

    /// Display form prefixed with a currency label, e.g. `Ksh. 250.00`.
    pub fn labelled(self, label: &str) -> String {
        if label.is_empty() {
            self.to_major_string()
        } else {
            format!("{label} {}", self.to_major_string())
        }
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_major_string())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_two_decimal_places() {
        assert_eq!(Amount::new(25000).to_string(), "250.00");
        assert_eq!(Amount::new(5).to_string(), "0.05");
        assert_eq!(Amount::new(25000).labelled("Ksh."), "Ksh. 250.00");
        assert_eq!(Amount::new(25000).labelled(""), "250.00");
    }

    #[test]
    fn parses_major_units() {
        assert_eq!(Amount::parse_major("100").unwrap(), Amount::new(10000));
        assert_eq!(Amount::parse_major("99.5").unwrap(), Amount::new(9950));
        assert_eq!(Amount::parse_major("99.05").unwrap(), Amount::new(9905));
        assert_eq!(Amount::parse_major(".5").unwrap(), Amount::new(50));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for raw in ["", ".", "-1", "1.234", "abc", "1,5"] {
            assert!(Amount::parse_major(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn converts_backend_numbers() {
        assert_eq!(Amount::from_major_f64(100.0).unwrap(), Amount::new(10000));
        assert_eq!(Amount::from_major_f64(19.99).unwrap(), Amount::new(1999));
        assert!(Amount::from_major_f64(-1.0).is_err());
        assert!(Amount::from_major_f64(f64::NAN).is_err());
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(Amount::new(u64::MAX).times(2), Amount::new(u64::MAX));
        let total: Amount = [Amount::new(u64::MAX), Amount::new(1)].into_iter().sum();
        assert_eq!(total, Amount::new(u64::MAX));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the display form parses back to the same amount.
            #[test]
            fn major_string_parses_back(minor in 0u64..10_000_000_000) {
                let amount = Amount::new(minor);
                prop_assert_eq!(Amount::parse_major(&amount.to_major_string()).unwrap(), amount);
            }
        }
    }
}

//! Value objects: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// ISO-4217 style currency code (three ASCII letters, stored upper-case).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(EngineError::validation(format!(
                "currency code must be three letters, got '{}'",
                raw.trim()
            )));
        }
        Ok(Self(code))
    }

    /// Russian rouble, the default price-list currency.
    pub fn rub() -> Self {
        Self(String::from("RUB"))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A price in major currency units (e.g. `750.0 RUB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// True when the amounts differ by strictly more than `epsilon`.
    ///
    /// Amounts in different currencies are never "equal within epsilon".
    pub fn differs_from(&self, other: &Money, epsilon: f64) -> bool {
        !self.same_currency(other) || (self.amount - other.amount).abs() > epsilon
    }

    /// Relative change from `self` to `other` (0.15 == +15%). `None` across
    /// currencies or when `self` is zero.
    pub fn relative_change_to(&self, other: &Money) -> Option<f64> {
        if !self.same_currency(other) || self.amount == 0.0 {
            return None;
        }
        Some((other.amount - self.amount) / self.amount)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rub(amount: f64) -> Money {
        Money::new(amount, Currency::parse("RUB").unwrap())
    }

    #[test]
    fn currency_is_upper_cased() {
        let c = Currency::parse(" rub ").unwrap();
        assert_eq!(c.code(), "RUB");
        assert!(Currency::parse("RUBLE").is_err());
        assert!(Currency::parse("R1B").is_err());
        assert!(Currency::parse("").is_err());
    }

    #[test]
    fn rub_matches_parsed_code() {
        assert_eq!(Currency::rub(), Currency::parse("rub").unwrap());
        assert_eq!(Currency::rub().to_string(), "RUB");
    }

    #[test]
    fn differs_from_respects_epsilon() {
        assert!(!rub(750.0).differs_from(&rub(750.005), 0.01));
        assert!(rub(750.0).differs_from(&rub(750.02), 0.01));
        assert!(rub(750.0).differs_from(&rub(850.0), 0.01));
    }

    #[test]
    fn differs_from_across_currencies() {
        let usd = Money::new(750.0, Currency::parse("USD").unwrap());
        assert!(rub(750.0).differs_from(&usd, 0.01));
        assert_eq!(rub(750.0).relative_change_to(&usd), None);
    }

    #[test]
    fn relative_change() {
        let change = rub(100.0).relative_change_to(&rub(115.0)).unwrap();
        assert!((change - 0.15).abs() < 1e-9);
        assert_eq!(rub(0.0).relative_change_to(&rub(10.0)), None);
    }

    #[test]
    fn currency_deserializes_through_validation() {
        let ok: Currency = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(ok.code(), "EUR");
        assert!(serde_json::from_str::<Currency>("\"euro\"").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: price comparison is symmetric.
            #[test]
            fn differs_from_is_symmetric(
                a in 0.0f64..100_000.0,
                b in 0.0f64..100_000.0,
                epsilon in 0.0f64..5.0,
            ) {
                prop_assert_eq!(rub(a).differs_from(&rub(b), epsilon), rub(b).differs_from(&rub(a), epsilon));
            }

            /// Property: a price never differs from itself.
            #[test]
            fn price_never_differs_from_itself(a in 0.0f64..100_000.0) {
                prop_assert!(!rub(a).differs_from(&rub(a), 0.0));
            }
        }
    }
}

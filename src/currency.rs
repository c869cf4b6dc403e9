//! Currency conversion against a static, operator-configured rate table
//!
//! All rates are anchored to UZS (rate 1). Conversion is two-hop: source
//! currency → UZS → target currency. Unknown codes are fail-open: the
//! amount is returned unchanged rather than dropping the transaction.

use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::debug;

lazy_static! {
    /// Units of UZS per one unit of the keyed currency.
    /// Updated out-of-band; never fetched at runtime.
    static ref EXCHANGE_RATES: HashMap<&'static str, f64> = {
        let mut rates = HashMap::new();
        rates.insert("UZS", 1.0);
        rates.insert("USD", 12700.0);
        rates.insert("EUR", 13800.0);
        rates.insert("RUB", 130.0);
        rates.insert("KZT", 26.0);
        rates
    };
}

/// Symbol/word patterns checked against the uppercased text.
const CURRENCY_PATTERNS: &[(&str, &str)] = &[
    ("$", "USD"),
    ("USD", "USD"),
    ("DOLLAR", "USD"),
    ("€", "EUR"),
    ("EUR", "EUR"),
    ("EURO", "EUR"),
    ("₽", "RUB"),
    ("RUB", "RUB"),
    ("RUBLE", "RUB"),
    ("₸", "KZT"),
    ("KZT", "KZT"),
    ("TENGE", "KZT"),
    ("SOM", "UZS"),
    ("SO'M", "UZS"),
    ("UZS", "UZS"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyConverter;

impl CurrencyConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert `amount` between currency codes (case-insensitive).
    ///
    /// Identity when the codes match; fail-open identity when either code
    /// is missing from the rate table. Result is rounded half-up to two
    /// decimal places.
    pub fn convert(&self, amount: f64, from_currency: &str, to_currency: &str) -> f64 {
        let from = from_currency.trim().to_uppercase();
        let to = to_currency.trim().to_uppercase();

        if from == to {
            return amount;
        }

        let (from_rate, to_rate) = match (EXCHANGE_RATES.get(from.as_str()), EXCHANGE_RATES.get(to.as_str())) {
            (Some(f), Some(t)) => (*f, *t),
            _ => {
                debug!(from = %from, to = %to, "unknown currency code, skipping conversion");
                return amount;
            }
        };

        let amount_in_uzs = amount * from_rate;
        let result = amount_in_uzs / to_rate;

        round2(result)
    }

    /// True when the code has an entry in the rate table.
    pub fn knows(&self, code: &str) -> bool {
        EXCHANGE_RATES.contains_key(code.trim().to_uppercase().as_str())
    }

    /// Best-effort currency detection from free text. Returns the first
    /// matching symbol/code/word, or None.
    pub fn detect_currency(&self, text: &str) -> Option<&'static str> {
        let upper = text.to_uppercase();
        CURRENCY_PATTERNS
            .iter()
            .find(|(pattern, _)| upper.contains(pattern))
            .map(|(_, code)| *code)
    }
}

/// Half-up rounding to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_same_currency() {
        let converter = CurrencyConverter::new();
        assert_eq!(converter.convert(1234.56, "UZS", "UZS"), 1234.56);
        // Case-insensitive identity must not round-trip through the table
        assert_eq!(converter.convert(0.333, "usd", "USD"), 0.333);
    }

    #[test]
    fn test_usd_to_uzs() {
        let converter = CurrencyConverter::new();
        assert_eq!(converter.convert(50.0, "USD", "UZS"), 635_000.0);
    }

    #[test]
    fn test_uzs_to_usd() {
        let converter = CurrencyConverter::new();
        assert_eq!(converter.convert(12700.0, "UZS", "USD"), 1.0);
    }

    #[test]
    fn test_cross_rate_through_reference() {
        let converter = CurrencyConverter::new();
        // 1 EUR = 13800 UZS; 13800 / 130 RUB
        assert_eq!(converter.convert(1.0, "EUR", "RUB"), 106.15);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let converter = CurrencyConverter::new();
        let amount = 75.0;
        let there = converter.convert(amount, "USD", "EUR");
        let back = converter.convert(there, "EUR", "USD");
        assert!((back - amount).abs() < 0.01);
    }

    #[test]
    fn test_unknown_currency_fail_open() {
        let converter = CurrencyConverter::new();
        assert_eq!(converter.convert(99.0, "GBP", "UZS"), 99.0);
        assert_eq!(converter.convert(99.0, "UZS", "GBP"), 99.0);
    }

    #[test]
    fn test_result_rounded_to_two_decimals() {
        let converter = CurrencyConverter::new();
        // 100 RUB = 13000 UZS = 13000/12700 USD = 1.0236...
        assert_eq!(converter.convert(100.0, "RUB", "USD"), 1.02);
    }

    #[test]
    fn test_detect_currency() {
        let converter = CurrencyConverter::new();
        assert_eq!(converter.detect_currency("spent $50 on dinner"), Some("USD"));
        assert_eq!(converter.detect_currency("50 dollars for dinner"), Some("USD"));
        assert_eq!(converter.detect_currency("5000 so'm kofe"), Some("UZS"));
        assert_eq!(converter.detect_currency("nothing here"), None);
    }
}

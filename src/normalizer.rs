//! Extraction normalization — the core of the pipeline
//!
//! Turns raw extractor output into canonical, ready-to-persist
//! transaction records: validates required fields, fills defaults, and
//! converts every amount into the user's home currency. A single record
//! missing its required fields fails the whole extraction; inside a
//! multi-transaction batch, broken records are dropped individually and
//! only a fully-empty batch fails.

use crate::currency::CurrencyConverter;
use crate::error::AssistantError;
use crate::models::{
    is_known_category, ExtractionResult, NormalizedBatch, RawTransaction, TransactionRecord,
    TransactionType,
};
use chrono::NaiveDate;
use tracing::debug;

/// Maximum length of a defaulted description, in characters.
const DESCRIPTION_MAX_CHARS: usize = 100;

pub struct Normalizer {
    converter: CurrencyConverter,
}

impl Normalizer {
    pub fn new(converter: CurrencyConverter) -> Self {
        Self { converter }
    }

    /// Normalize an extraction result against the user's home currency.
    ///
    /// `source_text` is the user's original utterance; defaulted
    /// descriptions always derive from it, never from extractor-supplied
    /// partial text. `today` is injected for testability.
    pub fn normalize(
        &self,
        result: ExtractionResult,
        home_currency: &str,
        source_text: &str,
        today: NaiveDate,
    ) -> crate::Result<NormalizedBatch> {
        match result {
            ExtractionResult::Unparseable => Err(AssistantError::Validation(
                "extraction was unparseable".to_string(),
            )),
            ExtractionResult::Single(raw) => {
                let record = self
                    .normalize_record(raw, home_currency, source_text, today)
                    .ok_or_else(|| {
                        AssistantError::Validation(
                            "transaction is missing amount or type".to_string(),
                        )
                    })?;
                Ok(NormalizedBatch {
                    records: vec![record],
                    multiple: false,
                })
            }
            ExtractionResult::Multiple(raws) => {
                let total = raws.len();
                let records: Vec<TransactionRecord> = raws
                    .into_iter()
                    .filter_map(|raw| {
                        self.normalize_record(raw, home_currency, source_text, today)
                    })
                    .collect();

                if records.is_empty() {
                    return Err(AssistantError::Validation(format!(
                        "all {} extracted transactions were invalid",
                        total
                    )));
                }

                if records.len() < total {
                    debug!(
                        kept = records.len(),
                        dropped = total - records.len(),
                        "dropped invalid records from multi-transaction batch"
                    );
                }

                Ok(NormalizedBatch {
                    records,
                    multiple: true,
                })
            }
        }
    }

    /// Validate one raw record, fill its defaults, and convert the amount
    /// into the home currency. Returns None when amount or type is
    /// missing/invalid.
    fn normalize_record(
        &self,
        raw: RawTransaction,
        home_currency: &str,
        source_text: &str,
        today: NaiveDate,
    ) -> Option<TransactionRecord> {
        let amount = raw.amount.filter(|a| *a > 0.0)?;
        let kind = raw.kind.as_deref().and_then(TransactionType::parse)?;

        let category = match raw.category {
            Some(c) if is_known_category(&c) => c.trim().to_lowercase(),
            _ => "other".to_string(),
        };

        let description = match raw.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => truncate_chars(source_text, DESCRIPTION_MAX_CHARS),
        };

        let date = raw
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(today);

        let home = home_currency.trim().to_uppercase();
        let detected = raw
            .currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| home.clone());

        let (amount, original_amount, original_currency) = if detected != home {
            let converted = self.converter.convert(amount, &detected, &home);
            (converted, Some(amount), Some(detected))
        } else {
            (amount, None, None)
        };

        Some(TransactionRecord {
            amount,
            kind,
            category,
            description,
            date,
            currency: home,
            original_amount,
            original_currency,
        })
    }
}

/// Char-safe prefix truncation (byte slicing would panic mid-codepoint).
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(CurrencyConverter::new())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn raw(amount: Option<f64>, kind: Option<&str>) -> RawTransaction {
        RawTransaction {
            amount,
            kind: kind.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unparseable_is_validation_failure() {
        let err = normalizer()
            .normalize(ExtractionResult::Unparseable, "UZS", "text", today())
            .unwrap_err();
        assert!(matches!(err, AssistantError::Validation(_)));
    }

    #[test]
    fn test_single_missing_amount_fails() {
        let result = ExtractionResult::Single(raw(None, Some("expense")));
        let err = normalizer()
            .normalize(result, "UZS", "text", today())
            .unwrap_err();
        assert!(matches!(err, AssistantError::Validation(_)));
    }

    #[test]
    fn test_single_missing_type_fails() {
        let result = ExtractionResult::Single(raw(Some(5000.0), None));
        assert!(normalizer().normalize(result, "UZS", "text", today()).is_err());
    }

    #[test]
    fn test_single_unknown_type_fails() {
        let result = ExtractionResult::Single(raw(Some(5000.0), Some("transfer")));
        assert!(normalizer().normalize(result, "UZS", "text", today()).is_err());
    }

    #[test]
    fn test_non_positive_amount_fails() {
        let result = ExtractionResult::Single(raw(Some(0.0), Some("expense")));
        assert!(normalizer().normalize(result, "UZS", "text", today()).is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let result = ExtractionResult::Single(raw(Some(5000.0), Some("expense")));
        let batch = normalizer()
            .normalize(result, "UZS", "5000 for coffee", today())
            .unwrap();
        let record = &batch.records[0];
        assert_eq!(record.category, "other");
        assert_eq!(record.description, "5000 for coffee");
        assert_eq!(record.date, today());
        assert_eq!(record.currency, "UZS");
        assert!(record.original_amount.is_none());
        assert!(!batch.multiple);
    }

    #[test]
    fn test_unrecognized_category_defaults_to_other() {
        let mut raw_tx = raw(Some(5000.0), Some("expense"));
        raw_tx.category = Some("crypto".to_string());
        let batch = normalizer()
            .normalize(ExtractionResult::Single(raw_tx), "UZS", "text", today())
            .unwrap();
        assert_eq!(batch.records[0].category, "other");
    }

    #[test]
    fn test_description_defaults_from_source_utterance_truncated() {
        let long_text = "x".repeat(250);
        let result = ExtractionResult::Single(raw(Some(100.0), Some("income")));
        let batch = normalizer()
            .normalize(result, "UZS", &long_text, today())
            .unwrap();
        assert_eq!(batch.records[0].description.chars().count(), 100);
    }

    #[test]
    fn test_unparseable_date_defaults_to_today() {
        let mut raw_tx = raw(Some(100.0), Some("income"));
        raw_tx.date = Some("yesterday".to_string());
        let batch = normalizer()
            .normalize(ExtractionResult::Single(raw_tx), "UZS", "text", today())
            .unwrap();
        assert_eq!(batch.records[0].date, today());
    }

    #[test]
    fn test_explicit_date_kept() {
        let mut raw_tx = raw(Some(100.0), Some("income"));
        raw_tx.date = Some("2025-01-02".to_string());
        let batch = normalizer()
            .normalize(ExtractionResult::Single(raw_tx), "UZS", "text", today())
            .unwrap();
        assert_eq!(
            batch.records[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_same_currency_no_original_tracking() {
        let mut raw_tx = raw(Some(5000.0), Some("expense"));
        raw_tx.category = Some("food".to_string());
        raw_tx.currency = Some("UZS".to_string());
        let batch = normalizer()
            .normalize(ExtractionResult::Single(raw_tx), "UZS", "5000 for coffee", today())
            .unwrap();
        let record = &batch.records[0];
        assert_eq!(record.amount, 5000.0);
        assert_eq!(record.currency, "UZS");
        assert!(record.original_amount.is_none());
        assert!(record.original_currency.is_none());
    }

    #[test]
    fn test_foreign_currency_converted_with_original_tracking() {
        let mut raw_tx = raw(Some(50.0), Some("expense"));
        raw_tx.category = Some("food".to_string());
        raw_tx.currency = Some("USD".to_string());
        let batch = normalizer()
            .normalize(
                ExtractionResult::Single(raw_tx),
                "UZS",
                "50 dollars for dinner",
                today(),
            )
            .unwrap();
        let record = &batch.records[0];
        assert_eq!(record.amount, 635_000.0);
        assert_eq!(record.currency, "UZS");
        assert_eq!(record.original_amount, Some(50.0));
        assert_eq!(record.original_currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_currency_case_insensitive_no_spurious_original() {
        let mut raw_tx = raw(Some(10.0), Some("expense"));
        raw_tx.currency = Some("uzs".to_string());
        let batch = normalizer()
            .normalize(ExtractionResult::Single(raw_tx), "UZS", "text", today())
            .unwrap();
        assert!(batch.records[0].original_amount.is_none());
    }

    #[test]
    fn test_multiple_drops_invalid_records_individually() {
        let result = ExtractionResult::Multiple(vec![
            raw(Some(5000.0), Some("expense")),
            raw(None, Some("expense")),
            raw(Some(10000.0), Some("expense")),
            raw(Some(300.0), None),
        ]);
        let batch = normalizer()
            .normalize(result, "UZS", "text", today())
            .unwrap();
        assert_eq!(batch.records.len(), 2);
        assert!(batch.multiple);
        assert_eq!(batch.total(), 15000.0);
    }

    #[test]
    fn test_multiple_with_no_valid_records_fails() {
        let result = ExtractionResult::Multiple(vec![
            raw(None, Some("expense")),
            raw(Some(100.0), None),
        ]);
        assert!(normalizer().normalize(result, "UZS", "text", today()).is_err());
    }

    #[test]
    fn test_multiple_each_record_converted_independently() {
        let mut usd = raw(Some(50.0), Some("expense"));
        usd.currency = Some("USD".to_string());
        let mut uzs = raw(Some(5000.0), Some("expense"));
        uzs.currency = Some("UZS".to_string());
        let mut eur = raw(Some(10.0), Some("income"));
        eur.currency = Some("EUR".to_string());

        let batch = normalizer()
            .normalize(
                ExtractionResult::Multiple(vec![usd, uzs, eur]),
                "UZS",
                "text",
                today(),
            )
            .unwrap();

        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.records[0].amount, 635_000.0);
        assert_eq!(batch.records[1].amount, 5000.0);
        assert!(batch.records[1].original_amount.is_none());
        assert_eq!(batch.records[2].amount, 138_000.0);
        assert_eq!(batch.records[2].original_currency.as_deref(), Some("EUR"));
    }
}

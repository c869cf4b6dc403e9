//! Core data models for the finance assistant

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Parse the extractor's free-form `type` string. Anything outside the
    /// two known values is treated as invalid, not defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Paid,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Paid => "paid",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uz,
    Ru,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Uz => "uz",
            Language::Ru => "ru",
            Language::En => "en",
        }
    }

    /// Speech-recognition dialect code for the specialized backend.
    pub fn dialect_code(&self) -> &'static str {
        match self {
            Language::Uz => "uz-UZ",
            Language::Ru => "ru-RU",
            Language::En => "en-US",
        }
    }

    /// Unknown codes fall back to Uzbek, the product default.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ru" => Language::Ru,
            "en" => Language::En,
            _ => Language::Uz,
        }
    }
}

//
// ================= Category Vocabularies =================
//

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "food",
    "transport",
    "housing",
    "health",
    "entertainment",
    "shopping",
    "education",
    "other",
];

pub const INCOME_CATEGORIES: &[&str] = &[
    "salary",
    "business",
    "gift",
    "investment",
    "other",
];

/// True when the category belongs to either vocabulary (case-insensitive).
pub fn is_known_category(category: &str) -> bool {
    let lowered = category.trim().to_lowercase();
    EXPENSE_CATEGORIES.contains(&lowered.as_str()) || INCOME_CATEGORIES.contains(&lowered.as_str())
}

//
// ================= Transactions =================
//

/// Canonical, ready-to-persist transaction. `amount` is always in the
/// owner's home currency; `original_amount`/`original_currency` are kept
/// only when a nontrivial conversion occurred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
}

/// A transaction as returned by the ledger store, with its assigned id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTransaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

/// Raw extractor output for one candidate transaction. Everything is
/// optional here; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Discriminated extractor outcome consumed uniformly by the normalizer.
#[derive(Debug, Clone)]
pub enum ExtractionResult {
    Single(RawTransaction),
    Multiple(Vec<RawTransaction>),
    Unparseable,
}

/// Normalizer output: at least one record, tagged so the caller can render
/// an aggregate summary for multi-transaction utterances.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<TransactionRecord>,
    pub multiple: bool,
}

impl NormalizedBatch {
    /// Sum of home-currency amounts, used in the aggregate reply.
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

//
// ================= Loans =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanRecord {
    pub person_name: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    pub given_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredLoan {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub loan: LoanRecord,
}

//
// ================= Users =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub language: Language,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

//
// ================= Monthly Summary =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub transactions: Vec<StoredTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!(TransactionType::parse("income"), Some(TransactionType::Income));
        assert_eq!(TransactionType::parse(" Expense "), Some(TransactionType::Expense));
        assert_eq!(TransactionType::parse("transfer"), None);
        assert_eq!(TransactionType::parse(""), None);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("ru"), Language::Ru);
        assert_eq!(Language::from_code("xx"), Language::Uz);
        assert_eq!(Language::Uz.dialect_code(), "uz-UZ");
    }

    #[test]
    fn test_known_categories() {
        assert!(is_known_category("food"));
        assert!(is_known_category("SALARY"));
        assert!(!is_known_category("crypto"));
    }

    #[test]
    fn test_raw_transaction_lenient_deserialization() {
        let raw: RawTransaction = serde_json::from_str(r#"{"amount": 5000}"#).unwrap();
        assert_eq!(raw.amount, Some(5000.0));
        assert!(raw.kind.is_none());
        assert!(raw.currency.is_none());
    }

    #[test]
    fn test_record_serialization_skips_absent_original() {
        let record = TransactionRecord {
            amount: 5000.0,
            kind: TransactionType::Expense,
            category: "food".to_string(),
            description: "coffee".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            currency: "UZS".to_string(),
            original_amount: None,
            original_currency: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("original_amount"));
        assert!(json.contains("\"type\":\"expense\""));
    }
}

//! Display helpers for user-facing messages

use crate::models::{Language, StoredTransaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

const MONTHS_UZ: [&str; 12] = [
    "Yanvar", "Fevral", "Mart", "Aprel", "May", "Iyun",
    "Iyul", "Avgust", "Sentabr", "Oktabr", "Noyabr", "Dekabr",
];

const MONTHS_RU: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь",
    "Июль", "Август", "Сентябрь", "Октябрь", "Ноябрь", "Декабрь",
];

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Format an amount with thin-space thousand separators.
/// Whole amounts drop the fraction; fractional ones keep two digits.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    // Round to cents first so 999.999 groups as 1 000, not 999.100
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        out.push_str(&format!(".{:02}", fraction));
    }
    out
}

/// DD.MM.YYYY
pub fn format_date(date: NaiveDate) -> String {
    format!("{:02}.{:02}.{}", date.day(), date.month(), date.year())
}

pub fn month_name(month: u32, language: Language) -> String {
    if !(1..=12).contains(&month) {
        return month.to_string();
    }
    let table = match language {
        Language::Uz => &MONTHS_UZ,
        Language::Ru => &MONTHS_RU,
        Language::En => &MONTHS_EN,
    };
    table[(month - 1) as usize].to_string()
}

/// Spend/earn totals per category.
pub fn category_breakdown(transactions: &[StoredTransaction]) -> HashMap<String, f64> {
    let mut breakdown = HashMap::new();
    for t in transactions {
        *breakdown.entry(t.record.category.clone()).or_insert(0.0) += t.record.amount;
    }
    breakdown
}

pub fn transaction_emoji(kind: TransactionType, category: &str) -> &'static str {
    if kind == TransactionType::Income {
        return "💰";
    }

    match category.to_lowercase().as_str() {
        "food" => "🍔",
        "transport" => "🚗",
        "housing" => "🏠",
        "health" => "💊",
        "entertainment" => "🎮",
        "shopping" => "🛒",
        "education" => "📚",
        _ => "💸",
    }
}

/// Char-safe truncation with "..." suffix.
pub fn truncate(text: &str, max_length: usize) -> String {
    let count = text.chars().count();
    if count <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_grouping() {
        assert_eq!(format_amount(5000.0), "5 000");
        assert_eq!(format_amount(635000.0), "635 000");
        assert_eq!(format_amount(1234567.0), "1 234 567");
        assert_eq!(format_amount(999.0), "999");
    }

    #[test]
    fn test_format_amount_fraction() {
        assert_eq!(format_amount(1.02), "1.02");
        assert_eq!(format_amount(1000.5), "1 000.50");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(format_date(date), "05.06.2025");
    }

    #[test]
    fn test_month_name_languages() {
        assert_eq!(month_name(1, Language::Uz), "Yanvar");
        assert_eq!(month_name(3, Language::Ru), "Март");
        assert_eq!(month_name(12, Language::En), "December");
        assert_eq!(month_name(13, Language::En), "13");
    }

    #[test]
    fn test_transaction_emoji() {
        assert_eq!(transaction_emoji(TransactionType::Income, "food"), "💰");
        assert_eq!(transaction_emoji(TransactionType::Expense, "food"), "🍔");
        assert_eq!(transaction_emoji(TransactionType::Expense, "unknown"), "💸");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
    }
}

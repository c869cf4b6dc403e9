//! Transaction extraction from free-form utterances
//!
//! Sends a fixed instruction plus the utterance to the text-understanding
//! backend and parses the raw reply into a discriminated
//! [`ExtractionResult`]. Everything that can go wrong on the backend side
//! (sentinel error, invalid JSON, call failure) collapses into
//! `Unparseable` — the extractor never crashes the pipeline.

use crate::models::{ExtractionResult, Language, RawTransaction};
use crate::openai::OpenAiClient;
use async_trait::async_trait;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str =
    "You are a financial data extraction assistant. Always respond with valid JSON only.";

/// One text-understanding backend: prompt in, raw completion out.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> crate::Result<String>;
}

#[async_trait]
impl ExtractionBackend for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> crate::Result<String> {
        self.chat(system, user).await
    }
}

pub struct TransactionExtractor<B: ExtractionBackend> {
    backend: B,
}

impl<B: ExtractionBackend> TransactionExtractor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Extract candidate transaction(s) from an utterance.
    pub async fn extract(
        &self,
        text: &str,
        language: Language,
        home_currency: &str,
    ) -> ExtractionResult {
        let prompt = build_prompt(text, language, home_currency);

        let raw = match self.backend.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Extraction backend call failed: {}", e);
                return ExtractionResult::Unparseable;
            }
        };

        parse_extraction_response(&raw)
    }
}

/// Build the fixed extraction instruction around the utterance.
fn build_prompt(text: &str, language: Language, home_currency: &str) -> String {
    format!(
        r#"Extract transaction information from the user's message.

For a SINGLE transaction, return ONLY a valid JSON object with these fields:
- amount (number, required)
- type ("income" or "expense", required)
- category (string, required)
- description (string, optional)
- date (YYYY-MM-DD format, default to today if not mentioned)
- currency (3-letter code of the currency detected in the message; use "{home}" if none is mentioned)

For MULTIPLE transactions in one message, return ONLY a valid JSON array of such objects.

Examples:
- "5000 for coffee" -> one object
- "5000 for coffee, 10000 for hotdog" -> array of two objects
- "bought coffee for 5000 then hotdog for 10000" -> array of two objects

User message: "{text}"
Language: {lang}

Common categories:
Expense: food, transport, housing, health, entertainment, shopping, education, other
Income: salary, business, gift, investment, other

If you cannot extract valid transaction data, return: {{"error": "Cannot parse transaction"}}"#,
        home = home_currency,
        text = text,
        lang = language.code(),
    )
}

/// Strip an optional markdown code fence (with or without a language tag)
/// from around the backend's reply. Isolated here so a format change in
/// the backend is a one-place fix.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence's language tag line, if any
    let rest = match rest.find('\n') {
        Some(newline) if !rest[..newline].trim().contains(' ') => &rest[newline + 1..],
        _ => rest,
    };
    rest.trim_end_matches('`').trim()
}

/// Parse the (unfenced) backend reply into an extraction result.
fn parse_extraction_response(raw: &str) -> ExtractionResult {
    let cleaned = strip_code_fence(raw);

    let value: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!("Extraction reply is not valid JSON: {} | raw={}", e, raw);
            return ExtractionResult::Unparseable;
        }
    };

    if let Some(array) = value.as_array() {
        return parse_many(array);
    }

    let Some(object) = value.as_object() else {
        warn!("Extraction reply is neither object nor array");
        return ExtractionResult::Unparseable;
    };

    // Sentinel takes precedence over any other fields present
    if object.contains_key("error") {
        debug!("Extraction backend returned the sentinel response");
        return ExtractionResult::Unparseable;
    }

    // Some replies wrap the list in {"transactions": [...]}
    if let Some(array) = object.get("transactions").and_then(|v| v.as_array()) {
        return parse_many(array);
    }

    match serde_json::from_value::<RawTransaction>(value) {
        Ok(raw_tx) => ExtractionResult::Single(raw_tx),
        Err(e) => {
            warn!("Extraction reply object did not match record shape: {}", e);
            ExtractionResult::Unparseable
        }
    }
}

fn parse_many(array: &[serde_json::Value]) -> ExtractionResult {
    let records: Vec<RawTransaction> = array
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    if records.is_empty() {
        ExtractionResult::Unparseable
    } else {
        ExtractionResult::Multiple(records)
    }
}

//! Error types for the finance assistant pipeline

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Pipeline Errors
    // =============================

    /// Both transcription backends exhausted
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Backend returned the sentinel or output that is not valid JSON
    #[error("Extraction unparseable: {0}")]
    Unparseable(String),

    /// Required fields missing, or a batch left empty after per-record filtering
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Persistence call failed; surfaced to the user as a transient error
    #[error("Store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

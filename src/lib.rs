//! Conversational finance-tracking assistant
//!
//! Users report income/expense events and peer-to-peer loans in free-form
//! text or voice messages (Uzbek, Russian or English); the assistant
//! persists structured records and answers aggregate queries.
//!
//! PIPELINE:
//! utterance → (voice) TRANSCRIBE → EXTRACT → NORMALIZE → PERSIST → REPLY

pub mod config;
pub mod currency;
pub mod error;
pub mod extractor;
pub mod format;
pub mod models;
pub mod normalizer;
pub mod openai;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod transcribe;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use pipeline::{Assistant, Reply};

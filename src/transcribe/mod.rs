//! Speech-to-text adapter over the configured backends
//!
//! For Uzbek, the specialized SpeechKit backend is preferred when its two
//! credentials are present; every other language, and Uzbek when SpeechKit
//! is absent or fails, goes through Whisper. Whisper is always called
//! without a language hint: auto-detection across its full language set
//! beats forcing a hint for a low-resource language.

pub mod yandex;

use crate::error::AssistantError;
use crate::models::Language;
use crate::openai::OpenAiClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub use yandex::YandexSpeechKit;

/// One speech-to-text backend: audio bytes in, plain text out.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> crate::Result<String>;
}

#[async_trait]
impl TranscriptionBackend for OpenAiClient {
    async fn transcribe(&self, audio: &[u8], _language: Option<&str>) -> crate::Result<String> {
        // Hint intentionally dropped; see module docs.
        OpenAiClient::transcribe(self, audio, "voice.ogg").await
    }
}

#[async_trait]
impl TranscriptionBackend for YandexSpeechKit {
    async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> crate::Result<String> {
        let dialect = language.unwrap_or("uz-UZ");
        self.transcribe_with_fallback(audio, dialect).await
    }
}

/// Ordered-preference transcription adapter.
pub struct Transcriber {
    specialized: Option<Arc<dyn TranscriptionBackend>>,
    general: Arc<dyn TranscriptionBackend>,
}

impl Transcriber {
    pub fn new(
        specialized: Option<Arc<dyn TranscriptionBackend>>,
        general: Arc<dyn TranscriptionBackend>,
    ) -> Self {
        Self {
            specialized,
            general,
        }
    }

    /// Transcribe a voice message, selecting backends by language.
    ///
    /// Failure is only reported when the general-purpose backend also
    /// fails; a specialized-backend failure falls through silently.
    pub async fn transcribe(&self, audio: &[u8], language: Language) -> crate::Result<String> {
        if language == Language::Uz {
            if let Some(specialized) = &self.specialized {
                match specialized
                    .transcribe(audio, Some(language.dialect_code()))
                    .await
                {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        warn!("Specialized transcription failed, falling back: {}", e);
                    }
                }
            }
        }

        info!(language = language.code(), "Using general-purpose transcription");
        self.general
            .transcribe(audio, None)
            .await
            .map_err(|e| AssistantError::Transcription(e.to_string()))
    }
}

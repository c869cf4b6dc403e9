//! Yandex SpeechKit backend, specialized for Uzbek speech
//!
//! Posts raw OGG-Opus bytes (Telegram voice format) to the SpeechKit REST
//! endpoint. Has a one-level dialect fallback: Uzbek speakers frequently
//! code-switch into Russian, so a failed uz-UZ recognition is retried once
//! as ru-RU before the failure propagates.

use crate::error::AssistantError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const STT_URL: &str = "https://stt.api.cloud.yandex.net/speech/v1/stt:recognize";

pub struct YandexSpeechKit {
    client: Client,
    api_key: String,
    folder_id: String,
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    result: Option<String>,
}

impl YandexSpeechKit {
    pub fn new(api_key: String, folder_id: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            folder_id,
        })
    }

    /// Single recognition attempt in one dialect.
    async fn recognize(&self, audio: &[u8], dialect: &str) -> crate::Result<String> {
        let response = self
            .client
            .post(STT_URL)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .query(&[
                ("lang", dialect),
                ("folderId", self.folder_id.as_str()),
                ("format", "oggopus"),
            ])
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| AssistantError::Transcription(format!("SpeechKit request error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Transcription(format!(
                "SpeechKit error {}: {}",
                status, error_text
            )));
        }

        let stt: SttResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Transcription(format!("SpeechKit parse error: {}", e)))?;

        match stt.result {
            Some(text) if !text.trim().is_empty() => {
                info!(dialect = dialect, "SpeechKit transcription succeeded");
                Ok(text)
            }
            _ => Err(AssistantError::Transcription(
                "SpeechKit response had no result".to_string(),
            )),
        }
    }

    /// Recognize with the dialect fallback applied.
    pub async fn transcribe_with_fallback(
        &self,
        audio: &[u8],
        dialect: &str,
    ) -> crate::Result<String> {
        match self.recognize(audio, dialect).await {
            Ok(text) => Ok(text),
            Err(e) if dialect == "uz-UZ" => {
                warn!("Uzbek transcription failed ({}), retrying as Russian", e);
                self.recognize(audio, "ru-RU").await
            }
            Err(e) => Err(e),
        }
    }
}

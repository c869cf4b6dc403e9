//! OpenAI API client: chat completions and Whisper transcription
//!
//! Uses a long-lived reqwest::Client for connection pooling, with an
//! explicit timeout on every call so a slow backend cannot stall the
//! pipeline indefinitely.

use crate::error::AssistantError;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const CHAT_MODEL: &str = "gpt-4o-mini";
const WHISPER_MODEL: &str = "whisper-1";

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, api_key })
    }

    /// One chat-completion round trip. Low temperature favors
    /// deterministic extraction over creative completion.
    pub async fn chat(&self, system: &str, user: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AssistantError::Config(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: CHAT_MODEL.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.3,
        };

        info!("Calling OpenAI chat API");

        let response = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI chat request failed: {}", e);
                AssistantError::Llm(format!("OpenAI request error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI chat error response: {} - {}", status, error_text);
            return Err(AssistantError::Llm(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse OpenAI response: {}", e);
            AssistantError::Llm(format!("OpenAI parse error: {}", e))
        })?;

        let answer = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::Llm("Empty response from OpenAI".to_string()))?;

        Ok(answer)
    }

    /// Whisper transcription of raw audio bytes.
    ///
    /// Deliberately passes no language parameter: auto-detection across
    /// Whisper's full language set outperforms forcing a hint for Uzbek.
    pub async fn transcribe(&self, audio: &[u8], filename: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AssistantError::Config(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let part = Part::bytes(audio.to_vec())
            .file_name(filename.to_string())
            .mime_str("audio/ogg")
            .map_err(|e| AssistantError::Llm(format!("Invalid audio part: {}", e)))?;

        let form = Form::new().text("model", WHISPER_MODEL).part("file", part);

        info!("Calling Whisper transcription API");

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Whisper request failed: {}", e);
                AssistantError::Transcription(format!("Whisper request error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper error response: {} - {}", status, error_text);
            return Err(AssistantError::Transcription(format!(
                "Whisper API error {}: {}",
                status, error_text
            )));
        }

        let transcription: TranscriptionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Whisper response: {}", e);
            AssistantError::Transcription(format!("Whisper parse error: {}", e))
        })?;

        Ok(transcription.text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: CHAT_MODEL.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a financial data extraction assistant.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "5000 for coffee".to_string(),
                },
            ],
            temperature: 0.3,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("5000 for coffee"));
        assert!(json.contains("\"temperature\":0.3"));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"amount\":5000}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"amount\":5000}");
    }
}

//! Environment-based configuration

use crate::error::AssistantError;
use std::env;

/// Credentials for the specialized Uzbek transcription backend.
/// The backend is enabled only when both values are present.
#[derive(Debug, Clone)]
pub struct YandexConfig {
    pub api_key: String,
    pub folder_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub yandex: Option<YandexConfig>,
    pub database_url: Option<String>,
    pub default_currency: String,
}

impl Config {
    /// Load configuration from the environment (after `dotenv`).
    pub fn from_env() -> crate::Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| AssistantError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let yandex = match (env::var("YANDEX_API_KEY"), env::var("YANDEX_FOLDER_ID")) {
            (Ok(api_key), Ok(folder_id)) if !api_key.is_empty() && !folder_id.is_empty() => {
                Some(YandexConfig { api_key, folder_id })
            }
            _ => None,
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let default_currency = env::var("DEFAULT_CURRENCY")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| v.to_uppercase())
            .unwrap_or_else(|| "UZS".to_string());

        Ok(Self {
            openai_api_key,
            yandex,
            database_url,
            default_currency,
        })
    }
}

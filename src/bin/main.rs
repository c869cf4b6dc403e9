use finance_chat_assistant::{
    config::Config,
    models::Language,
    openai::OpenAiClient,
    pipeline::Assistant,
    store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore},
    transcribe::{Transcriber, TranscriptionBackend, YandexSpeechKit},
};
use std::sync::Arc;
use tracing::info;

const DEMO_TELEGRAM_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Finance chat assistant starting");

    let config = Config::from_env()?;

    let utterance: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let utterance = if utterance.is_empty() {
        "5000 for coffee".to_string()
    } else {
        utterance
    };

    match &config.database_url {
        Some(url) => {
            let store = PostgresLedgerStore::connect(url).await?;
            run_once(store, &config, &utterance).await
        }
        None => run_once(InMemoryLedgerStore::new(), &config, &utterance).await,
    }
}

async fn run_once<S: LedgerStore>(
    store: S,
    config: &Config,
    utterance: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let extraction_backend = OpenAiClient::new(config.openai_api_key.clone())?;

    let general: Arc<dyn TranscriptionBackend> =
        Arc::new(OpenAiClient::new(config.openai_api_key.clone())?);
    let specialized: Option<Arc<dyn TranscriptionBackend>> = match &config.yandex {
        Some(yandex) => Some(Arc::new(YandexSpeechKit::new(
            yandex.api_key.clone(),
            yandex.folder_id.clone(),
        )?)),
        None => None,
    };
    let transcriber = Transcriber::new(specialized, general);

    if store.get_user(DEMO_TELEGRAM_ID).await?.is_none() {
        store
            .create_user(DEMO_TELEGRAM_ID, "Demo", Language::En, &config.default_currency)
            .await?;
    }

    let assistant = Assistant::new(store, extraction_backend, transcriber);

    info!(%utterance, "Processing utterance");
    let user = assistant
        .user(DEMO_TELEGRAM_ID)
        .await?
        .ok_or("demo user missing")?;
    let reply = assistant.handle_text(DEMO_TELEGRAM_ID, utterance).await;

    println!("\n=== REPLY ===");
    println!("{}", reply.render(user.language));

    Ok(())
}

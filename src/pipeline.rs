//! End-to-end utterance pipeline
//!
//! One incoming utterance flows sequentially: (voice → transcription) →
//! extraction → normalization → persistence → reply. The chat transport
//! calls into this module and renders the returned [`Reply`]; failures in
//! understanding surface as a parse-error reply, persistence failures as
//! a transient try-again reply. Nothing here panics or retries.

use crate::currency::CurrencyConverter;
use crate::error::AssistantError;
use crate::extractor::{ExtractionBackend, TransactionExtractor};
use crate::format;
use crate::models::{
    Language, LoanRecord, LoanStatus, MonthlySummary, NormalizedBatch, StoredLoan,
    StoredTransaction, UserProfile,
};
use crate::normalizer::Normalizer;
use crate::session::{PendingAction, SessionStore};
use crate::store::LedgerStore;
use crate::transcribe::Transcriber;
use chrono::Utc;
use tracing::{error, info, warn};

/// Structured outcome of one utterance, rendered by the transport.
#[derive(Debug, Clone)]
pub enum Reply {
    TransactionAdded(StoredTransaction),
    BatchAdded {
        transactions: Vec<StoredTransaction>,
        total: f64,
    },
    LoanAdded(StoredLoan),
    /// Could not understand the utterance (transcription, extraction or
    /// validation failed)
    ParseError,
    /// Persistence failed; the user should retry
    TryAgain,
    /// Unknown user; the transport should start registration
    NeedsRegistration,
}

impl Reply {
    /// User-facing message text for the reply.
    pub fn render(&self, language: Language) -> String {
        match self {
            Reply::TransactionAdded(t) => {
                let emoji = format::transaction_emoji(t.record.kind, &t.record.category);
                let original = match (&t.record.original_amount, &t.record.original_currency) {
                    (Some(amount), Some(code)) => {
                        format!(" ({} {})", format::format_amount(*amount), code)
                    }
                    _ => String::new(),
                };
                let header = match language {
                    Language::Uz => "✅ Tranzaksiya qo'shildi!",
                    Language::Ru => "✅ Транзакция добавлена!",
                    Language::En => "✅ Transaction added!",
                };
                format!(
                    "{}\n\n{} {} {}{}\n📂 {}\n📝 {}\n📅 {}",
                    header,
                    emoji,
                    format::format_amount(t.record.amount),
                    t.record.currency,
                    original,
                    t.record.category,
                    t.record.description,
                    format::format_date(t.record.date),
                )
            }
            Reply::BatchAdded {
                transactions,
                total,
            } => {
                let header = match language {
                    Language::Uz => {
                        format!("✅ {} ta tranzaksiya qo'shildi!", transactions.len())
                    }
                    Language::Ru => {
                        format!("✅ Добавлено транзакций: {}!", transactions.len())
                    }
                    Language::En => format!("✅ Added {} transactions!", transactions.len()),
                };
                let mut out = format!("{}\n\n", header);
                for (i, t) in transactions.iter().enumerate() {
                    let emoji = format::transaction_emoji(t.record.kind, &t.record.category);
                    out.push_str(&format!(
                        "{}. {} {} {} - {}\n   📝 {}\n\n",
                        i + 1,
                        emoji,
                        format::format_amount(t.record.amount),
                        t.record.currency,
                        t.record.category,
                        t.record.description,
                    ));
                }
                let total_label = match language {
                    Language::Uz => "💵 Jami",
                    Language::Ru => "💵 Всего",
                    Language::En => "💵 Total",
                };
                out.push_str(&format!("{}: {}", total_label, format::format_amount(*total)));
                out
            }
            Reply::LoanAdded(l) => {
                let header = match language {
                    Language::Uz => "✅ Qarz qo'shildi!",
                    Language::Ru => "✅ Долг добавлен!",
                    Language::En => "✅ Loan recorded!",
                };
                format!(
                    "{}\n\n👤 {}\n💵 {} {}\n📅 {}",
                    header,
                    l.loan.person_name,
                    format::format_amount(l.loan.amount),
                    l.loan.currency,
                    format::format_date(l.loan.given_date),
                )
            }
            Reply::ParseError => match language {
                Language::Uz => {
                    "❌ Tushunolmadim. Masalan: \"5000 kofe uchun\" deb yozing.".to_string()
                }
                Language::Ru => {
                    "❌ Не удалось понять. Напишите, например: \"5000 за кофе\".".to_string()
                }
                Language::En => {
                    "❌ Could not understand. Try something like \"5000 for coffee\".".to_string()
                }
            },
            Reply::TryAgain => match language {
                Language::Uz => "⚠️ Xatolik yuz berdi, qayta urinib ko'ring.".to_string(),
                Language::Ru => "⚠️ Произошла ошибка, попробуйте ещё раз.".to_string(),
                Language::En => "⚠️ Something went wrong, please try again.".to_string(),
            },
            Reply::NeedsRegistration => match language {
                Language::Uz => "👋 Xush kelibsiz! Tilni tanlang.".to_string(),
                Language::Ru => "👋 Добро пожаловать! Выберите язык.".to_string(),
                Language::En => "👋 Welcome! Please choose a language.".to_string(),
            },
        }
    }
}

pub struct Assistant<S, B>
where
    S: LedgerStore,
    B: ExtractionBackend,
{
    store: S,
    extractor: TransactionExtractor<B>,
    transcriber: Transcriber,
    normalizer: Normalizer,
    sessions: SessionStore,
}

impl<S, B> Assistant<S, B>
where
    S: LedgerStore,
    B: ExtractionBackend,
{
    pub fn new(store: S, extraction_backend: B, transcriber: Transcriber) -> Self {
        Self {
            store,
            extractor: TransactionExtractor::new(extraction_backend),
            transcriber,
            normalizer: Normalizer::new(CurrencyConverter::new()),
            sessions: SessionStore::new(),
        }
    }

    //
    // ================= Utterance Entry Points =================
    //

    /// Process one text message from a user.
    pub async fn handle_text(&self, telegram_id: i64, text: &str) -> Reply {
        let user = match self.load_user(telegram_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Reply::NeedsRegistration,
            Err(reply) => return reply,
        };

        self.handle_utterance(&user, text).await
    }

    /// Process one voice message. The transport owns the audio file
    /// lifecycle; only the bytes arrive here.
    pub async fn handle_voice(&self, telegram_id: i64, audio: &[u8]) -> Reply {
        let user = match self.load_user(telegram_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Reply::NeedsRegistration,
            Err(reply) => return reply,
        };

        let text = match self.transcriber.transcribe(audio, user.language).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed: {}", e);
                return Reply::ParseError;
            }
        };

        info!(telegram_id, "Voice message transcribed");
        self.handle_utterance(&user, &text).await
    }

    async fn handle_utterance(&self, user: &UserProfile, text: &str) -> Reply {
        // Consumed atomically; a second message from the same user starts
        // from a clean slate.
        let pending = self.sessions.take(user.telegram_id).await;

        match pending {
            Some(PendingAction::AddLoan) => self.add_loan_from_text(user, text).await,
            // AddExpense/AddIncome only prompt the user in the transport;
            // the extraction itself decides the transaction type.
            _ => self.add_transactions_from_text(user, text).await,
        }
    }

    async fn add_transactions_from_text(&self, user: &UserProfile, text: &str) -> Reply {
        let extraction = self
            .extractor
            .extract(text, user.language, &user.currency)
            .await;

        let today = Utc::now().date_naive();
        let batch = match self
            .normalizer
            .normalize(extraction, &user.currency, text, today)
        {
            Ok(batch) => batch,
            Err(e) => {
                info!("Normalization rejected utterance: {}", e);
                return Reply::ParseError;
            }
        };

        match self.persist_batch(user, batch).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to persist transactions: {}", e);
                Reply::TryAgain
            }
        }
    }

    async fn persist_batch(&self, user: &UserProfile, batch: NormalizedBatch) -> crate::Result<Reply> {
        let total = batch.total();
        let multiple = batch.multiple;

        let mut stored = Vec::with_capacity(batch.records.len());
        for record in batch.records {
            stored.push(self.store.add_transaction(user.id, record).await?);
        }

        if multiple {
            Ok(Reply::BatchAdded {
                transactions: stored,
                total,
            })
        } else {
            let transaction = stored
                .into_iter()
                .next()
                .ok_or_else(|| AssistantError::Validation("empty batch".to_string()))?;
            Ok(Reply::TransactionAdded(transaction))
        }
    }

    async fn add_loan_from_text(&self, user: &UserProfile, text: &str) -> Reply {
        let extraction = self
            .extractor
            .extract(text, user.language, &user.currency)
            .await;

        let today = Utc::now().date_naive();
        let batch = match self
            .normalizer
            .normalize(extraction, &user.currency, text, today)
        {
            Ok(batch) => batch,
            Err(e) => {
                info!("Loan utterance rejected: {}", e);
                // Pending state survives so the user can simply retry
                self.sessions.set(user.telegram_id, PendingAction::AddLoan).await;
                return Reply::ParseError;
            }
        };

        // A loan utterance describes one loan; the first valid record wins.
        let record = &batch.records[0];
        let person_name = record
            .description
            .split_whitespace()
            .next()
            .unwrap_or("Unknown")
            .to_string();

        let loan = LoanRecord {
            person_name,
            amount: record.amount,
            currency: record.currency.clone(),
            original_amount: record.original_amount,
            original_currency: record.original_currency.clone(),
            given_date: today,
            return_date: None,
            status: LoanStatus::Pending,
        };

        match self.store.add_loan(user.id, loan).await {
            Ok(stored) => Reply::LoanAdded(stored),
            Err(e) => {
                error!("Failed to persist loan: {}", e);
                Reply::TryAgain
            }
        }
    }

    //
    // ================= Transport Wrappers =================
    //

    /// Button press: remember what the next message from this user means.
    pub async fn request_action(&self, telegram_id: i64, action: PendingAction) {
        self.sessions.set(telegram_id, action).await;
    }

    pub async fn register_user(
        &self,
        telegram_id: i64,
        name: &str,
        language: Language,
        currency: &str,
    ) -> crate::Result<UserProfile> {
        self.store
            .create_user(telegram_id, name, language, currency)
            .await
    }

    pub async fn set_language(&self, telegram_id: i64, language: Language) -> crate::Result<()> {
        self.store.update_user_language(telegram_id, language).await
    }

    pub async fn set_currency(&self, telegram_id: i64, currency: &str) -> crate::Result<()> {
        self.store.update_user_currency(telegram_id, currency).await
    }

    pub async fn user(&self, telegram_id: i64) -> crate::Result<Option<UserProfile>> {
        self.store.get_user(telegram_id).await
    }

    pub async fn history(
        &self,
        telegram_id: i64,
        limit: usize,
    ) -> crate::Result<Vec<StoredTransaction>> {
        let user = self.require_user(telegram_id).await?;
        self.store.get_transactions(user.id, limit).await
    }

    pub async fn monthly_report(
        &self,
        telegram_id: i64,
        year: i32,
        month: u32,
    ) -> crate::Result<MonthlySummary> {
        let user = self.require_user(telegram_id).await?;
        self.store.get_monthly_summary(user.id, year, month).await
    }

    pub async fn loans(
        &self,
        telegram_id: i64,
        status: Option<LoanStatus>,
    ) -> crate::Result<Vec<StoredLoan>> {
        let user = self.require_user(telegram_id).await?;
        self.store.get_loans(user.id, status).await
    }

    /// Owner-checked hard delete.
    pub async fn delete_transaction(
        &self,
        telegram_id: i64,
        transaction_id: i64,
    ) -> crate::Result<bool> {
        let user = self.require_user(telegram_id).await?;
        self.store.delete_transaction(transaction_id, user.id).await
    }

    pub async fn mark_loan_paid(&self, loan_id: i64) -> crate::Result<()> {
        self.store.mark_loan_paid(loan_id).await
    }

    //
    // ================= Internals =================
    //

    async fn load_user(&self, telegram_id: i64) -> std::result::Result<Option<UserProfile>, Reply> {
        match self.store.get_user(telegram_id).await {
            Ok(user) => Ok(user),
            Err(e) => {
                error!("Failed to load user {}: {}", telegram_id, e);
                Err(Reply::TryAgain)
            }
        }
    }

    async fn require_user(&self, telegram_id: i64) -> crate::Result<UserProfile> {
        self.store
            .get_user(telegram_id)
            .await?
            .ok_or_else(|| AssistantError::Validation(format!("unknown user {}", telegram_id)))
    }
}

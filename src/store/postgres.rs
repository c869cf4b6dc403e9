//! Postgres-backed ledger store
//!
//! Schema is created lazily on first use, guarded by a OnceCell so
//! concurrent callers initialize it exactly once.

use crate::error::AssistantError;
use crate::models::{
    Language, LoanRecord, LoanStatus, MonthlySummary, StoredLoan, StoredTransaction,
    TransactionRecord, TransactionType, UserProfile,
};
use crate::store::{month_window, LedgerStore};
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct PostgresLedgerStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

fn store_err(context: &str, e: sqlx::Error) -> AssistantError {
    AssistantError::Store(format!("{}: {}", context, e))
}

impl PostgresLedgerStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| store_err("failed to connect to database", e))?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS users (
                      id BIGSERIAL PRIMARY KEY,
                      telegram_id BIGINT NOT NULL UNIQUE,
                      name TEXT NOT NULL,
                      language TEXT NOT NULL DEFAULT 'uz',
                      currency TEXT NOT NULL DEFAULT 'UZS',
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS transactions (
                      id BIGSERIAL PRIMARY KEY,
                      user_id BIGINT NOT NULL,
                      amount DOUBLE PRECISION NOT NULL,
                      type TEXT NOT NULL,
                      category TEXT NOT NULL,
                      description TEXT NOT NULL,
                      date DATE NOT NULL,
                      currency TEXT NOT NULL,
                      original_amount DOUBLE PRECISION,
                      original_currency TEXT
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_transactions_user_date
                    ON transactions (user_id, date DESC, id DESC);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS loans (
                      id BIGSERIAL PRIMARY KEY,
                      user_id BIGINT NOT NULL,
                      person_name TEXT NOT NULL,
                      amount DOUBLE PRECISION NOT NULL,
                      currency TEXT NOT NULL,
                      original_amount DOUBLE PRECISION,
                      original_currency TEXT,
                      given_date DATE NOT NULL,
                      return_date DATE,
                      status TEXT NOT NULL DEFAULT 'pending'
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| AssistantError::Store(format!("failed to initialize schema: {}", e)))?;

        Ok(())
    }

    fn user_from_row(row: &sqlx::postgres::PgRow) -> UserProfile {
        let language: String = row.get("language");
        UserProfile {
            id: row.get("id"),
            telegram_id: row.get("telegram_id"),
            name: row.get("name"),
            language: Language::from_code(&language),
            currency: row.get("currency"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        }
    }

    fn transaction_from_row(row: &sqlx::postgres::PgRow) -> Result<StoredTransaction> {
        let kind: String = row.get("type");
        let kind = TransactionType::parse(&kind)
            .ok_or_else(|| AssistantError::Store(format!("corrupt transaction type: {}", kind)))?;

        Ok(StoredTransaction {
            id: row.get("id"),
            user_id: row.get("user_id"),
            record: TransactionRecord {
                amount: row.get("amount"),
                kind,
                category: row.get("category"),
                description: row.get("description"),
                date: row.get::<NaiveDate, _>("date"),
                currency: row.get("currency"),
                original_amount: row.get("original_amount"),
                original_currency: row.get("original_currency"),
            },
        })
    }

    fn loan_from_row(row: &sqlx::postgres::PgRow) -> StoredLoan {
        let status: String = row.get("status");
        StoredLoan {
            id: row.get("id"),
            user_id: row.get("user_id"),
            loan: LoanRecord {
                person_name: row.get("person_name"),
                amount: row.get("amount"),
                currency: row.get("currency"),
                original_amount: row.get("original_amount"),
                original_currency: row.get("original_currency"),
                given_date: row.get::<NaiveDate, _>("given_date"),
                return_date: row.get::<Option<NaiveDate>, _>("return_date"),
                status: if status == "paid" {
                    LoanStatus::Paid
                } else {
                    LoanStatus::Pending
                },
            },
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for PostgresLedgerStore {

    async fn get_user(&self, telegram_id: i64) -> Result<Option<UserProfile>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("failed to load user", e))?;

        Ok(row.as_ref().map(Self::user_from_row))
    }

    async fn create_user(
        &self,
        telegram_id: i64,
        name: &str,
        language: Language,
        currency: &str,
    ) -> Result<UserProfile> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (telegram_id, name, language, currency)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(telegram_id)
        .bind(name)
        .bind(language.code())
        .bind(currency.to_uppercase())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_err("failed to create user", e))?;

        Ok(Self::user_from_row(&row))
    }

    async fn update_user_language(&self, telegram_id: i64, language: Language) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("UPDATE users SET language = $1 WHERE telegram_id = $2")
            .bind(language.code())
            .bind(telegram_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("failed to update language", e))?;
        Ok(())
    }

    async fn update_user_currency(&self, telegram_id: i64, currency: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("UPDATE users SET currency = $1 WHERE telegram_id = $2")
            .bind(currency.to_uppercase())
            .bind(telegram_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("failed to update currency", e))?;
        Ok(())
    }

    async fn add_transaction(
        &self,
        user_id: i64,
        record: TransactionRecord,
    ) -> Result<StoredTransaction> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions
              (user_id, amount, type, category, description, date, currency,
               original_amount, original_currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(record.amount)
        .bind(record.kind.to_string())
        .bind(&record.category)
        .bind(&record.description)
        .bind(record.date)
        .bind(&record.currency)
        .bind(record.original_amount)
        .bind(&record.original_currency)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_err("failed to add transaction", e))?;

        Self::transaction_from_row(&row)
    }

    async fn get_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<StoredTransaction>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY date DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err("failed to list transactions", e))?;

        rows.iter().map(Self::transaction_from_row).collect()
    }

    async fn get_transaction(&self, id: i64) -> Result<Option<StoredTransaction>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("failed to load transaction", e))?;

        row.as_ref().map(Self::transaction_from_row).transpose()
    }

    async fn delete_transaction(&self, id: i64, user_id: i64) -> Result<bool> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("failed to delete transaction", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_monthly_summary(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary> {
        self.ensure_schema().await?;

        let (start, end) = month_window(year, month);

        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1 AND date >= $2 AND date < $3
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err("failed to load monthly summary", e))?;

        let transactions: Vec<StoredTransaction> = rows
            .iter()
            .map(Self::transaction_from_row)
            .collect::<Result<_>>()?;

        let income: f64 = transactions
            .iter()
            .filter(|t| t.record.kind == TransactionType::Income)
            .map(|t| t.record.amount)
            .sum();
        let expense: f64 = transactions
            .iter()
            .filter(|t| t.record.kind == TransactionType::Expense)
            .map(|t| t.record.amount)
            .sum();

        Ok(MonthlySummary {
            income,
            expense,
            balance: income - expense,
            transactions,
        })
    }

    async fn add_loan(&self, user_id: i64, loan: LoanRecord) -> Result<StoredLoan> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO loans
              (user_id, person_name, amount, currency, original_amount,
               original_currency, given_date, return_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&loan.person_name)
        .bind(loan.amount)
        .bind(&loan.currency)
        .bind(loan.original_amount)
        .bind(&loan.original_currency)
        .bind(loan.given_date)
        .bind(loan.return_date)
        .bind(loan.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_err("failed to add loan", e))?;

        Ok(Self::loan_from_row(&row))
    }

    async fn get_loans(&self, user_id: i64, status: Option<LoanStatus>) -> Result<Vec<StoredLoan>> {
        self.ensure_schema().await?;

        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT * FROM loans
                    WHERE user_id = $1 AND status = $2
                    ORDER BY given_date DESC
                    "#,
                )
                .bind(user_id)
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM loans
                    WHERE user_id = $1
                    ORDER BY given_date DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| store_err("failed to list loans", e))?;

        Ok(rows.iter().map(Self::loan_from_row).collect())
    }

    async fn mark_loan_paid(&self, loan_id: i64) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("UPDATE loans SET status = 'paid' WHERE id = $1")
            .bind(loan_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("failed to mark loan paid", e))?;
        Ok(())
    }
}

//! Ledger persistence layer
//!
//! One trait, two backends: an in-memory store for development and tests,
//! and a Postgres store for production (see `postgres.rs`).

pub mod postgres;

use crate::models::{
    Language, LoanRecord, LoanStatus, MonthlySummary, StoredLoan, StoredTransaction,
    TransactionRecord, TransactionType, UserProfile,
};
use crate::Result;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use postgres::PostgresLedgerStore;

/// Trait for durable user/transaction/loan storage
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(&self, telegram_id: i64) -> Result<Option<UserProfile>>;
    async fn create_user(
        &self,
        telegram_id: i64,
        name: &str,
        language: Language,
        currency: &str,
    ) -> Result<UserProfile>;
    async fn update_user_language(&self, telegram_id: i64, language: Language) -> Result<()>;
    async fn update_user_currency(&self, telegram_id: i64, currency: &str) -> Result<()>;

    async fn add_transaction(
        &self,
        user_id: i64,
        record: TransactionRecord,
    ) -> Result<StoredTransaction>;
    async fn get_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<StoredTransaction>>;
    async fn get_transaction(&self, id: i64) -> Result<Option<StoredTransaction>>;
    async fn delete_transaction(&self, id: i64, user_id: i64) -> Result<bool>;
    async fn get_monthly_summary(&self, user_id: i64, year: i32, month: u32)
        -> Result<MonthlySummary>;

    async fn add_loan(&self, user_id: i64, loan: LoanRecord) -> Result<StoredLoan>;
    async fn get_loans(&self, user_id: i64, status: Option<LoanStatus>) -> Result<Vec<StoredLoan>>;
    async fn mark_loan_paid(&self, loan_id: i64) -> Result<()>;
}

/// First day of the month after (year, month); the summary window is
/// [first of month, first of next month).
pub(crate) fn month_window(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).expect("valid date"));
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid date")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid date"))
    };
    (start, end)
}

/// In-memory ledger store for development and tests
pub struct InMemoryLedgerStore {
    users: Arc<RwLock<HashMap<i64, UserProfile>>>, // keyed by telegram_id
    transactions: Arc<RwLock<Vec<StoredTransaction>>>,
    loans: Arc<RwLock<Vec<StoredLoan>>>,
    next_id: Arc<RwLock<i64>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(Vec::new())),
            loans: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(1)),
        }
    }

    async fn allocate_id(&self) -> i64 {
        let mut next = self.next_id.write().await;
        let id = *next;
        *next += 1;
        id
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {

    async fn get_user(&self, telegram_id: i64) -> Result<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(&telegram_id).cloned())
    }

    async fn create_user(
        &self,
        telegram_id: i64,
        name: &str,
        language: Language,
        currency: &str,
    ) -> Result<UserProfile> {
        let id = self.allocate_id().await;
        let user = UserProfile {
            id,
            telegram_id,
            name: name.to_string(),
            language,
            currency: currency.to_uppercase(),
            created_at: Utc::now(),
        };

        let mut users = self.users.write().await;
        users.insert(telegram_id, user.clone());
        Ok(user)
    }

    async fn update_user_language(&self, telegram_id: i64, language: Language) -> Result<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&telegram_id) {
            user.language = language;
        }
        Ok(())
    }

    async fn update_user_currency(&self, telegram_id: i64, currency: &str) -> Result<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&telegram_id) {
            user.currency = currency.to_uppercase();
        }
        Ok(())
    }

    async fn add_transaction(
        &self,
        user_id: i64,
        record: TransactionRecord,
    ) -> Result<StoredTransaction> {
        let id = self.allocate_id().await;
        let stored = StoredTransaction {
            id,
            user_id,
            record,
        };

        let mut transactions = self.transactions.write().await;
        transactions.push(stored.clone());
        Ok(stored)
    }

    async fn get_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<StoredTransaction>> {
        let transactions = self.transactions.read().await;

        let mut mine: Vec<StoredTransaction> = transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();

        // date desc, then id desc
        mine.sort_by(|a, b| {
            b.record
                .date
                .cmp(&a.record.date)
                .then_with(|| b.id.cmp(&a.id))
        });
        mine.truncate(limit);
        Ok(mine)
    }

    async fn get_transaction(&self, id: i64) -> Result<Option<StoredTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn delete_transaction(&self, id: i64, user_id: i64) -> Result<bool> {
        let mut transactions = self.transactions.write().await;
        let before = transactions.len();
        transactions.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(transactions.len() < before)
    }

    async fn get_monthly_summary(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary> {
        let (start, end) = month_window(year, month);
        let transactions = self.transactions.read().await;

        let in_month: Vec<StoredTransaction> = transactions
            .iter()
            .filter(|t| t.user_id == user_id && t.record.date >= start && t.record.date < end)
            .cloned()
            .collect();

        let income: f64 = in_month
            .iter()
            .filter(|t| t.record.kind == TransactionType::Income)
            .map(|t| t.record.amount)
            .sum();
        let expense: f64 = in_month
            .iter()
            .filter(|t| t.record.kind == TransactionType::Expense)
            .map(|t| t.record.amount)
            .sum();

        Ok(MonthlySummary {
            income,
            expense,
            balance: income - expense,
            transactions: in_month,
        })
    }

    async fn add_loan(&self, user_id: i64, loan: LoanRecord) -> Result<StoredLoan> {
        let id = self.allocate_id().await;
        let stored = StoredLoan { id, user_id, loan };

        let mut loans = self.loans.write().await;
        loans.push(stored.clone());
        Ok(stored)
    }

    async fn get_loans(&self, user_id: i64, status: Option<LoanStatus>) -> Result<Vec<StoredLoan>> {
        let loans = self.loans.read().await;

        let mut mine: Vec<StoredLoan> = loans
            .iter()
            .filter(|l| l.user_id == user_id && status.map_or(true, |s| l.loan.status == s))
            .cloned()
            .collect();

        mine.sort_by(|a, b| b.loan.given_date.cmp(&a.loan.given_date));
        Ok(mine)
    }

    async fn mark_loan_paid(&self, loan_id: i64) -> Result<()> {
        let mut loans = self.loans.write().await;
        if let Some(loan) = loans.iter_mut().find(|l| l.id == loan_id) {
            loan.loan.status = LoanStatus::Paid;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: f64, kind: TransactionType, date: NaiveDate) -> TransactionRecord {
        TransactionRecord {
            amount,
            kind,
            category: "other".to_string(),
            description: "test".to_string(),
            date,
            currency: "UZS".to_string(),
            original_amount: None,
            original_currency: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let store = InMemoryLedgerStore::new();
        assert!(store.get_user(42).await.unwrap().is_none());

        let user = store
            .create_user(42, "Aziz", Language::Uz, "uzs")
            .await
            .unwrap();
        assert_eq!(user.currency, "UZS");

        store.update_user_language(42, Language::Ru).await.unwrap();
        store.update_user_currency(42, "usd").await.unwrap();
        let user = store.get_user(42).await.unwrap().unwrap();
        assert_eq!(user.language, Language::Ru);
        assert_eq!(user.currency, "USD");
    }

    #[tokio::test]
    async fn test_transactions_ordered_date_then_id_desc() {
        let store = InMemoryLedgerStore::new();
        let a = store
            .add_transaction(1, record(100.0, TransactionType::Expense, date(2025, 6, 1)))
            .await
            .unwrap();
        let b = store
            .add_transaction(1, record(200.0, TransactionType::Expense, date(2025, 6, 2)))
            .await
            .unwrap();
        let c = store
            .add_transaction(1, record(300.0, TransactionType::Expense, date(2025, 6, 2)))
            .await
            .unwrap();

        let listed = store.get_transactions(1, 10).await.unwrap();
        assert_eq!(
            listed.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![c.id, b.id, a.id]
        );
    }

    #[tokio::test]
    async fn test_delete_transaction_is_owner_checked() {
        let store = InMemoryLedgerStore::new();
        let stored = store
            .add_transaction(1, record(100.0, TransactionType::Expense, date(2025, 6, 1)))
            .await
            .unwrap();

        assert!(!store.delete_transaction(stored.id, 999).await.unwrap());
        assert!(store.get_transaction(stored.id).await.unwrap().is_some());

        assert!(store.delete_transaction(stored.id, 1).await.unwrap());
        assert!(store.get_transaction(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_monthly_summary_window() {
        let store = InMemoryLedgerStore::new();
        store
            .add_transaction(1, record(1000.0, TransactionType::Income, date(2025, 6, 5)))
            .await
            .unwrap();
        store
            .add_transaction(1, record(300.0, TransactionType::Expense, date(2025, 6, 20)))
            .await
            .unwrap();
        // Outside the window
        store
            .add_transaction(1, record(999.0, TransactionType::Expense, date(2025, 7, 1)))
            .await
            .unwrap();

        let summary = store.get_monthly_summary(1, 2025, 6).await.unwrap();
        assert_eq!(summary.income, 1000.0);
        assert_eq!(summary.expense, 300.0);
        assert_eq!(summary.balance, 700.0);
        assert_eq!(summary.transactions.len(), 2);
    }

    #[tokio::test]
    async fn test_december_window_rolls_into_next_year() {
        let (start, end) = month_window(2025, 12);
        assert_eq!(start, date(2025, 12, 1));
        assert_eq!(end, date(2026, 1, 1));
    }

    #[tokio::test]
    async fn test_loan_lifecycle() {
        let store = InMemoryLedgerStore::new();
        let loan = LoanRecord {
            person_name: "Bobur".to_string(),
            amount: 50000.0,
            currency: "UZS".to_string(),
            original_amount: None,
            original_currency: None,
            given_date: date(2025, 6, 1),
            return_date: None,
            status: LoanStatus::Pending,
        };
        let stored = store.add_loan(1, loan).await.unwrap();

        let pending = store.get_loans(1, Some(LoanStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);

        store.mark_loan_paid(stored.id).await.unwrap();
        let pending = store.get_loans(1, Some(LoanStatus::Pending)).await.unwrap();
        assert!(pending.is_empty());
        let all = store.get_loans(1, None).await.unwrap();
        assert_eq!(all[0].loan.status, LoanStatus::Paid);
    }
}

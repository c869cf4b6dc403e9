//! Per-user transient conversation state
//!
//! The original design kept a process-wide unsynchronized map of pending
//! actions; here the state is keyed by user identity and every
//! read-modify-write happens under a single lock acquisition, so two
//! near-simultaneous messages from the same user cannot interleave.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// What the bot is waiting for from a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    AddExpense,
    AddIncome,
    AddLoan,
}

#[derive(Default)]
pub struct SessionStore {
    pending: RwLock<HashMap<i64, PendingAction>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, telegram_id: i64, action: PendingAction) {
        let mut pending = self.pending.write().await;
        pending.insert(telegram_id, action);
    }

    /// Read without consuming.
    pub async fn peek(&self, telegram_id: i64) -> Option<PendingAction> {
        let pending = self.pending.read().await;
        pending.get(&telegram_id).copied()
    }

    /// Consume the pending action atomically: the next message from the
    /// same user sees no stale state.
    pub async fn take(&self, telegram_id: i64) -> Option<PendingAction> {
        let mut pending = self.pending.write().await;
        pending.remove(&telegram_id)
    }

    pub async fn clear(&self, telegram_id: i64) {
        let mut pending = self.pending.write().await;
        pending.remove(&telegram_id);
    }
}

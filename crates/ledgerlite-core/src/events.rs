use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntrySource, JournalEntry};

/// Published on the event bus after a journal entry has been committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    pub company_id: Uuid,
    pub entry_id: Uuid,
    pub reference: String,
    pub source: EntrySource,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn posted(entry: &JournalEntry) -> Self {
        Self {
            company_id: entry.company_id,
            entry_id: entry.id,
            reference: entry.reference.clone(),
            source: entry.source,
            occurred_at: entry.created_at,
        }
    }
}

/// Bus channel carrying [`LedgerEvent`]s.
pub const LEDGER_POSTED_CHANNEL: &str = "ledger.posted";

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &LedgerEvent) -> anyhow::Result<()>;
}

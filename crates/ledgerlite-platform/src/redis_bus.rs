use anyhow::Result;
use async_trait::async_trait;
use ledgerlite_core::{EventPublisher, LEDGER_POSTED_CHANNEL, LedgerEvent};
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::debug;

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisBus {
    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        self.publish_json(LEDGER_POSTED_CHANNEL, event).await
    }
}

/// Stand-in for the bus when no Redis is configured: events only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &LedgerEvent) -> Result<()> {
        debug!(
            channel = LEDGER_POSTED_CHANNEL,
            company_id = %event.company_id,
            reference = %event.reference,
            source = event.source.as_str(),
            "ledger event"
        );
        Ok(())
    }
}

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result as AnyResult;
use ledgerlite_core::{EventPublisher, LedgerStore};
use ledgerlite_gateway::{AppState, AuthSettings, app, spawn_overdue_sweeper};
use ledgerlite_platform::{LogPublisher, RedisBus, ServiceConfig, connect_database};
use ledgerlite_store::{InMemoryStore, PgLedgerStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ledgerlite_gateway=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;

    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(database_url) => {
            let store = PgLedgerStore::new(connect_database(database_url).await?);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL is not set, ledger data lives in memory and is lost on exit");
            Arc::new(InMemoryStore::new())
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.redis_url {
        Some(redis_url) => Arc::new(RedisBus::connect(redis_url)?),
        None => {
            info!("REDIS_URL is not set, ledger events are only logged");
            Arc::new(LogPublisher)
        }
    };
    if config.otp_debug_echo {
        warn!("OTP_DEBUG_ECHO is on, sign-in codes are returned in responses");
    }

    let state = AppState::new(store, events, AuthSettings::from_config(&config));
    spawn_overdue_sweeper(
        state.ledger.clone(),
        Duration::from_secs(config.overdue_sweep_seconds),
    );

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

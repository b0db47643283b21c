use std::sync::Arc;

use ledgerlite_core::{EventPublisher, LedgerStore};
use ledgerlite_finance::LedgerService;
use ledgerlite_platform::ServiceConfig;

pub const SESSION_COOKIE: &str = "ledgerlite_session";

#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub session_ttl_days: i64,
    pub otp_ttl_seconds: i64,
    pub otp_debug_echo: bool,
    pub cookie_secure: bool,
}

impl AuthSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            session_ttl_days: config.session_ttl_days,
            otp_ttl_seconds: config.otp_ttl_seconds,
            otp_debug_echo: config.otp_debug_echo,
            cookie_secure: config.cookie_secure,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub ledger: LedgerService,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        events: Arc<dyn EventPublisher>,
        auth: AuthSettings,
    ) -> Self {
        Self {
            ledger: LedgerService::new(store.clone(), events),
            store,
            auth,
        }
    }
}

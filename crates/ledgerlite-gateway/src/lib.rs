pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::Utc;
use ledgerlite_finance::LedgerService;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use error::{ApiError, ApiResult};
pub use state::{AppState, AuthSettings, SESSION_COOKIE};

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/otp/request", post(auth::request_otp))
        .route("/auth/otp/verify", post(auth::verify_otp))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/companies", post(handlers::companies::create_company))
        .route("/companies/current", get(handlers::companies::current_company))
        .route(
            "/customers",
            get(handlers::companies::list_customers).post(handlers::companies::create_customer),
        )
        .route("/accounts", get(handlers::companies::list_accounts))
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/invoices/{invoice_id}",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/personal/expense",
            get(handlers::transactions::list_personal_expenses)
                .post(handlers::transactions::create_personal_expense),
        )
        .route("/sync", post(handlers::transactions::sync))
        .route("/analytics/revenue", get(handlers::reports::revenue))
        .route(
            "/analytics/revenue/cleanup",
            get(handlers::reports::cleanup_report).post(handlers::reports::run_cleanup),
        )
        .route("/journal", get(handlers::reports::journal))
        .route("/reports/trial-balance", get(handlers::reports::trial_balance))
        .route("/dashboard", get(handlers::reports::dashboard));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Moves `sent` invoices past their due date to `overdue`, once per `period`.
pub fn spawn_overdue_sweeper(ledger: LedgerService, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match ledger.mark_overdue(Utc::now().date_naive()).await {
                Ok(0) => {}
                Ok(count) => info!(count, "invoices marked overdue"),
                Err(err) => error!("overdue sweep failed: {err:#}"),
            }
        }
    })
}

use axum::{Json, extract::State};
use ledgerlite_core::DateRange;
use ledgerlite_finance::{CleanupRequest, month_key, resolve_range};
use ledgerlite_platform::{CleanupActionRequest, CleanupQuery, PeriodQuery, TrialBalanceQuery};
use serde_json::{Value, json};

use super::today;
use crate::{
    auth::CurrentCompany,
    error::{ApiJson, ApiQuery, ApiResult},
    state::AppState,
};

pub async fn revenue(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let range = resolve_range(query.period.as_deref(), query.from, query.to, today())?;
    let summary = state.ledger.revenue_analytics(company.id, range).await?;
    Ok(Json(json!({ "success": true, "currency": company.currency, "analytics": summary })))
}

pub async fn cleanup_report(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<CleanupQuery>,
) -> ApiResult<Json<Value>> {
    let month = query
        .month
        .filter(|month| !month.trim().is_empty())
        .unwrap_or_else(|| month_key(today()));
    let report = state.ledger.cleanup_report(company.id, &month).await?;
    Ok(Json(json!({
        "success": true,
        "clean": report.is_clean(),
        "report": report,
    })))
}

pub async fn run_cleanup(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<CleanupActionRequest>,
) -> ApiResult<Json<Value>> {
    let request = CleanupRequest {
        action: payload.action.parse()?,
        confirm: payload.confirm,
        month: payload.month.filter(|month| !month.trim().is_empty()),
    };
    let outcome = state.ledger.run_cleanup(&company, request, today()).await?;
    Ok(Json(json!({ "success": true, "outcome": outcome })))
}

pub async fn journal(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let range = if query.period.is_some() || query.from.is_some() || query.to.is_some() {
        resolve_range(query.period.as_deref(), query.from, query.to, today())?
    } else {
        DateRange::all()
    };
    let entries = state.ledger.journal(company.id, &range).await?;
    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "entries": entries,
    })))
}

pub async fn trial_balance(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<TrialBalanceQuery>,
) -> ApiResult<Json<Value>> {
    let report = state.ledger.trial_balance(company.id, query.as_of).await?;
    Ok(Json(json!({ "success": true, "trial_balance": report })))
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
) -> ApiResult<Json<Value>> {
    let dashboard = state.ledger.dashboard(company.id, today()).await?;
    Ok(Json(json!({
        "success": true,
        "company": company.name,
        "currency": company.currency,
        "dashboard": dashboard,
    })))
}

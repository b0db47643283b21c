use axum::{Json, extract::State, http::StatusCode};
use ledgerlite_core::LedgerError;
use ledgerlite_finance::{
    NewPersonalExpense, NewTransaction, SyncCommand, SyncResult, SyncStatus, TransactionKind,
    resolve_range,
};
use ledgerlite_platform::{
    CreateTransactionRequest, PeriodQuery, PersonalExpenseRequest, SyncOperationRequest,
    SyncRequest,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{payment_method, today};
use crate::{
    auth::CurrentCompany,
    error::{ApiJson, ApiQuery, ApiResult},
    state::AppState,
};

/// Kinds a client may record. `other` only comes out of inference.
fn recordable_kind(raw: &str) -> Result<TransactionKind, LedgerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "income" | "sale" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        other => Err(LedgerError::validation(format!(
            "type must be income or expense (got {other})"
        ))),
    }
}

fn kind_filter(raw: Option<&str>) -> Result<Option<TransactionKind>, LedgerError> {
    match raw.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "all") => Ok(None),
        Some("other") => Ok(Some(TransactionKind::Other)),
        Some(other) => recordable_kind(other).map(Some),
    }
}

fn new_transaction(payload: CreateTransactionRequest) -> Result<NewTransaction, LedgerError> {
    Ok(NewTransaction {
        kind: recordable_kind(&payload.kind)?,
        amount: payload.amount,
        description: payload.description,
        date: payload.date,
        payment_method: payment_method(payload.payment_method.as_deref())?,
        category: payload.category,
        client_id: payload.client_id,
    })
}

fn new_personal_expense(payload: PersonalExpenseRequest) -> Result<NewPersonalExpense, LedgerError> {
    Ok(NewPersonalExpense {
        amount: payload.amount,
        description: payload.description,
        date: payload.date,
        payment_method: payment_method(payload.payment_method.as_deref())?,
        category: payload.category,
        client_id: payload.client_id,
    })
}

fn sync_command(operation: SyncOperationRequest) -> Result<SyncCommand, String> {
    match operation.kind.trim() {
        "transaction" => serde_json::from_value::<CreateTransactionRequest>(operation.payload)
            .map_err(|err| format!("invalid transaction payload: {err}"))
            .and_then(|payload| new_transaction(payload).map_err(|err| err.to_string()))
            .map(SyncCommand::Transaction),
        "personal_expense" => serde_json::from_value::<PersonalExpenseRequest>(operation.payload)
            .map_err(|err| format!("invalid personal expense payload: {err}"))
            .and_then(|payload| new_personal_expense(payload).map_err(|err| err.to_string()))
            .map(SyncCommand::PersonalExpense),
        other => Err(format!(
            "kind must be transaction or personal_expense (got {other})"
        )),
    }
}

/// 201 for a new entry, 200 when `client_id` was already applied.
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let recorded = state
        .ledger
        .record_transaction(company.id, new_transaction(payload)?)
        .await?;

    let status = if recorded.duplicate { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(json!({
            "success": true,
            "transaction": recorded.transaction,
            "duplicate": recorded.duplicate,
        })),
    ))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let range = resolve_range(query.period.as_deref(), query.from, query.to, today())?;
    let kind = kind_filter(query.kind.as_deref())?;
    let transactions = state
        .ledger
        .list_transactions(company.id, &range, kind)
        .await?;

    Ok(Json(json!({
        "success": true,
        "from": range.from,
        "to": range.to,
        "count": transactions.len(),
        "transactions": transactions,
    })))
}

pub async fn create_personal_expense(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<PersonalExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let recorded = state
        .ledger
        .record_personal_expense(company.id, new_personal_expense(payload)?)
        .await?;

    let status = if recorded.duplicate { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(json!({
            "success": true,
            "expense": recorded.transaction,
            "duplicate": recorded.duplicate,
        })),
    ))
}

pub async fn list_personal_expenses(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let range = resolve_range(query.period.as_deref(), query.from, query.to, today())?;
    let expenses = state
        .ledger
        .list_personal_expenses(company.id, &range)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": expenses.len(),
        "expenses": expenses,
    })))
}

/// Replays an offline queue in order. Malformed operations fail on their own
/// without stopping the rest.
pub async fn sync(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<SyncRequest>,
) -> ApiResult<Json<Value>> {
    let mut results: Vec<SyncResult> = Vec::with_capacity(payload.operations.len());
    for operation in payload.operations {
        let client_id = operation.client_id;
        match sync_command(operation) {
            Ok(command) => {
                results.extend(state.ledger.sync(company.id, vec![(client_id, command)]).await);
            }
            Err(reason) => {
                warn!(%client_id, %reason, "sync operation rejected");
                results.push(SyncResult::failed(client_id, reason));
            }
        }
    }

    let count = |status: SyncStatus| results.iter().filter(|result| result.status == status).count();
    let (applied, duplicate, failed) = (
        count(SyncStatus::Applied),
        count(SyncStatus::Duplicate),
        count(SyncStatus::Failed),
    );
    info!(company_id = %company.id, applied, duplicate, failed, "sync replayed");

    Ok(Json(json!({
        "success": true,
        "applied": applied,
        "duplicate": duplicate,
        "failed": failed,
        "results": results,
    })))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn only_income_and_expense_are_recordable() {
        assert_eq!(recordable_kind("Income").unwrap(), TransactionKind::Income);
        assert_eq!(recordable_kind("expense").unwrap(), TransactionKind::Expense);
        assert!(recordable_kind("other").is_err());
        assert_eq!(kind_filter(Some("all")).unwrap(), None);
        assert_eq!(kind_filter(Some("other")).unwrap(), Some(TransactionKind::Other));
    }

    #[test]
    fn sync_payloads_are_parsed_per_kind() {
        let operation = |kind: &str, payload| SyncOperationRequest {
            client_id: Uuid::new_v4(),
            kind: kind.to_string(),
            payload,
        };

        let transaction = sync_command(operation(
            "transaction",
            json!({"type": "income", "amount": "2500", "description": "Cake"}),
        ));
        assert!(matches!(transaction, Ok(SyncCommand::Transaction(_))));

        let expense = sync_command(operation(
            "personal_expense",
            json!({"amount": "800", "description": "Lunch", "payment_method": "bank"}),
        ));
        assert!(matches!(expense, Ok(SyncCommand::PersonalExpense(_))));

        assert!(sync_command(operation("refund", json!({}))).is_err());
        assert!(sync_command(operation("transaction", json!({"amount": "1"}))).is_err());
    }
}

use axum::{Json, extract::State, http::StatusCode};
use ledgerlite_finance::{NewCompany, NewCustomer};
use ledgerlite_platform::{CreateCompanyRequest, CreateCustomerRequest};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{CurrentCompany, CurrentUser},
    error::{ApiJson, ApiResult},
    state::AppState,
};

pub async fn create_company(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let company = state
        .ledger
        .create_company(
            &user,
            NewCompany {
                name: payload.name,
                invoice_prefix: payload.invoice_prefix,
                currency: payload.currency,
            },
        )
        .await?;
    let accounts = state.ledger.accounts_with_balances(company.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "company": company, "accounts": accounts })),
    ))
}

pub async fn current_company(CurrentCompany(company): CurrentCompany) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "success": true, "company": company })))
}

pub async fn list_customers(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
) -> ApiResult<Json<Value>> {
    let customers = state.ledger.list_customers(company.id).await?;
    Ok(Json(json!({ "success": true, "customers": customers })))
}

/// 201 when a customer was created, 200 when one with that name already existed.
pub async fn create_customer(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<CreateCustomerRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (customer, created) = state
        .ledger
        .create_customer(
            company.id,
            NewCustomer {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
            },
        )
        .await?;
    if created {
        info!(company_id = %company.id, customer_id = %customer.id, "customer created");
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({ "success": true, "customer": customer, "created": created })),
    ))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
) -> ApiResult<Json<Value>> {
    let accounts = state.ledger.accounts_with_balances(company.id).await?;
    Ok(Json(json!({ "success": true, "accounts": accounts })))
}

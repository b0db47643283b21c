use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use ledgerlite_core::{InvoiceFilter, InvoiceStatus};
use ledgerlite_finance::{InvoiceLineInput, NewCustomer, NewInvoice, StatusChange, resolve_range};
use ledgerlite_platform::{CreateInvoiceRequest, ListInvoicesQuery, UpdateInvoiceRequest};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::{payment_method, today};
use crate::{
    auth::CurrentCompany,
    error::{ApiJson, ApiQuery, ApiResult},
    state::AppState,
};

pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiJson(payload): ApiJson<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let status = payload
        .status
        .as_deref()
        .map(str::parse::<InvoiceStatus>)
        .transpose()?;

    let detail = state
        .ledger
        .create_invoice(
            &company,
            NewInvoice {
                customer: NewCustomer {
                    name: payload.customer_name,
                    email: payload.customer_email,
                    phone: payload.customer_phone,
                },
                items: payload
                    .items
                    .into_iter()
                    .map(|item| InvoiceLineInput {
                        description: item.description,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                issue_date: payload.issue_date,
                due_date: payload.due_date,
                vat_rate: payload.vat_rate,
                apply_vat: payload.apply_vat,
                notes: payload.notes,
                status,
            },
        )
        .await?;
    info!(invoice_id = %detail.invoice.id, number = %detail.invoice.number, "invoice created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "invoice": detail.invoice,
            "items": detail.items,
            "customer": detail.customer,
            "journal_entries": detail.entries,
        })),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    ApiQuery(query): ApiQuery<ListInvoicesQuery>,
) -> ApiResult<Json<Value>> {
    let status = query
        .status
        .as_deref()
        .filter(|status| !status.trim().is_empty() && *status != "all")
        .map(str::parse::<InvoiceStatus>)
        .transpose()?;
    let range = if query.period.is_some() || query.from.is_some() || query.to.is_some() {
        Some(resolve_range(query.period.as_deref(), query.from, query.to, today())?)
    } else {
        None
    };

    let invoices = state
        .ledger
        .list_invoices(company.id, &InvoiceFilter { status, range })
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": invoices.len(),
        "invoices": invoices,
    })))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let detail = state.ledger.get_invoice(company.id, invoice_id).await?;
    Ok(Json(json!({
        "success": true,
        "invoice": detail.invoice,
        "items": detail.items,
        "customer": detail.customer,
        "journal_entries": detail.entries,
    })))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    Path(invoice_id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateInvoiceRequest>,
) -> ApiResult<Json<Value>> {
    let change = StatusChange {
        status: payload.status.parse()?,
        payment_method: payment_method(payload.payment_method.as_deref())?,
        paid_on: payload.paid_on,
    };
    let outcome = state
        .ledger
        .update_invoice_status(company.id, invoice_id, change)
        .await?;

    let message = if outcome.already_paid {
        "invoice was already paid"
    } else if outcome.changed {
        "invoice updated"
    } else {
        "invoice unchanged"
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "invoice": outcome.invoice,
        "changed": outcome.changed,
        "already_paid": outcome.already_paid,
        "journal_entry": outcome.entry,
    })))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    CurrentCompany(company): CurrentCompany,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let outcome = state.ledger.delete_invoice(company.id, invoice_id).await?;
    info!(invoice_id = %outcome.invoice_id, number = %outcome.number, "invoice deleted");

    Ok(Json(json!({
        "success": true,
        "deleted": outcome.invoice_id,
        "number": outcome.number,
        "reversal": outcome.reversal,
    })))
}

//! Posting rules: which accounts each business event debits and credits.

use std::{collections::BTreeMap, str::FromStr};

use chrono::NaiveDate;
use ledgerlite_core::{AccountCategory, EntrySource, Invoice, LedgerError, PostedEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::journal::{AccountBook, JournalDraft};

pub const ISSUE_CATEGORIES: [AccountCategory; 3] = [
    AccountCategory::Receivable,
    AccountCategory::DeferredRevenue,
    AccountCategory::VatPayable,
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Bank,
}

impl PaymentMethod {
    pub fn category(&self) -> AccountCategory {
        match self {
            Self::Cash => AccountCategory::Cash,
            Self::Bank => AccountCategory::Bank,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "cash" => Ok(Self::Cash),
            "bank" | "transfer" | "bank_transfer" | "card" | "pos" => Ok(Self::Bank),
            other => Err(LedgerError::validation(format!(
                "payment_method must be cash, bank, transfer or card (got {other})"
            ))),
        }
    }
}

/// What a cash movement recorded outside of invoicing represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CashMovement {
    Sale,
    Expense,
    PersonalExpense,
}

impl CashMovement {
    pub fn source(&self) -> EntrySource {
        match self {
            Self::Sale => EntrySource::Sale,
            Self::Expense => EntrySource::Expense,
            Self::PersonalExpense => EntrySource::PersonalExpense,
        }
    }

    pub fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Sale => "SAL",
            Self::Expense => "EXP",
            Self::PersonalExpense => "PEX",
        }
    }

    /// The account on the other side of the cash/bank leg.
    pub fn counter_category(&self) -> AccountCategory {
        match self {
            Self::Sale => AccountCategory::Sales,
            Self::Expense => AccountCategory::Expense,
            Self::PersonalExpense => AccountCategory::Drawings,
        }
    }
}

/// Issuing an invoice: receivable against deferred revenue and VAT. No
/// revenue is recognized until payment.
pub fn invoice_issued(book: &AccountBook, invoice: &Invoice) -> Result<JournalDraft, LedgerError> {
    let draft = JournalDraft::new(
        invoice.issue_date,
        invoice.number.clone(),
        format!("Invoice {} issued", invoice.number),
        EntrySource::InvoiceIssued,
    )
    .for_document(Some(invoice.id), &invoice.number)
    .debit(
        book.get(AccountCategory::Receivable)?,
        invoice.total,
        "Invoice total",
    )
    .credit(
        book.get(AccountCategory::DeferredRevenue)?,
        invoice.subtotal,
        "Revenue deferred until payment",
    )
    .credit(
        book.get(AccountCategory::VatPayable)?,
        invoice.vat_amount,
        "Output VAT",
    );

    Ok(draft)
}

pub fn payment_categories(method: PaymentMethod) -> [AccountCategory; 4] {
    [
        method.category(),
        AccountCategory::Receivable,
        AccountCategory::DeferredRevenue,
        AccountCategory::Sales,
    ]
}

/// Receiving payment: cash in, receivable settled, deferred revenue released
/// into sales.
pub fn invoice_paid(
    book: &AccountBook,
    invoice: &Invoice,
    method: PaymentMethod,
    paid_on: NaiveDate,
) -> Result<JournalDraft, LedgerError> {
    let draft = JournalDraft::new(
        paid_on,
        format!("PAY-{}", invoice.number),
        format!("Payment received for invoice {}", invoice.number),
        EntrySource::InvoicePaid,
    )
    .for_document(Some(invoice.id), &invoice.number)
    .debit(book.get(method.category())?, invoice.total, "Payment received")
    .credit(
        book.get(AccountCategory::Receivable)?,
        invoice.total,
        "Receivable settled",
    )
    .debit(
        book.get(AccountCategory::DeferredRevenue)?,
        invoice.subtotal,
        "Deferred revenue released",
    )
    .credit(
        book.get(AccountCategory::Sales)?,
        invoice.subtotal,
        "Revenue recognized",
    );

    Ok(draft)
}

/// Net signed movement (debit positive) per account across a set of entries.
pub fn net_by_account(entries: &[PostedEntry]) -> BTreeMap<Uuid, Decimal> {
    let mut net: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for line in entries.iter().flat_map(|posted| posted.lines.iter()) {
        *net.entry(line.account_id).or_default() += line.debit - line.credit;
    }
    net.retain(|_, amount| !amount.is_zero());
    net
}

/// Reverses whatever the given entries still leave on the books for an
/// invoice. Returns `None` when they already net to zero.
pub fn reverse_invoice(
    invoice: &Invoice,
    entries: &[PostedEntry],
    reference_prefix: &str,
    narration: &str,
    date: NaiveDate,
) -> Option<JournalDraft> {
    let net = net_by_account(entries);
    if net.is_empty() {
        return None;
    }

    let draft = net.into_iter().fold(
        JournalDraft::new(
            date,
            format!("{reference_prefix}-{}", invoice.number),
            narration.to_string(),
            EntrySource::InvoiceReversal,
        )
        .for_document(Some(invoice.id), &invoice.number),
        |draft, (account_id, amount)| draft.signed(account_id, -amount, "Reversal"),
    );

    Some(draft)
}

/// A sale, business expense or owner's personal expense settled in cash or
/// through the bank.
#[allow(clippy::too_many_arguments)]
pub fn cash_movement(
    book: &AccountBook,
    movement: CashMovement,
    method: PaymentMethod,
    amount: Decimal,
    date: NaiveDate,
    reference: String,
    narration: String,
    memo: &str,
) -> Result<JournalDraft, LedgerError> {
    let money_account = book.get(method.category())?;
    let counter_account = book.get(movement.counter_category())?;
    let draft = JournalDraft::new(date, reference, narration, movement.source());

    let draft = match movement {
        CashMovement::Sale => draft
            .debit(money_account, amount, memo)
            .credit(counter_account, amount, memo),
        CashMovement::Expense | CashMovement::PersonalExpense => draft
            .debit(counter_account, amount, memo)
            .credit(money_account, amount, memo),
    };

    Ok(draft)
}

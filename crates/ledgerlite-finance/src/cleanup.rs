//! Diagnostics for journal data that drifted away from the invoices it
//! describes, and the repair actions that act on them.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    str::FromStr,
};

use chrono::NaiveDate;
use ledgerlite_core::{
    AccountCategory, DateRange, EntrySource, Invoice, InvoiceStatus, LedgerError, PostedEntry,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    journal::AccountBook,
    posting::net_by_account,
    reports::{month_end, month_key},
};

/// Parses `YYYY-MM` into the inclusive range of that month.
pub fn month_range(month: &str) -> Result<DateRange, LedgerError> {
    let invalid = || LedgerError::validation(format!("month must look like 2025-01 (got {month})"));

    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| invalid())?;
    let last = month_end(first).ok_or_else(invalid)?;
    Ok(DateRange::between(first, last))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupAction {
    RemoveOrphans,
    FixDates,
    Nuclear,
}

impl FromStr for CleanupAction {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remove_orphans" => Ok(Self::RemoveOrphans),
            "fix_dates" => Ok(Self::FixDates),
            "nuclear" => Ok(Self::Nuclear),
            other => Err(LedgerError::validation(format!(
                "action must be remove_orphans, fix_dates or nuclear (got {other})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrphanGroup {
    pub document_number: String,
    pub entry_ids: Vec<Uuid>,
    pub references: Vec<String>,
    /// Sum of the debit-side residue the group leaves on the books.
    pub residual: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateMismatch {
    pub entry_id: Uuid,
    pub reference: String,
    pub invoice_id: Uuid,
    pub entry_date: NaiveDate,
    pub issue_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnbalancedEntry {
    pub entry_id: Uuid,
    pub reference: String,
    pub debits: Decimal,
    pub credits: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub month: String,
    pub entries_examined: usize,
    pub orphaned: Vec<OrphanGroup>,
    pub date_mismatches: Vec<DateMismatch>,
    pub unbalanced: Vec<UnbalancedEntry>,
    /// Sales recognized through invoice payments (net of reversals).
    pub recognized_invoice_revenue: Decimal,
    /// Subtotals of invoices currently paid with a payment date in the month.
    pub paid_invoice_revenue: Decimal,
    pub cash_sales: Decimal,
    pub discrepancy: Decimal,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty()
            && self.date_mismatches.is_empty()
            && self.unbalanced.is_empty()
            && self.discrepancy.is_zero()
    }

    pub fn orphaned_entry_ids(&self) -> Vec<Uuid> {
        self.orphaned
            .iter()
            .flat_map(|group| group.entry_ids.iter().copied())
            .collect()
    }
}

/// Inspects every journal entry of a company for problems touching `month`.
///
/// `entries` and `invoices` must be the company's complete sets: orphan
/// detection nets a document's entries across all dates.
pub fn diagnose(
    month: &str,
    book: &AccountBook,
    entries: &[PostedEntry],
    invoices: &[Invoice],
) -> Result<CleanupReport, LedgerError> {
    let range = month_range(month)?;

    let live_numbers: HashSet<&str> = invoices.iter().map(|invoice| invoice.number.as_str()).collect();
    let by_id: HashMap<Uuid, &Invoice> = invoices.iter().map(|invoice| (invoice.id, invoice)).collect();

    let mut groups: BTreeMap<&str, Vec<&PostedEntry>> = BTreeMap::new();
    for posted in entries {
        if let Some(number) = posted.entry.document_number.as_deref() {
            if !live_numbers.contains(number) {
                groups.entry(number).or_default().push(posted);
            }
        }
    }

    let orphaned: Vec<OrphanGroup> = groups
        .into_iter()
        .filter(|(_, group)| {
            group
                .iter()
                .any(|posted| range.contains(posted.entry.entry_date))
        })
        .filter_map(|(number, group)| {
            let owned: Vec<PostedEntry> = group.iter().map(|posted| (*posted).clone()).collect();
            let net = net_by_account(&owned);
            if net.is_empty() {
                return None;
            }
            Some(OrphanGroup {
                document_number: number.to_string(),
                entry_ids: owned.iter().map(|posted| posted.entry.id).collect(),
                references: owned.iter().map(|posted| posted.entry.reference.clone()).collect(),
                residual: net.values().filter(|amount| **amount > Decimal::ZERO).sum(),
            })
        })
        .collect();

    let date_mismatches: Vec<DateMismatch> = entries
        .iter()
        .filter(|posted| posted.entry.source == EntrySource::InvoiceIssued)
        .filter_map(|posted| {
            let invoice = posted.entry.invoice_id.and_then(|id| by_id.get(&id))?;
            let entry_date = posted.entry.entry_date;
            let touches_month = range.contains(entry_date) || range.contains(invoice.issue_date);
            (entry_date != invoice.issue_date && touches_month).then(|| DateMismatch {
                entry_id: posted.entry.id,
                reference: posted.entry.reference.clone(),
                invoice_id: invoice.id,
                entry_date,
                issue_date: invoice.issue_date,
            })
        })
        .collect();

    let in_month: Vec<&PostedEntry> = entries
        .iter()
        .filter(|posted| range.contains(posted.entry.entry_date))
        .collect();

    let unbalanced: Vec<UnbalancedEntry> = in_month
        .iter()
        .filter(|posted| !posted.is_balanced())
        .map(|posted| UnbalancedEntry {
            entry_id: posted.entry.id,
            reference: posted.entry.reference.clone(),
            debits: posted.total_debits(),
            credits: posted.total_credits(),
        })
        .collect();

    let sales_net = |posted: &PostedEntry| -> Decimal {
        posted
            .lines
            .iter()
            .filter(|line| {
                book.by_id(line.account_id)
                    .is_some_and(|account| account.category == AccountCategory::Sales)
            })
            .map(|line| line.credit - line.debit)
            .sum()
    };

    let recognized_invoice_revenue: Decimal = in_month
        .iter()
        .filter(|posted| posted.entry.source.is_invoice_related())
        .map(|posted| sales_net(*posted))
        .sum();
    let cash_sales: Decimal = in_month
        .iter()
        .filter(|posted| posted.entry.source == EntrySource::Sale)
        .map(|posted| sales_net(*posted))
        .sum();
    let paid_invoice_revenue: Decimal = invoices
        .iter()
        .filter(|invoice| invoice.status == InvoiceStatus::Paid)
        .filter(|invoice| {
            invoice
                .paid_at
                .is_some_and(|paid_at| range.contains(paid_at.date_naive()))
        })
        .map(|invoice| invoice.subtotal)
        .sum();

    Ok(CleanupReport {
        month: range.from.map(month_key).unwrap_or_else(|| month.to_string()),
        entries_examined: in_month.len(),
        orphaned,
        date_mismatches,
        unbalanced,
        recognized_invoice_revenue,
        paid_invoice_revenue,
        cash_sales,
        discrepancy: recognized_invoice_revenue - paid_invoice_revenue,
    })
}

//! Read-side views over the journal: balances, trial balance, revenue
//! analytics and the dashboard.

use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
};

use chrono::{Datelike, Duration, Months, NaiveDate};
use ledgerlite_core::{
    Account, AccountCategory, AccountType, Customer, DateRange, EntrySource, Invoice,
    InvoiceStatus, LedgerError, PostedEntry,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    classify::{TransactionKind, infer_kind},
    journal::AccountBook,
};

const TOP_CUSTOMERS: usize = 5;
const RECENT_TRANSACTIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub category: AccountCategory,
    pub debits: Decimal,
    pub credits: Decimal,
    pub balance: Decimal,
}

/// Running balance of every account, ordered by account code.
pub fn account_balances(accounts: &[Account], entries: &[PostedEntry]) -> Vec<AccountBalance> {
    let mut totals: HashMap<Uuid, (Decimal, Decimal)> = HashMap::new();
    for line in entries.iter().flat_map(|posted| posted.lines.iter()) {
        let slot = totals.entry(line.account_id).or_default();
        slot.0 += line.debit;
        slot.1 += line.credit;
    }

    let mut balances: Vec<AccountBalance> = accounts
        .iter()
        .map(|account| {
            let (debits, credits) = totals.get(&account.id).copied().unwrap_or_default();
            AccountBalance {
                account_id: account.id,
                code: account.code.clone(),
                name: account.name.clone(),
                account_type: account.account_type,
                category: account.category,
                debits,
                credits,
                balance: account.account_type.balance(debits, credits),
            }
        })
        .collect();
    balances.sort_by(|left, right| left.code.cmp(&right.code));
    balances
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialBalanceRow {
    pub code: String,
    pub name: String,
    pub category: AccountCategory,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialBalance {
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub balanced: bool,
}

pub fn trial_balance(
    accounts: &[Account],
    entries: &[PostedEntry],
    as_of: Option<NaiveDate>,
) -> TrialBalance {
    let rows: Vec<TrialBalanceRow> = account_balances(accounts, entries)
        .into_iter()
        .filter(|balance| !balance.debits.is_zero() || !balance.credits.is_zero())
        .map(|balance| {
            let net = balance.debits - balance.credits;
            TrialBalanceRow {
                code: balance.code,
                name: balance.name,
                category: balance.category,
                debit: net.max(Decimal::ZERO),
                credit: (-net).max(Decimal::ZERO),
            }
        })
        .collect();

    let total_debits: Decimal = rows.iter().map(|row| row.debit).sum();
    let total_credits: Decimal = rows.iter().map(|row| row.credit).sum();

    TrialBalance {
        as_of,
        rows,
        total_debits,
        total_credits,
        balanced: total_debits == total_credits,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    ThisMonth,
    LastMonth,
    Last30Days,
    ThisYear,
    All,
}

impl FromStr for Period {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "this_month" => Ok(Self::ThisMonth),
            "last_month" => Ok(Self::LastMonth),
            "last_30_days" => Ok(Self::Last30Days),
            "this_year" => Ok(Self::ThisYear),
            "all" => Ok(Self::All),
            other => Err(LedgerError::validation(format!(
                "period must be this_month, last_month, last_30_days, this_year or all (got {other})"
            ))),
        }
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

impl Period {
    pub fn range(&self, today: NaiveDate) -> Result<DateRange, LedgerError> {
        let out_of_range = || LedgerError::validation("date out of range");

        let range = match self {
            Self::ThisMonth => DateRange::between(month_start(today), today),
            Self::LastMonth => {
                let previous = month_start(today)
                    .pred_opt()
                    .ok_or_else(out_of_range)?;
                DateRange::between(month_start(previous), previous)
            }
            Self::Last30Days => DateRange::between(today - Duration::days(29), today),
            Self::ThisYear => DateRange::between(
                NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(out_of_range)?,
                today,
            ),
            Self::All => DateRange::all(),
        };
        Ok(range)
    }
}

/// Explicit `from`/`to` win over a named period; no input means this month.
pub fn resolve_range(
    period: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange, LedgerError> {
    if from.is_some() || to.is_some() {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(LedgerError::validation("from must not be after to"));
            }
        }
        return Ok(DateRange { from, to });
    }

    period.unwrap_or_default().parse::<Period>()?.range(today)
}

/// Net credit to Sales (revenue) and net debit to Operating Expenses in an entry.
fn revenue_and_expense(posted: &PostedEntry, book: &AccountBook) -> (Decimal, Decimal) {
    let mut revenue = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    for line in &posted.lines {
        match book.by_id(line.account_id).map(|account| account.category) {
            Some(AccountCategory::Sales) => revenue += line.credit - line.debit,
            Some(AccountCategory::Expense) => expenses += line.debit - line.credit,
            _ => {}
        }
    }
    (revenue, expenses)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyFigure {
    pub month: String,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceStats {
    pub issued: usize,
    pub paid: usize,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerRevenue {
    pub customer_id: Uuid,
    pub name: String,
    pub revenue: Decimal,
    pub invoices: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    pub monthly: Vec<MonthlyFigure>,
    pub invoices: InvoiceStats,
    pub top_customers: Vec<CustomerRevenue>,
}

/// Summarizes entries and invoices already narrowed to `range`; invoices are
/// matched on their issue date.
pub fn revenue_summary(
    book: &AccountBook,
    entries: &[PostedEntry],
    invoices: &[Invoice],
    customers: &[Customer],
    range: DateRange,
) -> RevenueSummary {
    let mut monthly: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for posted in entries
        .iter()
        .filter(|posted| range.contains(posted.entry.entry_date))
    {
        let (revenue, expenses) = revenue_and_expense(posted, book);
        if revenue.is_zero() && expenses.is_zero() {
            continue;
        }
        let slot = monthly.entry(month_key(posted.entry.entry_date)).or_default();
        slot.0 += revenue;
        slot.1 += expenses;
    }

    let monthly: Vec<MonthlyFigure> = monthly
        .into_iter()
        .map(|(month, (revenue, expenses))| MonthlyFigure {
            month,
            revenue,
            expenses,
            profit: revenue - expenses,
        })
        .collect();
    let total_revenue: Decimal = monthly.iter().map(|figure| figure.revenue).sum();
    let total_expenses: Decimal = monthly.iter().map(|figure| figure.expenses).sum();

    let in_range: Vec<&Invoice> = invoices
        .iter()
        .filter(|invoice| range.contains(invoice.issue_date))
        .collect();

    let mut stats = InvoiceStats::default();
    let mut by_customer: HashMap<Uuid, (Decimal, usize)> = HashMap::new();
    for invoice in &in_range {
        if invoice.status != InvoiceStatus::Cancelled {
            stats.issued += 1;
        }
        if invoice.status == InvoiceStatus::Paid {
            stats.paid += 1;
            stats.paid_amount += invoice.total;
            let slot = by_customer.entry(invoice.customer_id).or_default();
            slot.0 += invoice.subtotal;
            slot.1 += 1;
        } else if invoice.status.is_outstanding() {
            stats.outstanding_amount += invoice.total;
        }
    }

    let names: HashMap<Uuid, &str> = customers
        .iter()
        .map(|customer| (customer.id, customer.name.as_str()))
        .collect();
    let mut top_customers: Vec<CustomerRevenue> = by_customer
        .into_iter()
        .map(|(customer_id, (revenue, invoices))| CustomerRevenue {
            customer_id,
            name: names
                .get(&customer_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| "Unknown customer".to_string()),
            revenue,
            invoices,
        })
        .collect();
    top_customers.sort_by(|left, right| {
        right
            .revenue
            .cmp(&left.revenue)
            .then_with(|| left.name.cmp(&right.name))
    });
    top_customers.truncate(TOP_CUSTOMERS);

    RevenueSummary {
        from: range.from,
        to: range.to,
        total_revenue,
        total_expenses,
        net_profit: total_revenue - total_expenses,
        monthly,
        invoices: stats,
        top_customers,
    }
}

/// A journal entry as the transactions screen shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub reference: String,
    pub description: String,
    pub kind: TransactionKind,
    pub source: EntrySource,
    pub amount: Decimal,
    pub category: Option<String>,
    pub document_number: Option<String>,
}

impl TransactionView {
    pub fn from_entry(posted: &PostedEntry, book: &AccountBook) -> Self {
        let money_net: Decimal = posted
            .lines
            .iter()
            .filter(|line| {
                book.by_id(line.account_id)
                    .is_some_and(|account| account.category.is_money())
            })
            .map(|line| line.debit - line.credit)
            .sum();
        let amount = if money_net.is_zero() {
            posted.total_debits()
        } else {
            money_net.abs()
        };

        Self {
            id: posted.entry.id,
            date: posted.entry.entry_date,
            reference: posted.entry.reference.clone(),
            description: posted.entry.narration.clone(),
            kind: infer_kind(posted, book),
            source: posted.entry.source,
            amount,
            category: posted.lines.iter().find_map(|line| line.memo.clone()),
            document_number: posted.entry.document_number.clone(),
        }
    }
}

/// Newest first.
pub fn transaction_views(
    entries: &[PostedEntry],
    book: &AccountBook,
    kind: Option<TransactionKind>,
) -> Vec<TransactionView> {
    let mut views: Vec<TransactionView> = entries
        .iter()
        .map(|posted| TransactionView::from_entry(posted, book))
        .filter(|view| kind.is_none_or(|kind| view.kind == kind))
        .collect();
    views.reverse();
    views
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dashboard {
    pub cash_position: Decimal,
    pub receivables: Decimal,
    pub month: String,
    pub revenue_this_month: Decimal,
    pub expenses_this_month: Decimal,
    pub profit_this_month: Decimal,
    pub invoice_counts: BTreeMap<String, usize>,
    pub recent_transactions: Vec<TransactionView>,
}

pub fn dashboard(
    book: &AccountBook,
    entries: &[PostedEntry],
    invoices: &[Invoice],
    today: NaiveDate,
) -> Dashboard {
    let accounts: Vec<Account> = book.accounts().cloned().collect();
    let balances = account_balances(&accounts, entries);
    let balance_of = |wanted: &[AccountCategory]| -> Decimal {
        balances
            .iter()
            .filter(|balance| wanted.contains(&balance.category))
            .map(|balance| balance.balance)
            .sum()
    };

    let this_month = DateRange::between(month_start(today), today);
    let (revenue, expenses) = entries
        .iter()
        .filter(|posted| this_month.contains(posted.entry.entry_date))
        .map(|posted| revenue_and_expense(posted, book))
        .fold((Decimal::ZERO, Decimal::ZERO), |acc, (revenue, expenses)| {
            (acc.0 + revenue, acc.1 + expenses)
        });

    let mut invoice_counts: BTreeMap<String, usize> = InvoiceStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for invoice in invoices {
        *invoice_counts
            .entry(invoice.status.as_str().to_string())
            .or_default() += 1;
    }

    let mut recent_transactions = transaction_views(entries, book, None);
    recent_transactions.truncate(RECENT_TRANSACTIONS);

    Dashboard {
        cash_position: balance_of(&[AccountCategory::Cash, AccountCategory::Bank]),
        receivables: balance_of(&[AccountCategory::Receivable]),
        month: month_key(today),
        revenue_this_month: revenue,
        expenses_this_month: expenses,
        profit_this_month: revenue - expenses,
        invoice_counts,
        recent_transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledgerlite_core::{SmallBusinessProfile, StandardsProfile};
    use rust_decimal_macros::dec;

    use crate::posting::{CashMovement, PaymentMethod, cash_movement, invoice_issued, invoice_paid};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn book() -> AccountBook {
        AccountBook::new(SmallBusinessProfile.chart_of_accounts().into_iter().map(
            |template| Account {
                id: Uuid::new_v4(),
                company_id: Uuid::nil(),
                code: template.code.to_string(),
                name: template.name.to_string(),
                account_type: template.account_type,
                category: template.category,
                created_at: Utc::now(),
            },
        ))
    }

    fn movement(book: &AccountBook, kind: CashMovement, amount: Decimal, on: NaiveDate) -> PostedEntry {
        let (entry, lines) = cash_movement(
            book,
            kind,
            PaymentMethod::Cash,
            amount,
            on,
            format!("{}-{on}", kind.reference_prefix()),
            "test".to_string(),
            "",
        )
        .unwrap()
        .into_posting(Uuid::nil())
        .unwrap();
        PostedEntry { entry, lines }
    }

    fn invoice(customer_id: Uuid, subtotal: Decimal, status: InvoiceStatus, issued: NaiveDate) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            customer_id,
            number: format!("INV-{subtotal}"),
            issue_date: issued,
            due_date: issued,
            status,
            subtotal,
            vat_rate: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            total: subtotal,
            notes: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn named_periods_resolve_against_today() {
        let today = date(2025, 3, 15);
        assert_eq!(
            resolve_range(None, None, None, today).unwrap(),
            DateRange::between(date(2025, 3, 1), today)
        );
        assert_eq!(
            resolve_range(Some("last_month"), None, None, today).unwrap(),
            DateRange::between(date(2025, 2, 1), date(2025, 2, 28))
        );
        assert_eq!(
            resolve_range(Some("last_30_days"), None, None, today).unwrap(),
            DateRange::between(date(2025, 2, 14), today)
        );
        assert_eq!(
            resolve_range(Some("this_year"), None, None, today).unwrap(),
            DateRange::between(date(2025, 1, 1), today)
        );
        assert_eq!(resolve_range(Some("all"), None, None, today).unwrap(), DateRange::all());
    }

    #[test]
    fn explicit_bounds_override_period() {
        let today = date(2025, 3, 15);
        let range = resolve_range(Some("all"), Some(date(2025, 1, 5)), None, today).unwrap();
        assert_eq!(range.from, Some(date(2025, 1, 5)));
        assert_eq!(range.to, None);
        assert!(resolve_range(None, Some(today), Some(date(2025, 1, 1)), today).is_err());
        assert!(resolve_range(Some("fortnight"), None, None, today).is_err());
    }

    #[test]
    fn last_month_from_january_wraps_year() {
        let range = Period::LastMonth.range(date(2025, 1, 10)).unwrap();
        assert_eq!(range, DateRange::between(date(2024, 12, 1), date(2024, 12, 31)));
        assert_eq!(month_end(date(2024, 2, 10)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn summary_splits_revenue_and_expenses_by_month() {
        let book = book();
        let entries = vec![
            movement(&book, CashMovement::Sale, dec!(5000), date(2025, 1, 10)),
            movement(&book, CashMovement::Expense, dec!(1200), date(2025, 1, 12)),
            movement(&book, CashMovement::Sale, dec!(800), date(2025, 2, 1)),
            movement(&book, CashMovement::PersonalExpense, dec!(300), date(2025, 2, 2)),
        ];

        let summary = revenue_summary(&book, &entries, &[], &[], DateRange::all());
        assert_eq!(summary.total_revenue, dec!(5800));
        assert_eq!(summary.total_expenses, dec!(1200));
        assert_eq!(summary.net_profit, dec!(4600));
        assert_eq!(summary.monthly.len(), 2);
        assert_eq!(summary.monthly[0].month, "2025-01");
        assert_eq!(summary.monthly[0].profit, dec!(3800));
    }

    #[test]
    fn invoice_stats_and_top_customers() {
        let book = book();
        let ada = Customer {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "Ada Stores".to_string(),
            email: None,
            phone: None,
            created_at: Utc::now(),
        };
        let bayo = Customer {
            id: Uuid::new_v4(),
            name: "Bayo Ltd".to_string(),
            ..ada.clone()
        };
        let on = date(2025, 4, 2);
        let invoices = vec![
            invoice(ada.id, dec!(1000), InvoiceStatus::Paid, on),
            invoice(bayo.id, dec!(3000), InvoiceStatus::Paid, on),
            invoice(ada.id, dec!(700), InvoiceStatus::Sent, on),
            invoice(ada.id, dec!(50), InvoiceStatus::Cancelled, on),
        ];

        let summary = revenue_summary(&book, &[], &invoices, &[ada, bayo], DateRange::all());
        assert_eq!(summary.invoices.issued, 3);
        assert_eq!(summary.invoices.paid, 2);
        assert_eq!(summary.invoices.paid_amount, dec!(4000));
        assert_eq!(summary.invoices.outstanding_amount, dec!(700));
        assert_eq!(summary.top_customers[0].name, "Bayo Ltd");
        assert_eq!(summary.top_customers[1].revenue, dec!(1000));
    }

    #[test]
    fn trial_balance_of_postings_balances() {
        let book = book();
        let on = date(2025, 5, 1);
        let invoice = invoice(Uuid::new_v4(), dec!(10000), InvoiceStatus::Sent, on);
        let mut entries = Vec::new();
        for draft in [
            invoice_issued(&book, &invoice).unwrap(),
            invoice_paid(&book, &invoice, PaymentMethod::Cash, on).unwrap(),
        ] {
            let (entry, lines) = draft.into_posting(Uuid::nil()).unwrap();
            entries.push(PostedEntry { entry, lines });
        }
        let accounts: Vec<Account> = book.accounts().cloned().collect();

        let trial = trial_balance(&accounts, &entries, Some(on));
        assert!(trial.balanced);
        assert_eq!(trial.total_debits, dec!(10000));

        let balances = account_balances(&accounts, &entries);
        let sales = balances
            .iter()
            .find(|balance| balance.category == AccountCategory::Sales)
            .unwrap();
        assert_eq!(sales.balance, dec!(10000));
        assert_eq!(balances[0].code, "1000");
    }

    #[test]
    fn dashboard_reports_cash_and_recent_activity() {
        let book = book();
        let today = date(2025, 6, 20);
        let entries = vec![
            movement(&book, CashMovement::Sale, dec!(900), date(2025, 5, 30)),
            movement(&book, CashMovement::Sale, dec!(400), today),
            movement(&book, CashMovement::Expense, dec!(150), today),
        ];

        let board = dashboard(&book, &entries, &[], today);
        assert_eq!(board.cash_position, dec!(1150));
        assert_eq!(board.revenue_this_month, dec!(400));
        assert_eq!(board.profit_this_month, dec!(250));
        assert_eq!(board.invoice_counts.get("paid"), Some(&0));
        assert_eq!(board.recent_transactions[0].kind, TransactionKind::Expense);
        assert_eq!(board.recent_transactions[0].amount, dec!(150));
    }
}

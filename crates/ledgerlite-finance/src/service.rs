use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use ledgerlite_core::{
    Account, AccountCategory, Company, Customer, DateRange, EntrySource, EventPublisher, Invoice,
    InvoiceFilter, InvoiceItem, InvoiceStatus, JournalEntry, LedgerError, LedgerEvent,
    LedgerStore, LedgerTx, PostedEntry, PurgeCounts, SmallBusinessProfile, StandardsProfile, User,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    classify::TransactionKind,
    cleanup::{CleanupAction, CleanupReport, diagnose},
    invoicing::{InvoiceLineInput, compute_amounts, format_invoice_number, normalize_prefix},
    journal::{AccountBook, JournalDraft, MAX_AMOUNT, money},
    posting::{
        CashMovement, ISSUE_CATEGORIES, PaymentMethod, cash_movement, invoice_issued,
        invoice_paid, payment_categories, reverse_invoice,
    },
    reports::{
        AccountBalance, Dashboard, RevenueSummary, TransactionView, TrialBalance,
        account_balances, dashboard, month_key, revenue_summary, transaction_views,
        trial_balance,
    },
};

const DEFAULT_INVOICE_PREFIX: &str = "INV";
const DEFAULT_CURRENCY: &str = "NGN";
const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub invoice_prefix: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
    pub customer: NewCustomer,
    pub items: Vec<InvoiceLineInput>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub vat_rate: Option<Decimal>,
    pub apply_vat: bool,
    pub notes: Option<String>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub customer: Option<Customer>,
    pub entries: Vec<PostedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutcome {
    pub invoice: Invoice,
    pub changed: bool,
    pub already_paid: bool,
    pub entry: Option<JournalEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub invoice_id: Uuid,
    pub number: String,
    pub reversal: Option<PostedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub category: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonalExpense {
    pub amount: Decimal,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub category: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorded {
    pub transaction: TransactionView,
    pub duplicate: bool,
}

#[derive(Debug, Clone)]
pub enum SyncCommand {
    Transaction(NewTransaction),
    PersonalExpense(NewPersonalExpense),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Applied,
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub client_id: Uuid,
    pub status: SyncStatus,
    pub entry_id: Option<Uuid>,
    pub error: Option<String>,
}

impl SyncResult {
    pub fn failed(client_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            client_id,
            status: SyncStatus::Failed,
            entry_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub action: CleanupAction,
    pub confirm: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub action: CleanupAction,
    pub month: Option<String>,
    pub removed_entries: u64,
    pub fixed_dates: u64,
    pub purged: Option<PurgeCounts>,
}

/// Runs every bookkeeping operation of a company. Each call opens one store
/// transaction and commits it only once all of its postings succeeded.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    events: Arc<dyn EventPublisher>,
    profile: SmallBusinessProfile,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            events,
            profile: SmallBusinessProfile,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub async fn create_company(&self, owner: &User, input: NewCompany) -> Result<Company> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("company name is required").into());
        }
        let invoice_prefix =
            normalize_prefix(input.invoice_prefix.as_deref().unwrap_or(DEFAULT_INVOICE_PREFIX))?;
        let currency = input
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|currency| !currency.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::validation("currency must be a 3-letter code").into());
        }

        let mut tx = self.store.begin().await?;
        if tx.find_company_by_owner(owner.id).await?.is_some() {
            return Err(LedgerError::Conflict("a company already exists for this user".into()).into());
        }

        let company = Company {
            id: Uuid::new_v4(),
            owner_user_id: owner.id,
            name,
            invoice_prefix,
            currency,
            next_invoice_number: 1,
            created_at: Utc::now(),
        };
        if !tx.insert_company(&company).await? {
            return Err(LedgerError::Conflict("a company already exists for this user".into()).into());
        }
        self.ensure_accounts(tx.as_mut(), company.id, &AccountCategory::ALL)
            .await?;
        tx.commit().await?;

        info!(company_id = %company.id, name = %company.name, "company created");
        Ok(company)
    }

    pub async fn company_for_user(&self, user_id: Uuid) -> Result<Company> {
        let mut tx = self.store.begin().await?;
        let company = tx
            .find_company_by_owner(user_id)
            .await?
            .ok_or(LedgerError::NotFound("company"))?;
        Ok(company)
    }

    pub async fn accounts_with_balances(&self, company_id: Uuid) -> Result<Vec<AccountBalance>> {
        let mut tx = self.store.begin().await?;
        let accounts = tx.list_accounts(company_id).await?;
        let entries = tx.list_journal(company_id, &DateRange::all()).await?;
        Ok(account_balances(&accounts, &entries))
    }

    pub async fn list_customers(&self, company_id: Uuid) -> Result<Vec<Customer>> {
        let mut tx = self.store.begin().await?;
        tx.list_customers(company_id).await
    }

    /// Returns the customer with this exact name, creating it when missing.
    /// The flag tells whether a row was created.
    pub async fn create_customer(
        &self,
        company_id: Uuid,
        input: NewCustomer,
    ) -> Result<(Customer, bool)> {
        let mut tx = self.store.begin().await?;
        let (customer, created) = find_or_create_customer(tx.as_mut(), company_id, &input).await?;
        tx.commit().await?;
        Ok((customer, created))
    }

    pub async fn create_invoice(&self, company: &Company, input: NewInvoice) -> Result<InvoiceDetail> {
        let vat_rate = input.vat_rate.unwrap_or(if input.apply_vat {
            self.profile.default_vat_rate()
        } else {
            Decimal::ZERO
        });
        let amounts = compute_amounts(&input.items, vat_rate)?;

        let status = input.status.unwrap_or(InvoiceStatus::Draft);
        if !matches!(status, InvoiceStatus::Draft | InvoiceStatus::Sent) {
            return Err(LedgerError::validation("a new invoice must be draft or sent").into());
        }

        let issue_date = input.issue_date.unwrap_or_else(|| Utc::now().date_naive());
        let due_date = input
            .due_date
            .unwrap_or(issue_date + Duration::days(DEFAULT_PAYMENT_TERMS_DAYS));
        if due_date < issue_date {
            return Err(LedgerError::validation("due_date cannot be before issue_date").into());
        }

        let mut tx = self.store.begin().await?;
        let (customer, _) = find_or_create_customer(tx.as_mut(), company.id, &input.customer).await?;
        let sequence = tx.allocate_invoice_number(company.id).await?;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            company_id: company.id,
            customer_id: customer.id,
            number: format_invoice_number(&company.invoice_prefix, sequence),
            issue_date,
            due_date,
            status,
            subtotal: amounts.subtotal,
            vat_rate: amounts.vat_rate,
            vat_amount: amounts.vat_amount,
            total: amounts.total,
            notes: input
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            paid_at: None,
            created_at: Utc::now(),
        };
        let items: Vec<InvoiceItem> = amounts
            .lines
            .into_iter()
            .map(|line| InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                amount: line.amount,
            })
            .collect();
        tx.insert_invoice(&invoice, &items).await?;

        let book = self
            .ensure_accounts(tx.as_mut(), company.id, &ISSUE_CATEGORIES)
            .await?;
        let issued = post_draft(tx.as_mut(), company.id, invoice_issued(&book, &invoice)?).await?;
        tx.commit().await?;

        info!(
            company_id = %company.id,
            invoice = %invoice.number,
            total = %invoice.total,
            "invoice issued"
        );
        self.publish(&[&issued.entry]).await;

        Ok(InvoiceDetail {
            invoice,
            items,
            customer: Some(customer),
            entries: vec![issued],
        })
    }

    pub async fn get_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> Result<InvoiceDetail> {
        let mut tx = self.store.begin().await?;
        let invoice = tx
            .find_invoice(company_id, invoice_id)
            .await?
            .ok_or(LedgerError::NotFound("invoice"))?;
        let items = tx.list_invoice_items(invoice_id).await?;
        let customer = tx
            .list_customers(company_id)
            .await?
            .into_iter()
            .find(|customer| customer.id == invoice.customer_id);
        let entries = tx.list_journal_for_invoice(invoice_id).await?;

        Ok(InvoiceDetail {
            invoice,
            items,
            customer,
            entries,
        })
    }

    pub async fn list_invoices(&self, company_id: Uuid, filter: &InvoiceFilter) -> Result<Vec<Invoice>> {
        let mut tx = self.store.begin().await?;
        tx.list_invoices(company_id, filter).await
    }

    /// Moves an invoice along its status machine. Repeating the current status
    /// changes nothing, so paying twice recognizes revenue once.
    pub async fn update_invoice_status(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        change: StatusChange,
    ) -> Result<StatusOutcome> {
        let mut tx = self.store.begin().await?;
        let mut invoice = tx
            .lock_invoice(company_id, invoice_id)
            .await?
            .ok_or(LedgerError::NotFound("invoice"))?;

        if invoice.status == change.status {
            return Ok(StatusOutcome {
                already_paid: invoice.status == InvoiceStatus::Paid,
                invoice,
                changed: false,
                entry: None,
            });
        }
        if !invoice.status.can_transition_to(change.status) {
            return Err(LedgerError::InvalidStatusTransition {
                from: invoice.status.to_string(),
                to: change.status.to_string(),
            }
            .into());
        }

        let today = Utc::now().date_naive();
        let posted = match change.status {
            InvoiceStatus::Paid => {
                let book = self
                    .ensure_accounts(
                        tx.as_mut(),
                        company_id,
                        &payment_categories(change.payment_method),
                    )
                    .await?;
                let paid_on = change.paid_on.unwrap_or(today);
                invoice.paid_at = Some(
                    change
                        .paid_on
                        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
                        .unwrap_or_else(Utc::now),
                );
                let draft = invoice_paid(&book, &invoice, change.payment_method, paid_on)?;
                Some(post_draft(tx.as_mut(), company_id, draft).await?)
            }
            InvoiceStatus::Cancelled => {
                let entries = tx.list_journal_for_invoice(invoice.id).await?;
                let narration = format!("Invoice {} cancelled", invoice.number);
                match reverse_invoice(&invoice, &entries, "VOID", &narration, today) {
                    Some(draft) => Some(post_draft(tx.as_mut(), company_id, draft).await?),
                    None => None,
                }
            }
            _ => None,
        };

        let previous = invoice.status;
        invoice.status = change.status;
        tx.update_invoice_status(&invoice).await?;
        tx.commit().await?;

        info!(
            invoice = %invoice.number,
            from = %previous,
            to = %invoice.status,
            "invoice status changed"
        );
        let entry = posted.map(|posted| posted.entry);
        if let Some(entry) = &entry {
            self.publish(&[entry]).await;
        }

        Ok(StatusOutcome {
            invoice,
            changed: true,
            already_paid: false,
            entry,
        })
    }

    /// Removes an invoice after posting a `DEL-` entry that cancels whatever
    /// its journal entries still leave on the books. The entries themselves
    /// stay for the audit trail.
    pub async fn delete_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> Result<DeletionOutcome> {
        let mut tx = self.store.begin().await?;
        let invoice = tx
            .lock_invoice(company_id, invoice_id)
            .await?
            .ok_or(LedgerError::NotFound("invoice"))?;

        let entries = tx.list_journal_for_invoice(invoice.id).await?;
        let narration = format!("Invoice {} deleted", invoice.number);
        let reversal = match reverse_invoice(
            &invoice,
            &entries,
            "DEL",
            &narration,
            Utc::now().date_naive(),
        ) {
            Some(draft) => Some(post_draft(tx.as_mut(), company_id, draft).await?),
            None => None,
        };

        tx.delete_invoice(invoice.id).await?;
        tx.commit().await?;

        info!(invoice = %invoice.number, reversed = reversal.is_some(), "invoice deleted");
        if let Some(reversal) = &reversal {
            self.publish(&[&reversal.entry]).await;
        }

        Ok(DeletionOutcome {
            invoice_id: invoice.id,
            number: invoice.number,
            reversal,
        })
    }

    /// Flags sent invoices whose due date is before `today`, for every company.
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<usize> {
        let mut tx = self.store.begin().await?;
        let due = tx
            .list_invoices_due_before(InvoiceStatus::Sent, today)
            .await?;
        for mut invoice in due.iter().cloned() {
            invoice.status = InvoiceStatus::Overdue;
            tx.update_invoice_status(&invoice).await?;
        }
        tx.commit().await?;

        if !due.is_empty() {
            info!(count = due.len(), "invoices marked overdue");
        }
        Ok(due.len())
    }

    pub async fn record_transaction(&self, company_id: Uuid, input: NewTransaction) -> Result<Recorded> {
        let movement = match input.kind {
            TransactionKind::Income => CashMovement::Sale,
            TransactionKind::Expense => CashMovement::Expense,
            TransactionKind::Other => {
                return Err(LedgerError::validation("type must be income or expense").into());
            }
        };

        self.record_movement(
            company_id,
            movement,
            MovementInput {
                amount: input.amount,
                description: input.description,
                date: input.date,
                payment_method: input.payment_method,
                category: input.category,
                client_id: input.client_id,
            },
        )
        .await
    }

    pub async fn record_personal_expense(
        &self,
        company_id: Uuid,
        input: NewPersonalExpense,
    ) -> Result<Recorded> {
        self.record_movement(
            company_id,
            CashMovement::PersonalExpense,
            MovementInput {
                amount: input.amount,
                description: input.description,
                date: input.date,
                payment_method: input.payment_method,
                category: input.category,
                client_id: input.client_id,
            },
        )
        .await
    }

    pub async fn list_transactions(
        &self,
        company_id: Uuid,
        range: &DateRange,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<TransactionView>> {
        let mut tx = self.store.begin().await?;
        let book = AccountBook::new(tx.list_accounts(company_id).await?);
        let entries = tx.list_journal(company_id, range).await?;
        Ok(transaction_views(&entries, &book, kind))
    }

    pub async fn list_personal_expenses(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<TransactionView>> {
        let mut tx = self.store.begin().await?;
        let book = AccountBook::new(tx.list_accounts(company_id).await?);
        let entries: Vec<PostedEntry> = tx
            .list_journal(company_id, range)
            .await?
            .into_iter()
            .filter(|posted| posted.entry.source == EntrySource::PersonalExpense)
            .collect();
        Ok(transaction_views(&entries, &book, None))
    }

    pub async fn journal(&self, company_id: Uuid, range: &DateRange) -> Result<Vec<PostedEntry>> {
        let mut tx = self.store.begin().await?;
        tx.list_journal(company_id, range).await
    }

    pub async fn trial_balance(&self, company_id: Uuid, as_of: Option<NaiveDate>) -> Result<TrialBalance> {
        let mut tx = self.store.begin().await?;
        let accounts = tx.list_accounts(company_id).await?;
        let range = as_of.map(DateRange::until).unwrap_or_default();
        let entries = tx.list_journal(company_id, &range).await?;
        Ok(trial_balance(&accounts, &entries, as_of))
    }

    pub async fn revenue_analytics(&self, company_id: Uuid, range: DateRange) -> Result<RevenueSummary> {
        let mut tx = self.store.begin().await?;
        let book = AccountBook::new(tx.list_accounts(company_id).await?);
        let entries = tx.list_journal(company_id, &range).await?;
        let invoices = tx
            .list_invoices(
                company_id,
                &InvoiceFilter {
                    status: None,
                    range: Some(range),
                },
            )
            .await?;
        let customers = tx.list_customers(company_id).await?;
        Ok(revenue_summary(&book, &entries, &invoices, &customers, range))
    }

    pub async fn dashboard(&self, company_id: Uuid, today: NaiveDate) -> Result<Dashboard> {
        let mut tx = self.store.begin().await?;
        let book = AccountBook::new(tx.list_accounts(company_id).await?);
        let entries = tx.list_journal(company_id, &DateRange::until(today)).await?;
        let invoices = tx
            .list_invoices(company_id, &InvoiceFilter::default())
            .await?;
        Ok(dashboard(&book, &entries, &invoices, today))
    }

    pub async fn cleanup_report(&self, company_id: Uuid, month: &str) -> Result<CleanupReport> {
        let mut tx = self.store.begin().await?;
        Ok(diagnose_company(tx.as_mut(), company_id, month).await?)
    }

    pub async fn run_cleanup(
        &self,
        company: &Company,
        request: CleanupRequest,
        today: NaiveDate,
    ) -> Result<CleanupOutcome> {
        let month = request.month.unwrap_or_else(|| month_key(today));
        let mut outcome = CleanupOutcome {
            action: request.action,
            month: Some(month.clone()),
            removed_entries: 0,
            fixed_dates: 0,
            purged: None,
        };

        let mut tx = self.store.begin().await?;
        match request.action {
            CleanupAction::RemoveOrphans => {
                let report = diagnose_company(tx.as_mut(), company.id, &month).await?;
                outcome.removed_entries = tx
                    .delete_journal_entries(&report.orphaned_entry_ids())
                    .await?;
            }
            CleanupAction::FixDates => {
                let report = diagnose_company(tx.as_mut(), company.id, &month).await?;
                for mismatch in &report.date_mismatches {
                    tx.update_entry_date(mismatch.entry_id, mismatch.issue_date)
                        .await?;
                }
                outcome.fixed_dates = report.date_mismatches.len() as u64;
            }
            CleanupAction::Nuclear => {
                let confirmed = request
                    .confirm
                    .as_deref()
                    .is_some_and(|confirm| confirm.trim() == company.name);
                if !confirmed {
                    return Err(LedgerError::validation(
                        "confirm must equal the company name to wipe all financial data",
                    )
                    .into());
                }
                outcome.month = None;
                outcome.purged = Some(tx.purge_company_financials(company.id).await?);
            }
        }
        tx.commit().await?;

        warn!(
            company_id = %company.id,
            action = ?outcome.action,
            removed = outcome.removed_entries,
            fixed = outcome.fixed_dates,
            "ledger cleanup applied"
        );
        Ok(outcome)
    }

    /// Replays queued offline operations; each `client_id` is applied at most once.
    pub async fn sync(&self, company_id: Uuid, operations: Vec<(Uuid, SyncCommand)>) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(operations.len());
        for (client_id, command) in operations {
            let recorded = match command {
                SyncCommand::Transaction(mut input) => {
                    input.client_id = Some(client_id);
                    self.record_transaction(company_id, input).await
                }
                SyncCommand::PersonalExpense(mut input) => {
                    input.client_id = Some(client_id);
                    self.record_personal_expense(company_id, input).await
                }
            };

            results.push(match recorded {
                Ok(recorded) => SyncResult {
                    client_id,
                    status: if recorded.duplicate {
                        SyncStatus::Duplicate
                    } else {
                        SyncStatus::Applied
                    },
                    entry_id: Some(recorded.transaction.id),
                    error: None,
                },
                Err(err) => match err.downcast_ref::<LedgerError>() {
                    Some(domain) => SyncResult::failed(client_id, domain.to_string()),
                    None => {
                        warn!(%client_id, "sync operation failed: {err:#}");
                        SyncResult::failed(client_id, "operation could not be applied")
                    }
                },
            });
        }
        results
    }

    async fn record_movement(
        &self,
        company_id: Uuid,
        movement: CashMovement,
        input: MovementInput,
    ) -> Result<Recorded> {
        let amount = money(input.amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero").into());
        }
        if amount > MAX_AMOUNT {
            return Err(LedgerError::validation("amount is too large").into());
        }
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(LedgerError::validation("description is required").into());
        }
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
        let category = input
            .category
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty());

        let mut tx = self.store.begin().await?;
        let categories = [input.payment_method.category(), movement.counter_category()];
        let book = self.ensure_accounts(tx.as_mut(), company_id, &categories).await?;

        if let Some(client_id) = input.client_id {
            if let Some(recorded) = synced_movement(tx.as_mut(), company_id, client_id, &book).await? {
                return Ok(recorded);
            }
        }

        let reference = format!(
            "{}-{}-{}",
            movement.reference_prefix(),
            date.format("%Y%m%d"),
            &Uuid::new_v4().simple().to_string()[..6]
        );
        let draft = cash_movement(
            &book,
            movement,
            input.payment_method,
            amount,
            date,
            reference,
            description,
            category.as_deref().unwrap_or_default(),
        )?;
        let posted = post_draft(tx.as_mut(), company_id, draft).await?;
        if let Some(client_id) = input.client_id {
            if !tx.insert_sync_receipt(company_id, client_id, posted.entry.id).await? {
                // Lost the race for this client id; the posting above is rolled back on drop.
                drop(tx);
                let mut tx = self.store.begin().await?;
                return synced_movement(tx.as_mut(), company_id, client_id, &book)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound("journal entry").into());
            }
        }
        tx.commit().await?;

        info!(
            company_id = %company_id,
            reference = %posted.entry.reference,
            amount = %amount,
            "{} recorded",
            movement.source().as_str()
        );
        self.publish(&[&posted.entry]).await;

        Ok(Recorded {
            transaction: TransactionView::from_entry(&posted, &book),
            duplicate: false,
        })
    }

    /// Loads the company's accounts, inserting any of `categories` that are
    /// missing from the standard chart.
    async fn ensure_accounts(
        &self,
        tx: &mut dyn LedgerTx,
        company_id: Uuid,
        categories: &[AccountCategory],
    ) -> Result<AccountBook> {
        let mut accounts = tx.list_accounts(company_id).await?;
        for category in categories {
            if accounts.iter().any(|account| account.category == *category) {
                continue;
            }
            let template = self.profile.template(*category);
            let account = tx
                .insert_account_if_missing(&Account {
                    id: Uuid::new_v4(),
                    company_id,
                    code: template.code.to_string(),
                    name: template.name.to_string(),
                    account_type: template.account_type,
                    category: template.category,
                    created_at: Utc::now(),
                })
                .await?;
            accounts.push(account);
        }
        Ok(AccountBook::new(accounts))
    }

    async fn publish(&self, entries: &[&JournalEntry]) {
        for entry in entries {
            if let Err(err) = self.events.publish(&LedgerEvent::posted(entry)).await {
                warn!(reference = %entry.reference, "failed to publish ledger event: {err:#}");
            }
        }
    }
}

struct MovementInput {
    amount: Decimal,
    description: String,
    date: Option<NaiveDate>,
    payment_method: PaymentMethod,
    category: Option<String>,
    client_id: Option<Uuid>,
}

async fn post_draft(tx: &mut dyn LedgerTx, company_id: Uuid, draft: JournalDraft) -> Result<PostedEntry> {
    let (entry, lines) = draft.into_posting(company_id)?;
    tx.insert_journal_entry(&entry, &lines).await?;
    Ok(PostedEntry { entry, lines })
}

async fn find_or_create_customer(
    tx: &mut dyn LedgerTx,
    company_id: Uuid,
    input: &NewCustomer,
) -> Result<(Customer, bool)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("customer name is required").into());
    }
    if let Some(existing) = tx.find_customer_by_name(company_id, name).await? {
        return Ok((existing, false));
    }

    let clean = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let customer = Customer {
        id: Uuid::new_v4(),
        company_id,
        name: name.to_string(),
        email: clean(&input.email),
        phone: clean(&input.phone),
        created_at: Utc::now(),
    };
    if tx.insert_customer(&customer).await? {
        return Ok((customer, true));
    }
    let existing = tx
        .find_customer_by_name(company_id, name)
        .await?
        .ok_or(LedgerError::NotFound("customer"))?;
    Ok((existing, false))
}

/// The movement already recorded under `client_id`, if any.
async fn synced_movement(
    tx: &mut dyn LedgerTx,
    company_id: Uuid,
    client_id: Uuid,
    book: &AccountBook,
) -> Result<Option<Recorded>> {
    let Some(entry_id) = tx.find_sync_receipt(company_id, client_id).await? else {
        return Ok(None);
    };
    let existing = tx
        .list_journal(company_id, &DateRange::all())
        .await?
        .into_iter()
        .find(|posted| posted.entry.id == entry_id)
        .ok_or(LedgerError::NotFound("journal entry"))?;
    Ok(Some(Recorded {
        transaction: TransactionView::from_entry(&existing, book),
        duplicate: true,
    }))
}

async fn diagnose_company(
    tx: &mut dyn LedgerTx,
    company_id: Uuid,
    month: &str,
) -> Result<CleanupReport> {
    let book = AccountBook::new(tx.list_accounts(company_id).await?);
    let entries = tx.list_journal(company_id, &DateRange::all()).await?;
    let invoices = tx
        .list_invoices(company_id, &InvoiceFilter::default())
        .await?;
    Ok(diagnose(month, &book, &entries, &invoices)?)
}

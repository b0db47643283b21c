use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerlite_core::{
    Account, AccountCategory, Company, Customer, DateRange, Invoice, InvoiceFilter, InvoiceItem,
    InvoiceStatus, JournalEntry, JournalLine, LedgerError, LedgerStore, LedgerTx, OtpChallenge,
    PostedEntry, PurgeCounts, Session, User, ensure_balanced,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    otps: HashMap<String, OtpChallenge>,
    sessions: HashMap<String, Session>,
    companies: HashMap<Uuid, Company>,
    accounts: Vec<Account>,
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    invoice_items: Vec<InvoiceItem>,
    entries: Vec<JournalEntry>,
    lines: Vec<JournalLine>,
    sync_receipts: HashMap<(Uuid, Uuid), Uuid>,
}

/// Process-local store used by tests and when no database is configured.
///
/// Transactions are serialized: `begin` takes the write lock and works on a
/// copy of the state that replaces the shared state only on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>> {
        let guard = self.state.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }
}

struct InMemoryTx {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    working: MemoryState,
}

impl InMemoryTx {
    fn posted(&self, entries: Vec<JournalEntry>) -> Vec<PostedEntry> {
        entries
            .into_iter()
            .map(|entry| {
                let lines = self
                    .working
                    .lines
                    .iter()
                    .filter(|line| line.entry_id == entry.id)
                    .cloned()
                    .collect();
                PostedEntry { entry, lines }
            })
            .collect()
    }
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn find_user_by_phone(&mut self, phone: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|user| user.phone == phone)
            .cloned())
    }

    async fn get_user(&mut self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> anyhow::Result<()> {
        if self.working.users.values().any(|existing| existing.phone == user.phone) {
            anyhow::bail!("user with phone {} already exists", user.phone);
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn upsert_otp(&mut self, challenge: &OtpChallenge) -> anyhow::Result<()> {
        self.working
            .otps
            .insert(challenge.phone.clone(), challenge.clone());
        Ok(())
    }

    async fn find_otp(&mut self, phone: &str) -> anyhow::Result<Option<OtpChallenge>> {
        Ok(self.working.otps.get(phone).cloned())
    }

    async fn delete_otp(&mut self, phone: &str) -> anyhow::Result<()> {
        self.working.otps.remove(phone);
        Ok(())
    }

    async fn insert_session(&mut self, session: &Session) -> anyhow::Result<()> {
        self.working
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&mut self, token_hash: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.working.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&mut self, token_hash: &str) -> anyhow::Result<()> {
        self.working.sessions.remove(token_hash);
        Ok(())
    }

    async fn insert_company(&mut self, company: &Company) -> anyhow::Result<bool> {
        if self
            .working
            .companies
            .values()
            .any(|existing| existing.owner_user_id == company.owner_user_id)
        {
            return Ok(false);
        }
        self.working.companies.insert(company.id, company.clone());
        Ok(true)
    }

    async fn find_company_by_owner(&mut self, user_id: Uuid) -> anyhow::Result<Option<Company>> {
        Ok(self
            .working
            .companies
            .values()
            .find(|company| company.owner_user_id == user_id)
            .cloned())
    }

    async fn allocate_invoice_number(&mut self, company_id: Uuid) -> anyhow::Result<i64> {
        let company = self
            .working
            .companies
            .get_mut(&company_id)
            .ok_or(LedgerError::NotFound("company"))?;
        let allocated = company.next_invoice_number;
        company.next_invoice_number += 1;
        Ok(allocated)
    }

    async fn list_accounts(&mut self, company_id: Uuid) -> anyhow::Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .working
            .accounts
            .iter()
            .filter(|account| account.company_id == company_id)
            .cloned()
            .collect();
        accounts.sort_by(|left, right| left.code.cmp(&right.code));
        Ok(accounts)
    }

    async fn insert_account_if_missing(&mut self, account: &Account) -> anyhow::Result<Account> {
        if let Some(existing) = self.find_account(account.company_id, account.category).await? {
            return Ok(existing);
        }
        self.working.accounts.push(account.clone());
        Ok(account.clone())
    }

    async fn find_account(
        &mut self,
        company_id: Uuid,
        category: AccountCategory,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self
            .working
            .accounts
            .iter()
            .find(|account| account.company_id == company_id && account.category == category)
            .cloned())
    }

    async fn find_customer_by_name(
        &mut self,
        company_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Customer>> {
        Ok(self
            .working
            .customers
            .iter()
            .find(|customer| customer.company_id == company_id && customer.name == name)
            .cloned())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> anyhow::Result<bool> {
        if self.working.customers.iter().any(|existing| {
            existing.company_id == customer.company_id && existing.name == customer.name
        }) {
            return Ok(false);
        }
        self.working.customers.push(customer.clone());
        Ok(true)
    }

    async fn list_customers(&mut self, company_id: Uuid) -> anyhow::Result<Vec<Customer>> {
        let mut customers: Vec<Customer> = self
            .working
            .customers
            .iter()
            .filter(|customer| customer.company_id == company_id)
            .cloned()
            .collect();
        customers.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(customers)
    }

    async fn insert_invoice(
        &mut self,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> anyhow::Result<()> {
        if self
            .working
            .invoices
            .iter()
            .any(|existing| existing.company_id == invoice.company_id && existing.number == invoice.number)
        {
            anyhow::bail!("invoice number {} already exists", invoice.number);
        }
        self.working.invoices.push(invoice.clone());
        self.working.invoice_items.extend_from_slice(items);
        Ok(())
    }

    async fn find_invoice(
        &mut self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> anyhow::Result<Option<Invoice>> {
        Ok(self
            .working
            .invoices
            .iter()
            .find(|invoice| invoice.id == invoice_id && invoice.company_id == company_id)
            .cloned())
    }

    /// Transactions already run one at a time, so a plain read holds the row.
    async fn lock_invoice(
        &mut self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> anyhow::Result<Option<Invoice>> {
        self.find_invoice(company_id, invoice_id).await
    }

    async fn list_invoices(
        &mut self,
        company_id: Uuid,
        filter: &InvoiceFilter,
    ) -> anyhow::Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self
            .working
            .invoices
            .iter()
            .filter(|invoice| invoice.company_id == company_id)
            .filter(|invoice| filter.status.is_none_or(|status| invoice.status == status))
            .filter(|invoice| {
                filter
                    .range
                    .is_none_or(|range| range.contains(invoice.issue_date))
            })
            .cloned()
            .collect();
        invoices.sort_by(|left, right| {
            right
                .issue_date
                .cmp(&left.issue_date)
                .then_with(|| right.number.cmp(&left.number))
        });
        Ok(invoices)
    }

    async fn list_invoice_items(&mut self, invoice_id: Uuid) -> anyhow::Result<Vec<InvoiceItem>> {
        Ok(self
            .working
            .invoice_items
            .iter()
            .filter(|item| item.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn update_invoice_status(&mut self, invoice: &Invoice) -> anyhow::Result<()> {
        let stored = self
            .working
            .invoices
            .iter_mut()
            .find(|stored| stored.id == invoice.id)
            .ok_or(LedgerError::NotFound("invoice"))?;
        stored.status = invoice.status;
        stored.paid_at = invoice.paid_at;
        Ok(())
    }

    async fn delete_invoice(&mut self, invoice_id: Uuid) -> anyhow::Result<()> {
        self.working
            .invoice_items
            .retain(|item| item.invoice_id != invoice_id);
        self.working.invoices.retain(|invoice| invoice.id != invoice_id);
        for entry in &mut self.working.entries {
            if entry.invoice_id == Some(invoice_id) {
                entry.invoice_id = None;
            }
        }
        Ok(())
    }

    async fn list_invoices_due_before(
        &mut self,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Invoice>> {
        Ok(self
            .working
            .invoices
            .iter()
            .filter(|invoice| invoice.status == status && invoice.due_date < date)
            .cloned()
            .collect())
    }

    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> anyhow::Result<()> {
        ensure_balanced(lines)?;
        if lines.iter().any(|line| line.entry_id != entry.id) {
            anyhow::bail!("journal line does not belong to entry {}", entry.id);
        }
        self.working.entries.push(entry.clone());
        self.working.lines.extend_from_slice(lines);
        Ok(())
    }

    async fn list_journal(
        &mut self,
        company_id: Uuid,
        range: &DateRange,
    ) -> anyhow::Result<Vec<PostedEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .working
            .entries
            .iter()
            .filter(|entry| entry.company_id == company_id && range.contains(entry.entry_date))
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.entry_date);
        Ok(self.posted(entries))
    }

    async fn list_journal_for_invoice(
        &mut self,
        invoice_id: Uuid,
    ) -> anyhow::Result<Vec<PostedEntry>> {
        let entries: Vec<JournalEntry> = self
            .working
            .entries
            .iter()
            .filter(|entry| entry.invoice_id == Some(invoice_id))
            .cloned()
            .collect();
        Ok(self.posted(entries))
    }

    async fn update_entry_date(&mut self, entry_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
        let entry = self
            .working
            .entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or(LedgerError::NotFound("journal entry"))?;
        entry.entry_date = date;
        Ok(())
    }

    async fn delete_journal_entries(&mut self, entry_ids: &[Uuid]) -> anyhow::Result<u64> {
        let before = self.working.entries.len();
        self.working
            .lines
            .retain(|line| !entry_ids.contains(&line.entry_id));
        self.working
            .entries
            .retain(|entry| !entry_ids.contains(&entry.id));
        Ok((before - self.working.entries.len()) as u64)
    }

    async fn find_sync_receipt(
        &mut self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> anyhow::Result<Option<Uuid>> {
        Ok(self
            .working
            .sync_receipts
            .get(&(company_id, client_id))
            .copied())
    }

    async fn insert_sync_receipt(
        &mut self,
        company_id: Uuid,
        client_id: Uuid,
        entry_id: Uuid,
    ) -> anyhow::Result<bool> {
        let key = (company_id, client_id);
        if self.working.sync_receipts.contains_key(&key) {
            return Ok(false);
        }
        self.working.sync_receipts.insert(key, entry_id);
        Ok(true)
    }

    async fn purge_company_financials(&mut self, company_id: Uuid) -> anyhow::Result<PurgeCounts> {
        let state = &mut self.working;
        let entry_ids: Vec<Uuid> = state
            .entries
            .iter()
            .filter(|entry| entry.company_id == company_id)
            .map(|entry| entry.id)
            .collect();
        let invoice_ids: Vec<Uuid> = state
            .invoices
            .iter()
            .filter(|invoice| invoice.company_id == company_id)
            .map(|invoice| invoice.id)
            .collect();

        let mut counts = PurgeCounts::default();

        let before = state.lines.len();
        state.lines.retain(|line| !entry_ids.contains(&line.entry_id));
        counts.journal_lines = (before - state.lines.len()) as u64;

        let before = state.entries.len();
        state.entries.retain(|entry| entry.company_id != company_id);
        counts.journal_entries = (before - state.entries.len()) as u64;

        let before = state.sync_receipts.len();
        state
            .sync_receipts
            .retain(|(receipt_company, _), _| *receipt_company != company_id);
        counts.sync_receipts = (before - state.sync_receipts.len()) as u64;

        let before = state.invoice_items.len();
        state
            .invoice_items
            .retain(|item| !invoice_ids.contains(&item.invoice_id));
        counts.invoice_items = (before - state.invoice_items.len()) as u64;

        let before = state.invoices.len();
        state.invoices.retain(|invoice| invoice.company_id != company_id);
        counts.invoices = (before - state.invoices.len()) as u64;

        let before = state.customers.len();
        state
            .customers
            .retain(|customer| customer.company_id != company_id);
        counts.customers = (before - state.customers.len()) as u64;

        Ok(counts)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

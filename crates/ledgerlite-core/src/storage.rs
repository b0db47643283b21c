use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    models::{
        Account, Company, Customer, DateRange, Invoice, InvoiceFilter, InvoiceItem, InvoiceStatus,
        JournalEntry, JournalLine, OtpChallenge, PostedEntry, PurgeCounts, Session, User,
    },
    standards::AccountCategory,
};

/// Entry point of a storage backend. All reads and writes happen inside a
/// [`LedgerTx`]; nothing a transaction wrote is visible until it commits.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>>;
}

/// One atomic unit of work. Dropping a transaction without calling
/// [`LedgerTx::commit`] rolls it back.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_user_by_phone(&mut self, phone: &str) -> anyhow::Result<Option<User>>;
    async fn get_user(&mut self, user_id: Uuid) -> anyhow::Result<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> anyhow::Result<()>;

    async fn upsert_otp(&mut self, challenge: &OtpChallenge) -> anyhow::Result<()>;
    async fn find_otp(&mut self, phone: &str) -> anyhow::Result<Option<OtpChallenge>>;
    async fn delete_otp(&mut self, phone: &str) -> anyhow::Result<()>;

    async fn insert_session(&mut self, session: &Session) -> anyhow::Result<()>;
    async fn find_session(&mut self, token_hash: &str) -> anyhow::Result<Option<Session>>;
    async fn delete_session(&mut self, token_hash: &str) -> anyhow::Result<()>;

    /// Returns `false` without writing when the owner already has a company.
    async fn insert_company(&mut self, company: &Company) -> anyhow::Result<bool>;
    async fn find_company_by_owner(&mut self, user_id: Uuid) -> anyhow::Result<Option<Company>>;
    /// Returns the next invoice sequence number and advances the counter. The
    /// company row stays locked until the transaction ends.
    async fn allocate_invoice_number(&mut self, company_id: Uuid) -> anyhow::Result<i64>;

    async fn list_accounts(&mut self, company_id: Uuid) -> anyhow::Result<Vec<Account>>;
    /// Inserts the account unless one already exists for its category and
    /// returns whichever row is stored.
    async fn insert_account_if_missing(&mut self, account: &Account) -> anyhow::Result<Account>;
    async fn find_account(
        &mut self,
        company_id: Uuid,
        category: AccountCategory,
    ) -> anyhow::Result<Option<Account>>;

    async fn find_customer_by_name(
        &mut self,
        company_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Customer>>;
    /// Returns `false` without writing when the company already has a
    /// customer of that name.
    async fn insert_customer(&mut self, customer: &Customer) -> anyhow::Result<bool>;
    async fn list_customers(&mut self, company_id: Uuid) -> anyhow::Result<Vec<Customer>>;

    async fn insert_invoice(
        &mut self,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> anyhow::Result<()>;
    async fn find_invoice(
        &mut self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> anyhow::Result<Option<Invoice>>;
    /// Reads an invoice and holds it against concurrent status changes until
    /// the transaction ends.
    async fn lock_invoice(
        &mut self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> anyhow::Result<Option<Invoice>>;
    async fn list_invoices(
        &mut self,
        company_id: Uuid,
        filter: &InvoiceFilter,
    ) -> anyhow::Result<Vec<Invoice>>;
    async fn list_invoice_items(&mut self, invoice_id: Uuid) -> anyhow::Result<Vec<InvoiceItem>>;
    async fn update_invoice_status(&mut self, invoice: &Invoice) -> anyhow::Result<()>;
    /// Deletes the invoice and its items; linked journal entries keep their
    /// document number and lose the foreign key.
    async fn delete_invoice(&mut self, invoice_id: Uuid) -> anyhow::Result<()>;
    async fn list_invoices_due_before(
        &mut self,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Invoice>>;

    /// Persists an entry and its lines. Implementations reject unbalanced lines.
    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> anyhow::Result<()>;
    async fn list_journal(
        &mut self,
        company_id: Uuid,
        range: &DateRange,
    ) -> anyhow::Result<Vec<PostedEntry>>;
    async fn list_journal_for_invoice(
        &mut self,
        invoice_id: Uuid,
    ) -> anyhow::Result<Vec<PostedEntry>>;
    async fn update_entry_date(&mut self, entry_id: Uuid, date: NaiveDate) -> anyhow::Result<()>;
    async fn delete_journal_entries(&mut self, entry_ids: &[Uuid]) -> anyhow::Result<u64>;

    async fn find_sync_receipt(
        &mut self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> anyhow::Result<Option<Uuid>>;
    /// Claims `client_id` for `entry_id`. Returns `false` when another
    /// transaction already claimed it; the caller must then discard its work.
    async fn insert_sync_receipt(
        &mut self,
        company_id: Uuid,
        client_id: Uuid,
        entry_id: Uuid,
    ) -> anyhow::Result<bool>;

    async fn purge_company_financials(&mut self, company_id: Uuid) -> anyhow::Result<PurgeCounts>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

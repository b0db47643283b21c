use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ledgerlite_core::{
    Account, AccountCategory, Company, Customer, DateRange, Invoice, InvoiceFilter, InvoiceItem,
    InvoiceStatus, JournalEntry, JournalLine, LedgerError, LedgerStore, LedgerTx, OtpChallenge,
    PostedEntry, PurgeCounts, Session, User, ensure_balanced,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../migrations/0001_ledgerlite.sql");

const INVOICE_COLUMNS: &str = "id, company_id, customer_id, number, issue_date, due_date, status, \
     subtotal, vat_rate, vat_amount, total, notes, paid_at, created_at";

const ENTRY_COLUMNS: &str = "id, company_id, entry_date, reference, narration, status, source, \
     invoice_id, document_number, created_at";

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates any missing tables and indexes. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("ledger schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    async fn attach_lines(&mut self, entries: Vec<JournalEntry>) -> Result<Vec<PostedEntry>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let entry_ids: Vec<Uuid> = entries.iter().map(|entry| entry.id).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, entry_id, account_id, debit, credit, memo
            FROM journal_lines
            WHERE entry_id = ANY($1)
            ORDER BY entry_id, position
            "#,
        )
        .bind(&entry_ids[..])
        .fetch_all(&mut *self.tx)
        .await?;

        let mut lines_by_entry: HashMap<Uuid, Vec<JournalLine>> = HashMap::new();
        for row in rows {
            let line = line_from_row(&row)?;
            lines_by_entry.entry(line.entry_id).or_default().push(line);
        }

        Ok(entries
            .into_iter()
            .map(|entry| {
                let lines = lines_by_entry.remove(&entry.id).unwrap_or_default();
                PostedEntry { entry, lines }
            })
            .collect())
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, phone, display_name, created_at FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user(&mut self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, phone, display_name, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, phone, display_name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.phone)
        .bind(&user.display_name)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn upsert_otp(&mut self, challenge: &OtpChallenge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_challenges (phone, code_hash, attempts, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (phone) DO UPDATE
            SET code_hash = EXCLUDED.code_hash,
                attempts = EXCLUDED.attempts,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&challenge.phone)
        .bind(&challenge.code_hash)
        .bind(challenge.attempts)
        .bind(challenge.expires_at)
        .bind(challenge.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_otp(&mut self, phone: &str) -> Result<Option<OtpChallenge>> {
        let row = sqlx::query(
            r#"
            SELECT phone, code_hash, attempts, expires_at, created_at
            FROM otp_challenges
            WHERE phone = $1
            FOR UPDATE
            "#,
        )
        .bind(phone)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(OtpChallenge {
            phone: row.try_get("phone")?,
            code_hash: row.try_get("code_hash")?,
            attempts: row.try_get("attempts")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn delete_otp(&mut self, phone: &str) -> Result<()> {
        sqlx::query("DELETE FROM otp_challenges WHERE phone = $1")
            .bind(phone)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_session(&mut self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_session(&mut self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Session {
            token_hash: row.try_get("token_hash")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }

    async fn delete_session(&mut self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_company(&mut self, company: &Company) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO companies (
                id, owner_user_id, name, invoice_prefix, currency, next_invoice_number, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (owner_user_id) DO NOTHING
            "#,
        )
        .bind(company.id)
        .bind(company.owner_user_id)
        .bind(&company.name)
        .bind(&company.invoice_prefix)
        .bind(&company.currency)
        .bind(company.next_invoice_number)
        .bind(company.created_at)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn find_company_by_owner(&mut self, user_id: Uuid) -> Result<Option<Company>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_user_id, name, invoice_prefix, currency, next_invoice_number, created_at
            FROM companies
            WHERE owner_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Company {
            id: row.try_get("id")?,
            owner_user_id: row.try_get("owner_user_id")?,
            name: row.try_get("name")?,
            invoice_prefix: row.try_get("invoice_prefix")?,
            currency: row.try_get("currency")?,
            next_invoice_number: row.try_get("next_invoice_number")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn allocate_invoice_number(&mut self, company_id: Uuid) -> Result<i64> {
        let allocated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE companies
            SET next_invoice_number = next_invoice_number + 1
            WHERE id = $1
            RETURNING next_invoice_number - 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(allocated.ok_or(LedgerError::NotFound("company"))?)
    }

    async fn list_accounts(&mut self, company_id: Uuid) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, code, name, account_type, category, created_at
            FROM accounts
            WHERE company_id = $1
            ORDER BY code
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn insert_account_if_missing(&mut self, account: &Account) -> Result<Account> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, company_id, code, name, account_type, category, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (company_id, category) DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(account.company_id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.category.as_str())
        .bind(account.created_at)
        .execute(&mut *self.tx)
        .await?;

        self.find_account(account.company_id, account.category)
            .await?
            .ok_or_else(|| anyhow::anyhow!("account {} vanished after insert", account.code))
    }

    async fn find_account(
        &mut self,
        company_id: Uuid,
        category: AccountCategory,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, code, name, account_type, category, created_at
            FROM accounts
            WHERE company_id = $1 AND category = $2
            "#,
        )
        .bind(company_id)
        .bind(category.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_customer_by_name(
        &mut self,
        company_id: Uuid,
        name: &str,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, name, email, phone, created_at
            FROM customers
            WHERE company_id = $1 AND name = $2
            "#,
        )
        .bind(company_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO customers (id, company_id, name, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company_id, name) DO NOTHING
            "#,
        )
        .bind(customer.id)
        .bind(customer.company_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn list_customers(&mut self, company_id: Uuid) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, name, email, phone, created_at
            FROM customers
            WHERE company_id = $1
            ORDER BY name
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(customer_from_row).collect()
    }

    async fn insert_invoice(&mut self, invoice: &Invoice, items: &[InvoiceItem]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, company_id, customer_id, number, issue_date, due_date, status,
                subtotal, vat_rate, vat_amount, total, notes, paid_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.company_id)
        .bind(invoice.customer_id)
        .bind(&invoice.number)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.status.as_str())
        .bind(invoice.subtotal)
        .bind(invoice.vat_rate)
        .bind(invoice.vat_amount)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, position, description, quantity, unit_price, amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(item.invoice_id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.amount)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_invoice(&mut self, company_id: Uuid, invoice_id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND company_id = $2"
        ))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn lock_invoice(&mut self, company_id: Uuid, invoice_id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND company_id = $2 FOR UPDATE"
        ))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn list_invoices(
        &mut self,
        company_id: Uuid,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Invoice>> {
        let range = filter.range.unwrap_or_default();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR issue_date >= $3)
              AND ($4::date IS NULL OR issue_date <= $4)
            ORDER BY issue_date DESC, number DESC
            "#
        ))
        .bind(company_id)
        .bind(filter.status.map(|status| status.as_str()))
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(invoice_from_row).collect()
    }

    async fn list_invoice_items(&mut self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_id, description, quantity, unit_price, amount
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(InvoiceItem {
                    id: row.try_get("id")?,
                    invoice_id: row.try_get("invoice_id")?,
                    description: row.try_get("description")?,
                    quantity: row.try_get("quantity")?,
                    unit_price: row.try_get("unit_price")?,
                    amount: row.try_get("amount")?,
                })
            })
            .collect()
    }

    async fn update_invoice_status(&mut self, invoice: &Invoice) -> Result<()> {
        let result = sqlx::query("UPDATE invoices SET status = $2, paid_at = $3 WHERE id = $1")
            .bind(invoice.id)
            .bind(invoice.status.as_str())
            .bind(invoice.paid_at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("invoice").into());
        }
        Ok(())
    }

    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_invoices_due_before(
        &mut self,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> Result<Vec<Invoice>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = $1 AND due_date < $2 FOR UPDATE"
        ))
        .bind(status.as_str())
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(invoice_from_row).collect()
    }

    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> Result<()> {
        ensure_balanced(lines)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO journal_entries ({ENTRY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#
        ))
        .bind(entry.id)
        .bind(entry.company_id)
        .bind(entry.entry_date)
        .bind(&entry.reference)
        .bind(&entry.narration)
        .bind(entry.status.as_str())
        .bind(entry.source.as_str())
        .bind(entry.invoice_id)
        .bind(&entry.document_number)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO journal_lines (id, entry_id, account_id, position, debit, credit, memo)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(line.id)
            .bind(entry.id)
            .bind(line.account_id)
            .bind(position as i32)
            .bind(line.debit)
            .bind(line.credit)
            .bind(&line.memo)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn list_journal(&mut self, company_id: Uuid, range: &DateRange) -> Result<Vec<PostedEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entries
            WHERE company_id = $1
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            ORDER BY entry_date, created_at, id
            "#
        ))
        .bind(company_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *self.tx)
        .await?;

        let entries = rows.iter().map(entry_from_row).collect::<Result<Vec<_>>>()?;
        self.attach_lines(entries).await
    }

    async fn list_journal_for_invoice(&mut self, invoice_id: Uuid) -> Result<Vec<PostedEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entries
            WHERE invoice_id = $1
            ORDER BY entry_date, created_at, id
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let entries = rows.iter().map(entry_from_row).collect::<Result<Vec<_>>>()?;
        self.attach_lines(entries).await
    }

    async fn update_entry_date(&mut self, entry_id: Uuid, date: NaiveDate) -> Result<()> {
        let result = sqlx::query("UPDATE journal_entries SET entry_date = $2 WHERE id = $1")
            .bind(entry_id)
            .bind(date)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("journal entry").into());
        }
        Ok(())
    }

    async fn delete_journal_entries(&mut self, entry_ids: &[Uuid]) -> Result<u64> {
        if entry_ids.is_empty() {
            return Ok(0);
        }

        sqlx::query("DELETE FROM journal_lines WHERE entry_id = ANY($1)")
            .bind(entry_ids)
            .execute(&mut *self.tx)
            .await?;
        let result = sqlx::query("DELETE FROM journal_entries WHERE id = ANY($1)")
            .bind(entry_ids)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_sync_receipt(&mut self, company_id: Uuid, client_id: Uuid) -> Result<Option<Uuid>> {
        let entry_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT entry_id FROM sync_receipts WHERE company_id = $1 AND client_id = $2",
        )
        .bind(company_id)
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(entry_id)
    }

    async fn insert_sync_receipt(
        &mut self,
        company_id: Uuid,
        client_id: Uuid,
        entry_id: Uuid,
    ) -> Result<bool> {
        // Waits for a concurrent claim of the same key to commit or roll back.
        let inserted = sqlx::query(
            r#"
            INSERT INTO sync_receipts (company_id, client_id, entry_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id, client_id) DO NOTHING
            "#,
        )
        .bind(company_id)
        .bind(client_id)
        .bind(entry_id)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn purge_company_financials(&mut self, company_id: Uuid) -> Result<PurgeCounts> {
        let journal_lines = sqlx::query(
            r#"
            DELETE FROM journal_lines
            WHERE entry_id IN (SELECT id FROM journal_entries WHERE company_id = $1)
            "#,
        )
        .bind(company_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        let journal_entries = sqlx::query("DELETE FROM journal_entries WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        let sync_receipts = sqlx::query("DELETE FROM sync_receipts WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        let invoice_items = sqlx::query(
            r#"
            DELETE FROM invoice_items
            WHERE invoice_id IN (SELECT id FROM invoices WHERE company_id = $1)
            "#,
        )
        .bind(company_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        let invoices = sqlx::query("DELETE FROM invoices WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        let customers = sqlx::query("DELETE FROM customers WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(PurgeCounts {
            journal_lines,
            journal_entries,
            invoice_items,
            invoices,
            customers,
            sync_receipts,
        })
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        phone: row.try_get("phone")?,
        display_name: row.try_get("display_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let account_type: String = row.try_get("account_type")?;
    let category: String = row.try_get("category")?;
    Ok(Account {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        account_type: account_type.parse()?,
        category: category.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer> {
    Ok(Customer {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice> {
    let status: String = row.try_get("status")?;
    let paid_at: Option<DateTime<Utc>> = row.try_get("paid_at")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        customer_id: row.try_get("customer_id")?,
        number: row.try_get("number")?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        status: status.parse()?,
        subtotal: row.try_get("subtotal")?,
        vat_rate: row.try_get("vat_rate")?,
        vat_amount: row.try_get("vat_amount")?,
        total: row.try_get("total")?,
        notes: row.try_get("notes")?,
        paid_at,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<JournalEntry> {
    let status: String = row.try_get("status")?;
    let source: String = row.try_get("source")?;
    Ok(JournalEntry {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        entry_date: row.try_get("entry_date")?,
        reference: row.try_get("reference")?,
        narration: row.try_get("narration")?,
        status: status.parse()?,
        source: source.parse()?,
        invoice_id: row.try_get("invoice_id")?,
        document_number: row.try_get("document_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn line_from_row(row: &PgRow) -> Result<JournalLine> {
    Ok(JournalLine {
        id: row.try_get("id")?,
        entry_id: row.try_get("entry_id")?,
        account_id: row.try_get("account_id")?,
        debit: row.try_get("debit")?,
        credit: row.try_get("credit")?,
        memo: row.try_get("memo")?,
    })
}

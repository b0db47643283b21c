//! Bookkeeping rules of LedgerLite: how business events become balanced
//! journal entries, and the service that posts them atomically.

pub mod classify;
pub mod cleanup;
pub mod invoicing;
pub mod journal;
pub mod posting;
pub mod reports;
pub mod service;

pub use classify::{TransactionKind, infer_kind};
pub use cleanup::{CleanupAction, CleanupReport, DateMismatch, OrphanGroup, month_range};
pub use invoicing::{InvoiceAmounts, InvoiceLineInput, compute_amounts, format_invoice_number};
pub use journal::{AccountBook, JournalDraft, money};
pub use posting::{CashMovement, PaymentMethod};
pub use reports::{
    AccountBalance, Dashboard, Period, RevenueSummary, TransactionView, TrialBalance, month_key,
    resolve_range,
};
pub use service::{
    CleanupOutcome, CleanupRequest, DeletionOutcome, InvoiceDetail, LedgerService, NewCompany,
    NewCustomer, NewInvoice, NewPersonalExpense, NewTransaction, Recorded, StatusChange,
    StatusOutcome, SyncCommand, SyncResult, SyncStatus,
};

pub mod error;
pub mod events;
pub mod models;
pub mod standards;
pub mod storage;

pub use error::LedgerError;
pub use events::{EventPublisher, LEDGER_POSTED_CHANNEL, LedgerEvent};
pub use models::{
    Account, AccountType, Company, Customer, DateRange, EntrySource, EntryStatus, Invoice,
    InvoiceFilter, InvoiceItem, InvoiceStatus, JournalEntry, JournalLine, OtpChallenge,
    PostedEntry, PurgeCounts, Session, User, ensure_balanced,
};
pub use standards::{AccountCategory, AccountTemplate, SmallBusinessProfile, StandardsProfile};
pub use storage::{LedgerStore, LedgerTx};

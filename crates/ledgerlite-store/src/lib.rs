//! Storage backends for the ledger.
//!
//! - [`InMemoryStore`]: process-local, used by tests and when no database is configured
//! - [`PgLedgerStore`]: PostgreSQL through sqlx, with the schema applied by [`PgLedgerStore::migrate`]

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgLedgerStore;

pub mod companies;
pub mod invoices;
pub mod reports;
pub mod transactions;

use chrono::{NaiveDate, Utc};
use ledgerlite_core::LedgerError;
use ledgerlite_finance::PaymentMethod;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Missing or blank means cash.
fn payment_method(raw: Option<&str>) -> Result<PaymentMethod, LedgerError> {
    raw.unwrap_or_default().parse()
}

use ledgerlite_core::{AccountType, PostedEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::journal::AccountBook;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Other,
}

/// Reads the direction of money from the accounts an entry touches: revenue
/// means income, expense means expense, otherwise cash leaving is an expense
/// and cash arriving is income.
pub fn infer_kind(posted: &PostedEntry, book: &AccountBook) -> TransactionKind {
    let accounts: Vec<_> = posted
        .lines
        .iter()
        .filter_map(|line| book.by_id(line.account_id).map(|account| (line, account)))
        .collect();

    if accounts
        .iter()
        .any(|(_, account)| account.account_type == AccountType::Revenue)
    {
        return TransactionKind::Income;
    }
    if accounts
        .iter()
        .any(|(_, account)| account.account_type == AccountType::Expense)
    {
        return TransactionKind::Expense;
    }

    let money_net: Decimal = accounts
        .iter()
        .filter(|(_, account)| account.category.is_money())
        .map(|(line, _)| line.debit - line.credit)
        .sum();

    if money_net < Decimal::ZERO {
        TransactionKind::Expense
    } else if money_net > Decimal::ZERO {
        TransactionKind::Income
    } else {
        TransactionKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use ledgerlite_core::{
        Account, AccountCategory, Invoice, InvoiceStatus, SmallBusinessProfile, StandardsProfile,
    };
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::posting::{CashMovement, PaymentMethod, cash_movement, invoice_issued};

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

    fn movement(book: &AccountBook, kind: CashMovement, amount: rust_decimal::Decimal) -> PostedEntry {
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let draft = cash_movement(
            book,
            kind,
            PaymentMethod::Bank,
            amount,
            date,
            "REF".to_string(),
            "narration".to_string(),
            "",
        )
        .unwrap();
        let (entry, lines) = draft.into_posting(Uuid::nil()).unwrap();
        PostedEntry { entry, lines }
    }

    #[test]
    fn inference_matches_recorded_kind() {
        let book = book();
        for step in 1..=50 {
            let amount = dec!(13.37) * rust_decimal::Decimal::from(step);
            assert_eq!(
                infer_kind(&movement(&book, CashMovement::Sale, amount), &book),
                TransactionKind::Income
            );
            assert_eq!(
                infer_kind(&movement(&book, CashMovement::Expense, amount), &book),
                TransactionKind::Expense
            );
            assert_eq!(
                infer_kind(&movement(&book, CashMovement::PersonalExpense, amount), &book),
                TransactionKind::Expense
            );
        }
    }

    #[test]
    fn invoice_issuance_is_neither() {
        let book = book();
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            customer_id: Uuid::new_v4(),
            number: "INV-0001".to_string(),
            issue_date: date,
            due_date: date,
            status: InvoiceStatus::Draft,
            subtotal: dec!(100),
            vat_rate: dec!(0),
            vat_amount: dec!(0),
            total: dec!(100),
            notes: None,
            paid_at: None,
            created_at: Utc::now(),
        };
        let (entry, lines) = invoice_issued(&book, &invoice)
            .unwrap()
            .into_posting(Uuid::nil())
            .unwrap();

        assert_eq!(
            infer_kind(&PostedEntry { entry, lines }, &book),
            TransactionKind::Other
        );
        assert!(book.get(AccountCategory::Receivable).is_ok());
    }
}

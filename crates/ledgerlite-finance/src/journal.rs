use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use ledgerlite_core::{
    Account, AccountCategory, EntrySource, EntryStatus, JournalEntry, JournalLine, LedgerError,
    ensure_balanced,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest amount a single line, invoice or movement may carry.
// 9_999_999_999_999_999 scaled by 2, built with the const constructor.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 2);

/// Rounds a monetary amount to kobo/cents, halves away from zero.
pub fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The accounts of one company, addressable by category and by id.
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    by_category: HashMap<AccountCategory, Account>,
}

impl AccountBook {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            by_category: accounts
                .into_iter()
                .map(|account| (account.category, account))
                .collect(),
        }
    }

    pub fn get(&self, category: AccountCategory) -> Result<&Account, LedgerError> {
        self.by_category
            .get(&category)
            .ok_or(LedgerError::NotFound("ledger account"))
    }

    pub fn by_id(&self, account_id: Uuid) -> Option<&Account> {
        self.by_category
            .values()
            .find(|account| account.id == account_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.by_category.values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub memo: Option<String>,
}

/// A journal entry under construction. Lines with a zero amount are dropped,
/// so optional legs such as VAT can be added unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalDraft {
    pub entry_date: NaiveDate,
    pub reference: String,
    pub narration: String,
    pub source: EntrySource,
    pub invoice_id: Option<Uuid>,
    pub document_number: Option<String>,
    pub lines: Vec<DraftLine>,
}

impl JournalDraft {
    pub fn new(
        entry_date: NaiveDate,
        reference: impl Into<String>,
        narration: impl Into<String>,
        source: EntrySource,
    ) -> Self {
        Self {
            entry_date,
            reference: reference.into(),
            narration: narration.into(),
            source,
            invoice_id: None,
            document_number: None,
            lines: Vec::new(),
        }
    }

    pub fn for_document(mut self, invoice_id: Option<Uuid>, number: &str) -> Self {
        self.invoice_id = invoice_id;
        self.document_number = Some(number.to_string());
        self
    }

    pub fn debit(self, account: &Account, amount: Decimal, memo: &str) -> Self {
        self.signed(account.id, money(amount), memo)
    }

    pub fn credit(self, account: &Account, amount: Decimal, memo: &str) -> Self {
        self.signed(account.id, -money(amount), memo)
    }

    /// Positive amounts debit the account, negative amounts credit it.
    pub fn signed(mut self, account_id: Uuid, amount: Decimal, memo: &str) -> Self {
        if amount.is_zero() {
            return self;
        }

        let (debit, credit) = if amount > Decimal::ZERO {
            (amount, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -amount)
        };
        self.lines.push(DraftLine {
            account_id,
            debit,
            credit,
            memo: Some(memo.to_string()).filter(|memo| !memo.is_empty()),
        });
        self
    }

    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    /// Turns the draft into rows ready for a store, refusing anything that
    /// does not balance.
    pub fn into_posting(
        self,
        company_id: Uuid,
    ) -> Result<(JournalEntry, Vec<JournalLine>), LedgerError> {
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            company_id,
            entry_date: self.entry_date,
            reference: self.reference,
            narration: self.narration,
            status: EntryStatus::Posted,
            source: self.source,
            invoice_id: self.invoice_id,
            document_number: self.document_number,
            created_at: Utc::now(),
        };

        let lines: Vec<JournalLine> = self
            .lines
            .into_iter()
            .map(|line| JournalLine {
                id: Uuid::new_v4(),
                entry_id: entry.id,
                account_id: line.account_id,
                debit: line.debit,
                credit: line.credit,
                memo: line.memo,
            })
            .collect();

        ensure_balanced(&lines)?;
        Ok((entry, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlite_core::AccountType;
    use rust_decimal_macros::dec;

    fn account(category: AccountCategory, account_type: AccountType) -> Account {
        Account {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            code: category.as_str().to_string(),
            name: category.as_str().to_string(),
            account_type,
            category,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(money(dec!(0.125)), dec!(0.13));
        assert_eq!(money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(money(dec!(10)), dec!(10));
    }

    #[test]
    fn zero_legs_are_dropped() {
        let cash = account(AccountCategory::Cash, AccountType::Asset);
        let sales = account(AccountCategory::Sales, AccountType::Revenue);
        let vat = account(AccountCategory::VatPayable, AccountType::Liability);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let draft = JournalDraft::new(date, "SAL-1", "Walk-in sale", EntrySource::Sale)
            .debit(&cash, dec!(2500), "")
            .credit(&sales, dec!(2500), "")
            .credit(&vat, Decimal::ZERO, "VAT");

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].memo, None);
        let (entry, lines) = draft.into_posting(Uuid::new_v4()).unwrap();
        assert!(lines.iter().all(|line| line.entry_id == entry.id));
    }

    #[test]
    fn unbalanced_draft_is_refused() {
        let cash = account(AccountCategory::Cash, AccountType::Asset);
        let sales = account(AccountCategory::Sales, AccountType::Revenue);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let result = JournalDraft::new(date, "SAL-2", "Short", EntrySource::Sale)
            .debit(&cash, dec!(100), "")
            .credit(&sales, dec!(99.99), "")
            .into_posting(Uuid::new_v4());

        assert_eq!(
            result.unwrap_err(),
            LedgerError::Unbalanced {
                debits: dec!(100),
                credits: dec!(99.99)
            }
        );
    }

    #[test]
    fn book_resolves_by_category_and_id() {
        let cash = account(AccountCategory::Cash, AccountType::Asset);
        let book = AccountBook::new(vec![cash.clone()]);
        assert_eq!(book.get(AccountCategory::Cash).unwrap().id, cash.id);
        assert_eq!(book.by_id(cash.id).map(|account| account.category), Some(AccountCategory::Cash));
        assert!(book.get(AccountCategory::Sales).is_err());
    }
}

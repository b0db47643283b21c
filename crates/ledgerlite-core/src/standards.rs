use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::LedgerError, models::AccountType};

/// Fixed role of a ledger account within a company's chart. Postings address
/// accounts by category; there is at most one account per category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Cash,
    Bank,
    Receivable,
    VatPayable,
    DeferredRevenue,
    OwnerEquity,
    Drawings,
    Sales,
    Expense,
}

impl AccountCategory {
    pub const ALL: [AccountCategory; 9] = [
        Self::Cash,
        Self::Bank,
        Self::Receivable,
        Self::VatPayable,
        Self::DeferredRevenue,
        Self::OwnerEquity,
        Self::Drawings,
        Self::Sales,
        Self::Expense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Receivable => "receivable",
            Self::VatPayable => "vat_payable",
            Self::DeferredRevenue => "deferred_revenue",
            Self::OwnerEquity => "owner_equity",
            Self::Drawings => "drawings",
            Self::Sales => "sales",
            Self::Expense => "expense",
        }
    }

    /// Cash-like categories money moves in and out of.
    pub fn is_money(&self) -> bool {
        matches!(self, Self::Cash | Self::Bank)
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountCategory {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value.trim())
            .ok_or_else(|| LedgerError::validation(format!("unknown account category {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountTemplate {
    pub category: AccountCategory,
    pub code: &'static str,
    pub name: &'static str,
    pub account_type: AccountType,
}

pub trait StandardsProfile {
    fn name(&self) -> &'static str;
    fn chart_of_accounts(&self) -> Vec<AccountTemplate>;
    fn default_vat_rate(&self) -> Decimal;

    fn template(&self, category: AccountCategory) -> AccountTemplate {
        self.chart_of_accounts()
            .into_iter()
            .find(|template| template.category == category)
            .unwrap_or_else(|| fallback_template(category))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmallBusinessProfile;

impl StandardsProfile for SmallBusinessProfile {
    fn name(&self) -> &'static str {
        "small-business"
    }

    fn chart_of_accounts(&self) -> Vec<AccountTemplate> {
        AccountCategory::ALL
            .into_iter()
            .map(fallback_template)
            .collect()
    }

    fn default_vat_rate(&self) -> Decimal {
        Decimal::new(75, 1) // 7.5%
    }
}

fn fallback_template(category: AccountCategory) -> AccountTemplate {
    let (code, name, account_type) = match category {
        AccountCategory::Cash => ("1000", "Cash", AccountType::Asset),
        AccountCategory::Bank => ("1010", "Bank", AccountType::Asset),
        AccountCategory::Receivable => ("1100", "Accounts Receivable", AccountType::Asset),
        AccountCategory::VatPayable => ("2100", "VAT Payable", AccountType::Liability),
        AccountCategory::DeferredRevenue => ("2200", "Deferred Revenue", AccountType::Liability),
        AccountCategory::OwnerEquity => ("3000", "Owner's Equity", AccountType::Equity),
        AccountCategory::Drawings => ("3100", "Owner's Drawings", AccountType::Equity),
        AccountCategory::Sales => ("4000", "Sales Revenue", AccountType::Revenue),
        AccountCategory::Expense => ("5000", "Operating Expenses", AccountType::Expense),
    };

    AccountTemplate {
        category,
        code,
        name,
        account_type,
    }
}

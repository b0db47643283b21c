use ledgerlite_core::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::journal::{MAX_AMOUNT, money};

const MAX_PREFIX_LEN: usize = 10;
const RATIO_DP: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceAmounts {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub vat_rate: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

/// Prices invoice lines and applies VAT at `vat_rate` percent of the subtotal.
/// Quantities and the rate keep four decimal places, money keeps two.
pub fn compute_amounts(
    lines: &[InvoiceLineInput],
    vat_rate: Decimal,
) -> Result<InvoiceAmounts, LedgerError> {
    let too_large = || LedgerError::validation("invoice amounts are too large");

    if lines.is_empty() {
        return Err(LedgerError::validation("an invoice needs at least one item"));
    }
    let vat_rate = ratio(vat_rate);
    if vat_rate < Decimal::ZERO || vat_rate > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation("vat_rate must be between 0 and 100"));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        let description = line.description.trim();
        if description.is_empty() {
            return Err(LedgerError::validation("item description is required"));
        }
        let quantity = ratio(line.quantity);
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::validation("item quantity must be positive"));
        }
        let unit_price = money(line.unit_price);
        if unit_price < Decimal::ZERO {
            return Err(LedgerError::validation("item unit_price cannot be negative"));
        }
        if quantity > MAX_AMOUNT || unit_price > MAX_AMOUNT {
            return Err(too_large());
        }

        let amount = quantity
            .checked_mul(unit_price)
            .map(money)
            .filter(|amount| *amount <= MAX_AMOUNT)
            .ok_or_else(too_large)?;
        subtotal = subtotal.checked_add(amount).ok_or_else(too_large)?;

        priced.push(PricedLine {
            description: description.to_string(),
            quantity,
            unit_price,
            amount,
        });
    }

    if subtotal <= Decimal::ZERO {
        return Err(LedgerError::validation("invoice subtotal must be positive"));
    }

    let vat_amount = subtotal
        .checked_mul(vat_rate)
        .map(|gross| money(gross / Decimal::ONE_HUNDRED))
        .ok_or_else(too_large)?;
    let total = subtotal
        .checked_add(vat_amount)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(too_large)?;

    Ok(InvoiceAmounts {
        lines: priced,
        subtotal,
        vat_rate,
        vat_amount,
        total,
    })
}

fn ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATIO_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `INV` + 7 → `INV-0007`. Sequences past 9999 simply grow wider.
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence:04}")
}

pub fn normalize_prefix(prefix: &str) -> Result<String, LedgerError> {
    let normalized = prefix.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(LedgerError::validation("invoice_prefix is required"));
    }
    if normalized.len() > MAX_PREFIX_LEN
        || !normalized.chars().all(|character| character.is_ascii_alphanumeric())
    {
        return Err(LedgerError::validation(
            "invoice_prefix must be up to 10 letters or digits",
        ));
    }
    Ok(normalized)
}

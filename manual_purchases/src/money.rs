//! Currency-aware handling of operator-typed amounts.

use common::config::StoreConfig;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

use crate::form::sanitize_text_field;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{0}' is not a valid amount")]
pub struct InvalidAmount(pub String);

/// Number format of the store currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyFormat {
    pub currency: String,
    pub decimals: u32,
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl CurrencyFormat {
    pub fn from_store(store: &StoreConfig) -> Self {
        Self {
            currency: store.currency.clone(),
            decimals: store.decimals,
            thousands_separator: store.thousands_separator,
            decimal_separator: store.decimal_separator,
        }
    }

    /// Rounds to the currency precision, half away from zero.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Parses a typed amount such as `"$1,234.50"` or `"1.234,50 €"`.
    ///
    /// Tags and surrounding whitespace are stripped, currency symbols and
    /// thousands separators dropped and the result rounded to the currency
    /// precision. Blank input is `Ok(None)`. Input with no parsable number, a
    /// negative value or one too large to represent is an error.
    pub fn sanitize_amount(&self, raw: &str) -> Result<Option<Decimal>, InvalidAmount> {
        let cleaned = sanitize_text_field(raw);
        if cleaned.is_empty() {
            return Ok(None);
        }

        let mut normalized = String::with_capacity(cleaned.len());
        for c in cleaned.chars() {
            if c.is_ascii_digit() {
                normalized.push(c);
            } else if c == self.decimal_separator {
                normalized.push('.');
            } else if c == '-' && normalized.is_empty() {
                normalized.push(c);
            }
            // Grouping separators and currency symbols are dropped.
        }

        if !normalized.chars().any(|c| c.is_ascii_digit()) {
            return Err(InvalidAmount(raw.to_string()));
        }

        let amount = Decimal::from_str(&normalized).map_err(|_| InvalidAmount(raw.to_string()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(InvalidAmount(raw.to_string()));
        }
        Ok(Some(self.round(amount)))
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CleanerError, Result};

/// Currencies a record can carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    #[serde(rename = "ARS")]
    Ars,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Ars => "ARS",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = CleanerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARS" => Ok(Currency::Ars),
            "USD" => Ok(Currency::Usd),
            other => Err(CleanerError::Validation(format!("invalid currency: {}", other))),
        }
    }
}

/// A normalized financial record
///
/// `amount` is negative for debits and positive for credits. `id` and
/// `created_at` stay `None` until the record has been stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        currency: Currency,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            date,
            description: description.into(),
            amount,
            currency,
            account_id: account_id.into(),
            category: None,
            created_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check the invariants every stored record must hold
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(CleanerError::Validation("description is required".to_string()));
        }
        if self.amount.is_zero() {
            return Err(CleanerError::Validation("amount cannot be zero".to_string()));
        }
        Ok(())
    }

    /// Canonical text of the amount, so `-3000` and `-3000.00` compare equal
    pub fn amount_key(&self) -> String {
        amount_key(self.amount)
    }
}

/// Canonical text form used to store and compare amounts
pub fn amount_key(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Records produced by one parse call
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub provider: String,
    /// Nominal currency of the export; records carry their own currency
    pub currency: Currency,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_by_currency(&self, currency: Currency) -> usize {
        self.records.iter().filter(|r| r.currency == currency).count()
    }
}

/// Sort key for record listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Date,
    Description,
}

impl FromStr for SortBy {
    type Err = CleanerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "description" => Ok(SortBy::Description),
            other => Err(CleanerError::Validation(format!(
                "invalid sort field '{}': use date or description",
                other
            ))),
        }
    }
}

/// Filter options for listing stored records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub account_id: Option<String>,
    pub currency: Option<Currency>,
    /// Inclusive lower bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end_date: Option<NaiveDate>,
    pub sort_by: SortBy,
    pub ascending: bool,
}

//! Error handling for the statement importers
//!
//! Library code returns [`CleanerError`] so callers can tell a malformed file
//! apart from a persistence failure. The binary wraps these in `anyhow` for
//! context chaining.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Core error types for parsing and persisting records
#[derive(Error, Debug)]
pub enum CleanerError {
    /// The file does not have the expected shape (rows, columns, sheets)
    #[error("structural error: {0}")]
    Structural(String),

    /// A single field (date or amount) could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    #[error(
        "duplicate record: a record dated {date} with description '{description}' and amount {amount} already exists"
    )]
    Duplicate {
        date: NaiveDate,
        description: String,
        amount: Decimal,
    },

    #[error("sink error: {0}")]
    Sink(String),

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("unknown provider '{0}'. Available: santander, mercadopago")]
    UnknownProvider(String),

    #[error("record not found: {0}")]
    NotFound(i64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl CleanerError {
    /// True for errors that abort a whole parse rather than a single row
    pub fn is_structural(&self) -> bool {
        matches!(self, CleanerError::Structural(_))
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, CleanerError>;

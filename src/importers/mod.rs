// Import module - MercadoPago CSV and Santander Excel parsers

pub mod amount;
pub mod dates;
pub mod mercadopago_csv;
pub mod santander_excel;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::db::models::RecordBatch;
use crate::error::{CleanerError, Result};

pub use amount::parse_amount;
pub use dates::parse_date;
pub use mercadopago_csv::parse_mercadopago_csv;
pub use santander_excel::{parse_santander_excel, parse_santander_rows};

/// Export formats understood by the importers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Santander credit card statements (multi-section spreadsheet)
    Santander,
    /// MercadoPago account activity (CSV with metadata preamble)
    MercadoPago,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Santander, Provider::MercadoPago];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Santander => "santander",
            Provider::MercadoPago => "mercadopago",
        }
    }

    /// Parse an export of this provider into a batch of records
    pub fn parse<R: Read>(&self, reader: R, account_id: &str) -> Result<RecordBatch> {
        match self {
            Provider::Santander => parse_santander_excel(reader, account_id),
            Provider::MercadoPago => parse_mercadopago_csv(reader, account_id),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = CleanerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| CleanerError::UnknownProvider(s.trim().to_string()))
    }
}

/// Parse a provider export from disk
pub fn import_file<P: AsRef<Path>>(
    file_path: P,
    provider: Provider,
    account_id: &str,
) -> Result<RecordBatch> {
    let path = file_path.as_ref();
    info!("Importing {} file: {:?}", provider, path);

    let file = File::open(path)?;
    provider.parse(BufReader::new(file), account_id)
}

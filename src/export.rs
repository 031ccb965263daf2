//! CSV export of normalized records

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::db::models::{Currency, Record};
use crate::error::Result;

const STATEMENT_HEADER: [&str; 3] = ["date", "description", "amount"];
const RECORDS_HEADER: [&str; 6] = [
    "date",
    "description",
    "amount",
    "currency",
    "accountId",
    "category",
];

/// Write `date,description,amount` rows
///
/// Dates are `DD/MM/YYYY`; amounts keep their sign and significant digits.
pub fn write_statement_csv<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(STATEMENT_HEADER)?;
    for record in records {
        wtr.write_record([
            record.date.format("%d/%m/%Y").to_string(),
            record.description.clone(),
            record.amount.normalize().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write stored records with currency, account and category columns
pub fn write_records_csv<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RECORDS_HEADER)?;
    for record in records {
        wtr.write_record([
            record.date.format("%d/%m/%Y").to_string(),
            record.description.clone(),
            format!("{:.2}", record.amount),
            record.currency.to_string(),
            record.account_id.clone(),
            record.category.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Split records per currency, newest first
///
/// The sort is stable, so records sharing a date keep their input order.
pub fn group_by_currency(records: &[Record]) -> BTreeMap<Currency, Vec<Record>> {
    let mut groups: BTreeMap<Currency, Vec<Record>> = BTreeMap::new();
    for record in records {
        groups.entry(record.currency).or_default().push(record.clone());
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.date.cmp(&a.date));
    }
    groups
}

/// Substitute the lowercase currency code into a file name pattern
pub fn output_file_name(pattern: &str, currency: Currency) -> String {
    pattern.replace("{currency}", &currency.as_str().to_lowercase())
}

/// Write one statement file per currency present in `records`
///
/// Returns the written paths; currencies without records produce no file.
pub fn write_statement_files(
    records: &[Record],
    output_dir: &Path,
    pattern: &str,
) -> Result<Vec<(Currency, PathBuf)>> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    for (currency, group) in group_by_currency(records) {
        let path = output_dir.join(output_file_name(pattern, currency));
        let file = fs::File::create(&path)?;
        write_statement_csv(file, &group)?;
        info!("Wrote {} {} records to {:?}", group.len(), currency, path);
        written.push((currency, path));
    }

    Ok(written)
}

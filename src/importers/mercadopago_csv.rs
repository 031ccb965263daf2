use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use tracing::{debug, info, warn};

use super::{parse_amount, parse_date, Provider};
use crate::db::models::{Currency, Record, RecordBatch};
use crate::error::{CleanerError, Result};

/// Rows before the header are account metadata
const HEADER_ROW: usize = 3;
const MIN_ROWS: usize = HEADER_ROW + 2;

const TRANSFER_PREFIXES: [&str; 2] = ["Transferencia enviada", "Transferencia recibida"];

/// Parse a MercadoPago account activity CSV
///
/// Layout: three metadata rows, a header row, then one transaction per row.
/// A malformed release date aborts the whole file; a malformed amount only
/// skips its row.
pub fn parse_mercadopago_csv<R: Read>(mut reader: R, account_id: &str) -> Result<RecordBatch> {
    info!("Parsing MercadoPago CSV for account '{}'", account_id);

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let content = decode_content(&bytes);

    let delimiter = detect_separator(&content);
    debug!("Detected separator: {:?}", delimiter as char);

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true) // Metadata rows are shorter than data rows
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        if row.len() == 1 && row[0].is_empty() {
            continue;
        }
        rows.push(row);
    }

    if rows.len() < MIN_ROWS {
        return Err(CleanerError::Structural(format!(
            "invalid MercadoPago file: expected at least {} rows, got {}",
            MIN_ROWS,
            rows.len()
        )));
    }

    let mapping = ColumnMapping::from_header(&rows[HEADER_ROW])?;
    debug!("Column mapping: {:?}", mapping);

    let mut records = Vec::new();

    for (idx, row) in rows.iter().enumerate().skip(HEADER_ROW + 1) {
        // Error messages name the physical line, including dropped blank ones
        let row_num = row
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 1);
        if let Some(record) = parse_row(row, &mapping, account_id, row_num)? {
            records.push(record);
        }
    }

    info!(
        "Successfully parsed {} records from MercadoPago CSV",
        records.len()
    );

    Ok(RecordBatch {
        records,
        provider: Provider::MercadoPago.name().to_string(),
        currency: Currency::Ars,
    })
}

/// `;` when semicolons strictly outnumber commas, `,` otherwise
pub fn detect_separator(content: &str) -> u8 {
    let semicolons = content.matches(';').count();
    let commas = content.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn decode_content(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Content is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    };
    text.trim_start_matches('\u{feff}').to_string()
}

#[derive(Debug)]
struct ColumnMapping {
    release_date: usize,
    transaction_type: usize,
    reference_id: usize,
    net_amount: usize,
}

impl ColumnMapping {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let release_date = find("RELEASE_DATE");
        let transaction_type = find("TRANSACTION_TYPE");
        let reference_id = find("REFERENCE_ID");
        let net_amount = find("TRANSACTION_NET_AMOUNT");

        match (release_date, transaction_type, reference_id, net_amount) {
            (Some(release_date), Some(transaction_type), Some(reference_id), Some(net_amount)) => {
                Ok(ColumnMapping {
                    release_date,
                    transaction_type,
                    reference_id,
                    net_amount,
                })
            }
            _ => {
                let missing: Vec<&str> = [
                    ("RELEASE_DATE", release_date),
                    ("TRANSACTION_TYPE", transaction_type),
                    ("REFERENCE_ID", reference_id),
                    ("TRANSACTION_NET_AMOUNT", net_amount),
                ]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| *name)
                .collect();
                Err(CleanerError::Structural(format!(
                    "missing required columns in MercadoPago file: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    fn max_index(&self) -> usize {
        self.release_date
            .max(self.transaction_type)
            .max(self.reference_id)
            .max(self.net_amount)
    }
}

fn parse_row(
    row: &StringRecord,
    mapping: &ColumnMapping,
    account_id: &str,
    row_num: usize,
) -> Result<Option<Record>> {
    if row.iter().all(|cell| cell.trim().is_empty()) {
        return Ok(None);
    }

    if row.len() <= mapping.max_index() {
        warn!("Skipping row {}: only {} columns", row_num, row.len());
        return Ok(None);
    }

    let date_str = row[mapping.release_date].trim();
    if date_str.is_empty() {
        return Ok(None);
    }

    let date = parse_date(date_str, Provider::MercadoPago).map_err(|e| match e {
        CleanerError::Parse(msg) => CleanerError::Parse(format!("row {}: {}", row_num, msg)),
        other => other,
    })?;

    let transaction_type = clean_transaction_type(&row[mapping.transaction_type]);
    let reference_id = row[mapping.reference_id].trim();
    let description = build_description(&transaction_type, reference_id);

    if description.is_empty() || description == "-" {
        debug!("Skipping row {}: empty description", row_num);
        return Ok(None);
    }

    let amount = match parse_amount(&row[mapping.net_amount], Provider::MercadoPago) {
        Ok(amount) => amount,
        Err(e) => {
            warn!("Skipping row {}: {}", row_num, e);
            return Ok(None);
        }
    };

    if amount.is_zero() {
        debug!("Skipping row {}: zero amount", row_num);
        return Ok(None);
    }

    Ok(Some(Record::new(
        date,
        description,
        amount,
        Currency::Ars,
        account_id,
    )))
}

/// Drop the "transfer sent/received" prefix, keeping the counterpart name
fn clean_transaction_type(raw: &str) -> String {
    let mut text = raw.trim();
    for prefix in TRANSFER_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    text.trim().to_string()
}

fn build_description(transaction_type: &str, reference_id: &str) -> String {
    match (transaction_type.is_empty(), reference_id.is_empty()) {
        (false, false) => format!("{} - {}", transaction_type, reference_id),
        (false, true) => transaction_type.to_string(),
        (true, false) => reference_id.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const PREAMBLE: &str = "INITIAL_BALANCE;CREDITS;DEBITS;FINAL_BALANCE\n\
        1.825.838,67;0,00;-24.000,00;1.801.838,67\n\
        ;;;\n\
        RELEASE_DATE;TRANSACTION_TYPE;REFERENCE_ID;TRANSACTION_NET_AMOUNT;PARTIAL_BALANCE\n";

    fn parse(content: &str) -> Result<RecordBatch> {
        parse_mercadopago_csv(content.as_bytes(), "mp")
    }

    #[test]
    fn test_detect_separator() {
        assert_eq!(detect_separator("a;b;c,d"), b';');
        assert_eq!(detect_separator("a;b,c,d"), b',');
        assert_eq!(detect_separator("a;b,c"), b',');
        assert_eq!(detect_separator(""), b',');
    }

    #[test]
    fn test_transfer_row_becomes_record() {
        let content = format!(
            "{}22-07-2025;Transferencia enviada Area, Maria Lucia;119118545859;-24.000,00;1.801.838,67\n",
            PREAMBLE
        );
        let batch = parse(&content).unwrap();

        assert_eq!(batch.provider, "mercadopago");
        assert_eq!(batch.currency, Currency::Ars);
        assert_eq!(batch.len(), 1);

        let record = &batch.records[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 7, 23).unwrap());
        assert_eq!(record.description, "Area, Maria Lucia - 119118545859");
        assert_eq!(record.amount, dec!(-24000));
        assert_eq!(record.currency, Currency::Ars);
        assert_eq!(record.account_id, "mp");
        assert!(record.category.is_none());
    }

    #[test]
    fn test_comma_separated_file() {
        let content = "a,b\nc,d\ne,f\n\
            release_date,transaction_type,reference_id,transaction_net_amount\n\
            01-02-2025,Transferencia recibida Juan,555,\"1.000,75\"\n";
        let batch = parse(content).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].description, "Juan - 555");
        assert_eq!(batch.records[0].amount, dec!(1000));
        assert_eq!(
            batch.records[0].date,
            NaiveDate::from_ymd_opt(2025, 2, 2).unwrap()
        );
    }

    #[test]
    fn test_too_few_rows_is_structural() {
        let err = parse("a;b\nc;d\ne;f\nRELEASE_DATE;TRANSACTION_TYPE\n").unwrap_err();
        assert!(err.is_structural());
        assert!(parse("").unwrap_err().is_structural());
    }

    #[test]
    fn test_missing_columns_is_structural() {
        let content = "a;b\nc;d\ne;f\n\
            RELEASE_DATE;TRANSACTION_TYPE;TRANSACTION_NET_AMOUNT\n\
            22-07-2025;Pago;-1,00\n";
        let err = parse(content).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("REFERENCE_ID"));
    }

    #[test]
    fn test_bad_date_aborts_with_row_number() {
        let content = format!(
            "{}22-07-2025;Pago;1;-10,00;0\n2025/07/23;Pago;2;-20,00;0\n",
            PREAMBLE
        );
        let err = parse(&content).unwrap_err();
        assert!(matches!(err, CleanerError::Parse(_)));
        assert!(err.to_string().contains("row 6"), "{}", err);
    }

    #[test]
    fn test_bad_date_row_number_counts_blank_lines() {
        let content = format!(
            "{}22-07-2025;Pago;1;-10,00;0

   
bad;Pago;2;-20,00;0
",
            PREAMBLE
        );
        let err = parse(&content).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("parse error: row 8: invalid date 'bad'"), "{}", msg);
        assert_eq!(msg.matches("parse error").count(), 1, "{}", msg);
    }

    #[test]
    fn test_rows_skipped_leniently() {
        let content = format!(
            "{}\
             ;Pago;1;-10,00;0\n\
             22-07-2025;Pago;2\n\
             22-07-2025;Transferencia enviada;;-10,00;0\n\
             22-07-2025;Pago;3;0,00;0\n\
             22-07-2025;Pago;4;abc;0\n\
             22-07-2025;;5;-5,00;0\n",
            PREAMBLE
        );
        let batch = parse(&content).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].description, "5");
        assert_eq!(batch.records[0].amount, dec!(-5));
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        assert_eq!(clean_transaction_type("Transferencia enviada Ana"), "Ana");
        assert_eq!(
            clean_transaction_type("transferencia enviada Ana"),
            "transferencia enviada Ana"
        );
        assert_eq!(clean_transaction_type("Pago con QR"), "Pago con QR");
    }

    #[test]
    fn test_latin1_content_is_decoded() {
        let mut bytes = PREAMBLE.as_bytes().to_vec();
        bytes.extend_from_slice(b"22-07-2025;Pago en Caf\xe9;77;-1.500,00;0\n");
        let batch = parse_mercadopago_csv(&bytes[..], "mp").unwrap();
        assert_eq!(batch.records[0].description, "Pago en Café - 77");
    }

    #[test]
    fn test_source_order_is_preserved() {
        let content = format!(
            "{}01-01-2025;A;1;-1,00;0\n02-01-2025;B;2;2,00;0\n03-01-2025;C;3;-3,00;0\n",
            PREAMBLE
        );
        let batch = parse(&content).unwrap();
        let descriptions: Vec<&str> = batch
            .records
            .iter()
            .map(|r| r.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["A - 1", "B - 2", "C - 3"]);
    }
}

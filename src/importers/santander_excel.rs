//! Santander credit card statement importer
//!
//! The export is a human-formatted sheet with one section per card:
//!
//! ```text
//! Tarjeta de Crédito terminada en 1234
//! (blank or summary rows)
//! Fecha | Descripción | Cuotas | Comprobante | Monto en pesos | Monto en dólares
//! 01/06/2024 | Supermercado | 1/3 | 00123 | $3.000,00 |
//!            | Cuota 2      | 2/3 | 00123 | $3.000,00 |
//! Pago de tarjeta y devoluciones
//! ...
//! ```
//!
//! Sections have no fixed offsets and some of them carry an extra blank
//! leading column, so the column layout is inferred per section. Continuation
//! rows without a date inherit the last date seen in the section. Expenses
//! are exported as positive numbers and are negated on import.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use tracing::{debug, info, warn};

use super::dates::looks_like_date;
use super::{parse_amount, parse_date, Provider};
use crate::db::models::{Currency, Record, RecordBatch};
use crate::error::{CleanerError, Result};

static SECTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Pago de tarjeta y devoluciones|Tarjeta de .* terminada en")
        .expect("valid section regex")
});

/// Rows after a section marker searched for the header row
const HEADER_LOOKAHEAD: usize = 4;

/// Parse a Santander statement workbook (xlsx, xls or ods)
pub fn parse_santander_excel<R: Read>(mut reader: R, account_id: &str) -> Result<RecordBatch> {
    info!("Parsing Santander workbook for account '{}'", account_id);

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let rows = read_first_sheet(bytes)?;
    debug!("Materialized {} rows from first sheet", rows.len());

    Ok(parse_santander_rows(&rows, account_id))
}

/// Decode the first worksheet into trimmed string cells
///
/// Cells keep their sheet position: leading empty rows and columns that the
/// workbook omits are padded back in.
fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| CleanerError::Structural(format!("failed to open Excel file: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CleanerError::Structural("no sheets found in Excel file".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        CleanerError::Structural(format!("failed to read sheet '{}': {}", sheet_name, e))
    })?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];

    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_text));
        grid.push(cells);
    }

    Ok(grid)
}

/// Render a cell the way the statement displays it
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        // Decimal comma so the amount parser reads it like exported text
        Data::Float(f) => f.to_string().replace('.', ","),
        Data::DateTime(dt) => format!("{}", dt.as_f64().trunc() as i64),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| s.trim().to_string()),
        other => other
            .as_string()
            .unwrap_or_else(|| other.to_string())
            .trim()
            .to_string(),
    }
}

/// Extract records from an already materialized statement grid
pub fn parse_santander_rows(rows: &[Vec<String>], account_id: &str) -> RecordBatch {
    let mut records = Vec::new();
    let mut state = ScanState::SeekingSection;
    let mut sections = 0;
    let mut i = 0;

    while i < rows.len() {
        let row = &rows[i];

        state = match state {
            ScanState::SeekingSection => {
                i += 1;
                if is_section_marker(row) {
                    debug!("Section marker at row {}: '{}'", i, cell(row, 0));
                    ScanState::SeekingHeader { marker_row: i - 1 }
                } else {
                    ScanState::SeekingSection
                }
            }

            ScanState::SeekingHeader { marker_row } => {
                if is_header_row(row) {
                    let layout = ColumnLayout::infer(rows.get(i + 1).map(Vec::as_slice));
                    sections += 1;
                    debug!(
                        "Section {} header at row {}, column offset {}",
                        sections,
                        i + 1,
                        layout.offset
                    );
                    i += 1;
                    ScanState::Consuming(Section::new(layout))
                } else if i >= marker_row + HEADER_LOOKAHEAD {
                    debug!("No header after marker at row {}", marker_row + 1);
                    i = marker_row + 1;
                    ScanState::SeekingSection
                } else {
                    i += 1;
                    ScanState::SeekingHeader { marker_row }
                }
            }

            ScanState::Consuming(mut section) => {
                if is_section_marker(row) {
                    // Leave the marker row for SeekingSection
                    ScanState::SeekingSection
                } else {
                    section.consume(row, i + 1, account_id, &mut records);
                    i += 1;
                    ScanState::Consuming(section)
                }
            }
        };
    }

    info!(
        "Successfully parsed {} records from {} Santander sections",
        records.len(),
        sections
    );

    RecordBatch {
        records,
        provider: Provider::Santander.name().to_string(),
        currency: Currency::Ars,
    }
}

enum ScanState {
    SeekingSection,
    SeekingHeader { marker_row: usize },
    Consuming(Section),
}

/// Column positions of one section, relative to its inferred offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    offset: usize,
}

impl ColumnLayout {
    /// Some sections start one column to the right; the first data row tells
    fn infer(first_data_row: Option<&[String]>) -> Self {
        let offset = match first_data_row {
            Some(row) if looks_like_date(cell(row, 0)) => 0,
            Some(row) if looks_like_date(cell(row, 1)) => 1,
            _ => 0,
        };
        ColumnLayout { offset }
    }

    fn date(&self) -> usize {
        self.offset
    }

    fn description(&self) -> usize {
        self.offset + 1
    }

    fn installments(&self) -> usize {
        self.offset + 2
    }

    fn receipt(&self) -> usize {
        self.offset + 3
    }

    fn ars(&self) -> usize {
        self.offset + 4
    }

    fn usd(&self) -> usize {
        self.offset + 5
    }
}

struct Section {
    layout: ColumnLayout,
    last_date: Option<NaiveDate>,
}

impl Section {
    fn new(layout: ColumnLayout) -> Self {
        Self {
            layout,
            last_date: None,
        }
    }

    fn consume(&mut self, row: &[String], row_num: usize, account_id: &str, out: &mut Vec<Record>) {
        if is_blank(row) {
            return;
        }

        let date_cell = cell(row, self.layout.date());
        let date = if date_cell.is_empty() {
            match self.last_date {
                Some(date) => date,
                None => {
                    debug!("Skipping row {}: no date yet in section", row_num);
                    return;
                }
            }
        } else {
            match parse_date(date_cell, Provider::Santander) {
                Ok(date) => {
                    self.last_date = Some(date);
                    date
                }
                Err(e) => {
                    debug!("Skipping row {}: {}", row_num, e);
                    return;
                }
            }
        };

        let description = [
            cell(row, self.layout.description()),
            cell(row, self.layout.installments()),
            cell(row, self.layout.receipt()),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" - ");

        if description.is_empty() {
            debug!("Skipping row {}: empty description", row_num);
            return;
        }

        for (column, currency) in [
            (self.layout.ars(), Currency::Ars),
            (self.layout.usd(), Currency::Usd),
        ] {
            let raw = cell(row, column);
            if raw.is_empty() {
                continue;
            }

            match parse_amount(raw, Provider::Santander) {
                Ok(amount) if amount.is_zero() => {}
                Ok(amount) => out.push(Record::new(
                    date,
                    description.clone(),
                    -amount,
                    currency,
                    account_id,
                )),
                Err(e) => warn!("Skipping {} amount at row {}: {}", currency, row_num, e),
            }
        }
    }
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(|s| s.trim()).unwrap_or("")
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn is_section_marker(row: &[String]) -> bool {
    !row.is_empty() && SECTION_MARKER.is_match(cell(row, 0))
}

fn is_header_row(row: &[String]) -> bool {
    cell(row, 0).to_lowercase().contains("fecha")
}

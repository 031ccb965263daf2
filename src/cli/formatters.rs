//! Output formatting module for CLI display
//!
//! Keeps the terminal layout of previews, summaries and listings out of the
//! command handlers.

use cleaner::db::{Currency, Record, RecordBatch};
use cleaner::reconcile::ImportResult;
use cleaner::utils::format_currency;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

const PREVIEW_LIMIT: usize = 10;

/// Pretty JSON for `--json` output
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn colored_amount(amount: Decimal, currency: Currency) -> String {
    let text = format_currency(amount, currency);
    if amount < Decimal::ZERO {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

/// Header line plus a table of the first parsed records
pub fn format_batch_preview(batch: &RecordBatch) -> String {
    #[derive(Tabled)]
    struct RecordPreview {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let mut output = format!(
        "\n{} Found {} records ({} ARS, {} USD)\n\n",
        "✓".green().bold(),
        batch.len(),
        batch.count_by_currency(Currency::Ars),
        batch.count_by_currency(Currency::Usd)
    );

    if batch.is_empty() {
        return output;
    }

    let preview: Vec<RecordPreview> = batch
        .records
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|r| RecordPreview {
            date: r.date.format("%d/%m/%Y").to_string(),
            description: r.description.clone(),
            amount: colored_amount(r.amount, r.currency),
        })
        .collect();

    let mut table = Table::new(preview);
    table.with(Style::rounded());
    table.modify(Columns::new(2..), Alignment::right());
    output.push_str(&table.to_string());
    output.push('\n');

    if batch.len() > PREVIEW_LIMIT {
        output.push_str(&format!(
            "\n... and {} more records\n",
            batch.len() - PREVIEW_LIMIT
        ));
    }

    output
}

/// Outcome counts of an import
pub fn format_import_summary(result: &ImportResult) -> String {
    let mut output = format!("\n{} Import complete!\n", "✓".green().bold());
    output.push_str(&format!(
        "  Imported: {}\n",
        result.imported_records.to_string().green()
    ));
    if result.duplicate_records > 0 {
        output.push_str(&format!(
            "  Skipped (duplicates): {}\n",
            result.duplicate_records.to_string().yellow()
        ));
    }
    if result.failed_records > 0 {
        output.push_str(&format!(
            "  Failed: {}\n",
            result.failed_records.to_string().red()
        ));
        for error in &result.errors {
            output.push_str(&format!("    {} {}\n", "✗".red(), error));
        }
    }
    output
}

/// Stored records as a table, with ids for `records delete`
pub fn format_records_table(records: &[Record]) -> String {
    #[derive(Tabled)]
    struct RecordRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Account")]
        account: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            id: r.id.map(|id| id.to_string()).unwrap_or_default(),
            date: r.date.format("%d/%m/%Y").to_string(),
            description: r.description.clone(),
            account: r.account_id.clone(),
            category: r.category.clone().unwrap_or_else(|| "-".to_string()),
            amount: colored_amount(r.amount, r.currency),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(5..), Alignment::right());

    format!("{}\n\n{} records\n", table, records.len())
}

pub fn format_empty_records() -> String {
    format!(
        "{} No records found\nImport a statement first using: {} import <provider> <file>\n",
        "ℹ".blue().bold(),
        "cleaner".bold()
    )
}

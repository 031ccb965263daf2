use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use cleaner::config::Config;
use cleaner::db::{self, Currency, Record, RecordFilter, SortBy, SqliteSink};
use cleaner::{export, reconcile};

use crate::cli::{formatters, RecordCommands};

fn parse_cli_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", value))
}

fn open_connection(config: &Config) -> Result<rusqlite::Connection> {
    db::init_database(config.db_path.clone()).context("failed to initialize database")?;
    db::open_db(config.db_path.clone()).context("failed to open database")
}

pub fn dispatch_records(action: RecordCommands, config: &Config, json_output: bool) -> Result<()> {
    match action {
        RecordCommands::List {
            account,
            currency,
            from,
            to,
            sort_by,
            order,
        } => {
            let filter = RecordFilter {
                account_id: account,
                currency: currency.as_deref().map(Currency::from_str).transpose()?,
                start_date: from.as_deref().map(parse_cli_date).transpose()?,
                end_date: to.as_deref().map(parse_cli_date).transpose()?,
                sort_by: SortBy::from_str(&sort_by)?,
                ascending: order == "asc",
            };
            list_records(&filter, config, json_output)
        }
        RecordCommands::Add {
            date,
            description,
            amount,
            currency,
            account,
            category,
        } => {
            let date = parse_cli_date(&date)?;
            let amount = Decimal::from_str(amount.trim())
                .with_context(|| format!("Invalid amount '{}'", amount))?;
            let currency = Currency::from_str(&currency)?;
            let account = config.resolve_account(account.as_deref());

            let mut record = Record::new(date, description.trim(), amount, currency, account);
            record.category = category.filter(|c| !c.trim().is_empty());

            add_record(&record, config, json_output)
        }
        RecordCommands::Delete { id } => {
            let conn = open_connection(config)?;
            db::delete_record(&conn, id)?;
            if json_output {
                println!("{}", formatters::format_json(&serde_json::json!({ "deleted": id })));
            } else {
                println!("{} Deleted record {}", "✓".green().bold(), id);
            }
            Ok(())
        }
        RecordCommands::Export { account, output } => export_records(account, output, config),
    }
}

fn list_records(filter: &RecordFilter, config: &Config, json_output: bool) -> Result<()> {
    let conn = open_connection(config)?;
    let records = db::list_records(&conn, filter)?;

    if json_output {
        println!("{}", formatters::format_json(&records));
    } else if records.is_empty() {
        print!("{}", formatters::format_empty_records());
    } else {
        print!("{}", formatters::format_records_table(&records));
    }
    Ok(())
}

fn add_record(record: &Record, config: &Config, json_output: bool) -> Result<()> {
    let conn = open_connection(config)?;
    let mut sink = SqliteSink::new(&conn);
    reconcile::create_record(&mut sink, record)?;

    let id = conn.last_insert_rowid();
    let stored = db::get_record(&conn, id)?.unwrap_or_else(|| record.clone());

    if json_output {
        println!("{}", formatters::format_json(&stored));
    } else {
        println!(
            "{} Added record {}: {} {} {}",
            "✓".green().bold(),
            id,
            stored.date.format("%d/%m/%Y"),
            stored.description,
            cleaner::utils::format_currency(stored.amount, stored.currency)
        );
    }
    Ok(())
}

fn export_records(account: Option<String>, output: Option<PathBuf>, config: &Config) -> Result<()> {
    let conn = open_connection(config)?;
    let filter = RecordFilter {
        account_id: account,
        ..RecordFilter::default()
    };
    let records = db::list_records(&conn, &filter)?;

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export::write_records_csv(file, &records)?;
            eprintln!(
                "{} Exported {} records to {}",
                "✓".green().bold(),
                records.len(),
                path.display()
            );
        }
        None => export::write_records_csv(std::io::stdout().lock(), &records)?,
    }
    Ok(())
}

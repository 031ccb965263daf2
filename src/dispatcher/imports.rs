use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use cleaner::config::Config;
use cleaner::db::{self, Record, SqliteSink};
use cleaner::export;
use cleaner::importers::{self, Provider};
use cleaner::reconcile;

use crate::cli::formatters;

fn parse_provider(provider: &str) -> Result<Provider> {
    Ok(provider.parse::<Provider>()?)
}

pub fn dispatch_import(
    provider: &str,
    file: &Path,
    account: Option<&str>,
    dry_run: bool,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let provider = parse_provider(provider)?;
    let account = config.resolve_account(account);
    tracing::info!("Importing {} statement {:?} into account {}", provider, file, account);

    let batch = importers::import_file(file, provider, &account)
        .with_context(|| format!("Error reading import file {}", file.display()))?;

    if !json_output {
        print!("{}", formatters::format_batch_preview(&batch));
    }

    if dry_run {
        if json_output {
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct DryRun<'a> {
                dry_run: bool,
                provider: &'a str,
                records: &'a [Record],
            }
            println!(
                "{}",
                formatters::format_json(&DryRun {
                    dry_run: true,
                    provider: provider.name(),
                    records: &batch.records,
                })
            );
        } else {
            println!("\n{} Dry run - no changes saved", "ℹ".blue().bold());
        }
        return Ok(());
    }

    db::init_database(config.db_path.clone()).context("failed to initialize database")?;
    let conn = db::open_db(config.db_path.clone()).context("failed to open database")?;
    let mut sink = SqliteSink::new(&conn);

    let result = reconcile::reconcile(&batch, &mut sink);

    if json_output {
        println!("{}", formatters::format_json(&result));
    } else {
        print!("{}", formatters::format_import_summary(&result));
    }

    Ok(())
}

pub fn dispatch_parse(
    provider: &str,
    file: &Path,
    account: Option<&str>,
    output_dir: &Path,
    pattern: Option<&str>,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let provider = parse_provider(provider)?;
    let account = config.resolve_account(account);
    let pattern = pattern.unwrap_or(&config.export_pattern);

    let batch = importers::import_file(file, provider, &account)
        .with_context(|| format!("Error reading import file {}", file.display()))?;

    let written = export::write_statement_files(&batch.records, output_dir, pattern)
        .with_context(|| format!("failed to write CSV files to {}", output_dir.display()))?;

    if json_output {
        #[derive(Serialize)]
        struct WrittenFile {
            currency: String,
            path: PathBuf,
            records: usize,
        }
        let files: Vec<WrittenFile> = written
            .iter()
            .map(|(currency, path)| WrittenFile {
                currency: currency.to_string(),
                path: path.clone(),
                records: batch.count_by_currency(*currency),
            })
            .collect();
        println!("{}", formatters::format_json(&files));
        return Ok(());
    }

    print!("{}", formatters::format_batch_preview(&batch));
    if written.is_empty() {
        println!("\n{} No records to write", "ℹ".blue().bold());
    }
    for (currency, path) in &written {
        println!(
            "{} {} {} records written to {}",
            "✓".green().bold(),
            batch.count_by_currency(*currency),
            currency,
            path.display()
        );
    }

    Ok(())
}

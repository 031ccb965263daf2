use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "cleaner")]
#[command(version, about = "Normalize Santander and MercadoPago bank statements")]
#[command(
    long_about = "Parse Santander credit-card spreadsheets and MercadoPago CSV exports into signed, dated records, store them without duplicates, and export them as CSV."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a provider export into the records database, skipping duplicates
    Import {
        /// Provider of the file: santander or mercadopago
        provider: String,

        /// Path to the Excel or CSV file
        file: PathBuf,

        /// Account the records belong to
        #[arg(short, long)]
        account: Option<String>,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Parse a provider export into one CSV per currency (no database)
    Parse {
        /// Provider of the file: santander or mercadopago
        provider: String,

        /// Path to the Excel or CSV file
        file: PathBuf,

        /// Account the records belong to
        #[arg(short, long)]
        account: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// File name pattern; {currency} becomes ars or usd
        #[arg(short = 'p', long)]
        pattern: Option<String>,
    },

    /// Stored record management
    Records {
        #[command(subcommand)]
        action: RecordCommands,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List stored records
    List {
        /// Only records of this account
        #[arg(short, long)]
        account: Option<String>,

        /// Only records in this currency (ARS or USD)
        #[arg(short, long)]
        currency: Option<String>,

        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Sort field: date or description
        #[arg(long, default_value = "date")]
        sort_by: String,

        /// Sort order: asc or desc
        #[arg(long, default_value = "desc", value_parser = ["asc", "desc"])]
        order: String,
    },

    /// Manually add a record
    Add {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Description
        description: String,

        /// Signed amount (negative for debits)
        #[arg(allow_negative_numbers = true)]
        amount: String,

        /// Currency: ARS or USD
        #[arg(long, default_value = "ARS")]
        currency: String,

        /// Account the record belongs to
        #[arg(short, long)]
        account: Option<String>,

        /// Optional category
        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a record by id
    Delete {
        /// Record id (see `records list`)
        id: i64,
    },

    /// Export stored records as CSV
    Export {
        /// Only records of this account
        #[arg(short, long)]
        account: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

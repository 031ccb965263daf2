//! Routes parsed clap commands to their handlers.

mod imports;
mod records;

use anyhow::Result;
use cleaner::config::Config;

use crate::cli::Commands;

/// Route a parsed command to its handler
pub fn dispatch_command(command: Commands, config: &Config, json_output: bool) -> Result<()> {
    match command {
        Commands::Import {
            provider,
            file,
            account,
            dry_run,
        } => imports::dispatch_import(
            &provider,
            &file,
            account.as_deref(),
            dry_run,
            config,
            json_output,
        ),
        Commands::Parse {
            provider,
            file,
            account,
            output_dir,
            pattern,
        } => imports::dispatch_parse(
            &provider,
            &file,
            account.as_deref(),
            &output_dir,
            pattern.as_deref(),
            config,
            json_output,
        ),
        Commands::Records { action } => records::dispatch_records(action, config, json_output),
    }
}

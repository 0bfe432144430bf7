//! The database operations: `--search` and `--init-db`. Both run before any
//! connection or contract resolution and terminate the process afterwards.

use crate::args::Args;
use crate::config::Config;
use crate::connection;
use argus_db::ContractStorage;
use argus_utils::errors::CliError;

/// Runs a search expression against the persistent database, emitting one
/// match block per hit.
pub fn run_search(expr: &str, config: &Config) -> Result<(), CliError> {
    let storage = ContractStorage::open(&config.db_dir)?;
    let hits = storage.search(expr, |m| {
        println!("Match: contract hash 0x{}", m.code_hash);
        for (address, balance) in &m.instances {
            println!("  {address}  balance: {balance} wei");
        }
    })?;
    if hits == 0 {
        println!("No matching contracts.");
    }
    Ok(())
}

/// Synchronizes the database against the node selected by the connection
/// flags (`--ipc` picks the IPC transport).
pub async fn run_init(args: &Args, config: &Config) -> Result<(), CliError> {
    let storage = ContractStorage::open(&config.db_dir)?;
    let client = connection::resolve(args, config).await?;
    let stored = argus_db::sync(&storage, &client, args.sync_all).await?;
    tracing::info!("synchronized {stored} contract instances");
    Ok(())
}

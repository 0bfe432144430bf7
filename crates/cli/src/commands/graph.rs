//! The `--graph` mode: build a simplified state space over all resolved
//! contracts and write the rendered document to the requested path.

use crate::connection::ChainLoader;
use argus_analysis::{render, CodeLoader, Mode, StateSpaceBuilder};
use argus_chain::NodeClient;
use argus_core::ContractSource;
use argus_utils::errors::CliError;
use std::fs;

pub async fn run(
    contracts: &[ContractSource],
    client: Option<&NodeClient>,
    dynld: bool,
    physics: bool,
    path: &str,
) -> Result<(), CliError> {
    let loader = client.filter(|_| dynld).map(ChainLoader);
    let space = StateSpaceBuilder::new(Mode::Simplified)
        .build(contracts, loader.as_ref().map(|l| l as &dyn CodeLoader))
        .await?;
    let document = render(&space, physics);

    // The write is the run's last step: a failure is reported with its
    // cause, it does not abort.
    match fs::write(path, document) {
        Ok(()) => tracing::info!("wrote state-space graph to {path}"),
        Err(e) => eprintln!("Could not write graph to '{path}': {e}"),
    }
    Ok(())
}

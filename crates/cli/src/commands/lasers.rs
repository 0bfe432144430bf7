//! The `--fire-lasers` mode: build the full state space over all resolved
//! contracts and run the vulnerability detection suite against it.

use crate::connection::ChainLoader;
use argus_analysis::{CodeLoader, Mode, StateSpaceBuilder};
use argus_chain::NodeClient;
use argus_core::ContractSource;
use argus_lasers::{fire, report};
use argus_utils::errors::CliError;

pub async fn run(
    contracts: &[ContractSource],
    client: Option<&NodeClient>,
    dynld: bool,
) -> Result<(), CliError> {
    let loader = client.filter(|_| dynld).map(ChainLoader);
    let space = StateSpaceBuilder::new(Mode::Full)
        .build(contracts, loader.as_ref().map(|l| l as &dyn CodeLoader))
        .await?;
    let findings = fire(&space);
    print!("{}", report(&findings));
    Ok(())
}

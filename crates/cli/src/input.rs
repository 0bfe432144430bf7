//! Input resolution: which bytecode this run analyzes.
//!
//! The three sources are mutually exclusive with a fixed precedence: inline
//! bytecode, then an on-chain address, then Solidity source files. Selection
//! happens once, up front; resolution turns the selected source into the
//! ordered contract list every analysis mode consumes.

use crate::args::Args;
use crate::compile;
use crate::config::Config;
use argus_chain::NodeClient;
use argus_core::{indexed_address, input_to_bytes, ContractSource, MAX_INDEXED_CONTRACTS};
use argus_utils::errors::{ConnectionError, LoadError};
use std::path::Path;

/// The selected bytecode source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Inline hex bytecode (`--code`).
    Code(String),
    /// An on-chain contract (`--address`).
    Address(String),
    /// Solidity source files, in argument order.
    Files(Vec<String>),
}

impl InputKind {
    /// Fixed input precedence, first match wins.
    pub fn select(args: &Args) -> Result<Self, LoadError> {
        if let Some(code) = &args.code {
            return Ok(Self::Code(code.clone()));
        }
        if let Some(address) = &args.address {
            return Ok(Self::Address(address.clone()));
        }
        if !args.solidity_files.is_empty() {
            return Ok(Self::Files(args.solidity_files.clone()));
        }
        Err(LoadError::NoInput)
    }

    /// Only the address source fetches from chain.
    pub fn needs_connection(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

/// Resolves the selected source into the ordered contract list.
pub async fn resolve(
    input: InputKind,
    client: Option<&NodeClient>,
    config: &Config,
) -> Result<Vec<ContractSource>, LoadError> {
    match input {
        InputKind::Code(hex_input) => {
            let code = input_to_bytes(&hex_input, false)?;
            Ok(vec![ContractSource::new("MAIN", indexed_address(0), code)])
        }
        InputKind::Address(address) => {
            let client = client.ok_or_else(|| {
                LoadError::Connection(ConnectionError::Transport(
                    "no connection available for address fetch".into(),
                ))
            })?;
            let code = client.code_at(&address).await.map_err(LoadError::from)?;
            Ok(vec![ContractSource::new(address.clone(), address, code)])
        }
        InputKind::Files(paths) => {
            // Capacity check comes first: no compiler runs past the limit.
            if paths.len() > MAX_INDEXED_CONTRACTS {
                return Err(LoadError::TooManySources {
                    max: MAX_INDEXED_CONTRACTS,
                    given: paths.len(),
                });
            }
            let mut contracts = Vec::new();
            for (index, raw_path) in paths.iter().enumerate() {
                let path = expand_home(raw_path, &config.home);
                let (name, code) = compile::compile_solidity(&path, &config.solc)?;
                let contract = ContractSource::new(name, indexed_address(index), code);
                tracing::info!("loaded contract {} at {}", contract.name, contract.address);
                contracts.push(contract);
            }
            Ok(contracts)
        }
    }
}

/// Expands a leading `~/` to the invoking user's home directory.
fn expand_home(path: &str, home: &Path) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).display().to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_shorthand() {
        let home = Path::new("/home/alice");
        assert_eq!(expand_home("~/c.sol", home), "/home/alice/c.sol");
        assert_eq!(expand_home("./c.sol", home), "./c.sol");
        assert_eq!(expand_home("~weird", home), "~weird");
    }
}

//! The `--trace` mode: concretely execute the first contract's code and
//! print one line per executed step, in execution order.

use argus_core::trace::run_trace;
use argus_core::{input_to_bytes, ContractSource};
use argus_utils::errors::CliError;

pub fn run(contracts: &[ContractSource], data: Option<&str>) -> Result<(), CliError> {
    let calldata = match data {
        Some(hex_input) => input_to_bytes(hex_input, false)?,
        None => Vec::new(),
    };
    let steps = run_trace(&contracts[0].code, &calldata)?;
    for step in &steps {
        println!("{step}");
    }
    Ok(())
}

//! The `--xrefs` mode: print the first contract's cross-references.

use argus_core::ContractSource;

pub fn run(contracts: &[ContractSource]) {
    for reference in contracts[0].xrefs() {
        println!("{reference}");
    }
}

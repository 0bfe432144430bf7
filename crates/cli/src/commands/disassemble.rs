//! The `--disassemble` mode: print the first contract's instruction listing.

use argus_core::{disassemble, ContractSource};

pub fn run(contracts: &[ContractSource]) {
    for instruction in disassemble(&contracts[0].code) {
        println!("{instruction}");
    }
}

//! The `--hash` short-circuit: print the 4-byte hash of a function signature
//! and terminate without resolving any contract.

use argus_core::selector;

pub fn run(signature: &str) {
    println!("0x{}", hex::encode(selector(signature)));
}

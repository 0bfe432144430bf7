//! Contract identity: the loaded-contract value passed to every analysis
//! mode, and deterministic placeholder addresses for locally supplied code.

use crate::decoder::{disassemble, keccak256};
use crate::opcode::Opcode;
use std::collections::HashSet;

/// Locally supplied contracts are identified by an indexed address built from
/// a single hex digit, so one invocation can hold at most 16 of them.
pub const MAX_INDEXED_CONTRACTS: usize = 16;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Deterministic placeholder address for the locally supplied contract at
/// `index`: the index's hex digit repeated over all 40 nibbles.
///
/// Pure and injective on `[0, 16)`; `indexed_address(0)` is the all-zero
/// address, `indexed_address(15)` the all-f one. Callers must keep `index`
/// inside the range — the input resolver enforces this before any contract
/// is loaded.
///
/// # Panics
/// Panics if `index >= MAX_INDEXED_CONTRACTS`.
pub fn indexed_address(index: usize) -> String {
    assert!(
        index < MAX_INDEXED_CONTRACTS,
        "indexed address space exhausted: {index}"
    );
    let digit = HEX_DIGITS[index] as char;
    format!("0x{}", digit.to_string().repeat(40))
}

/// One loaded contract: bytecode, display name and address.
///
/// Created once during input resolution and immutable afterwards. The name is
/// `"MAIN"` for inline bytecode, the address string for contracts fetched
/// from chain, and the compiled unit's name for Solidity sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractSource {
    pub name: String,
    pub address: String,
    pub code: Vec<u8>,
}

impl ContractSource {
    pub fn new(name: impl Into<String>, address: impl Into<String>, code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            code,
        }
    }

    /// Keccak-256 of the runtime code, the content identifier used by the
    /// contract database.
    pub fn code_hash(&self) -> [u8; 32] {
        keccak256(&self.code)
    }

    /// Addresses referenced by the code as full-width PUSH20 immediates,
    /// deduplicated, in first-occurrence order.
    pub fn xrefs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        for instr in disassemble(&self.code) {
            if instr.op != Opcode::PUSH(20) {
                continue;
            }
            if let Some(imm) = &instr.imm {
                if imm.len() == 40 && seen.insert(imm.clone()) {
                    refs.push(format!("0x{imm}"));
                }
            }
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_addresses_are_deterministic_and_distinct() {
        let all: Vec<String> = (0..MAX_INDEXED_CONTRACTS).map(indexed_address).collect();
        for (i, addr) in all.iter().enumerate() {
            assert_eq!(addr.len(), 42);
            assert_eq!(*addr, indexed_address(i), "stable across calls");
        }
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), MAX_INDEXED_CONTRACTS);
        assert_eq!(all[0], format!("0x{}", "0".repeat(40)));
        assert_eq!(all[15], format!("0x{}", "f".repeat(40)));
    }

    #[test]
    #[should_panic(expected = "indexed address space exhausted")]
    fn indexed_address_rejects_out_of_range() {
        indexed_address(16);
    }

    #[test]
    fn xrefs_extracts_push20_targets() {
        // PUSH20 <addr> POP, twice the same target then a different one
        let target = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
        let other = "cafecafecafecafecafecafecafecafecafecafe";
        let code = hex::decode(format!("73{target}5073{target}5073{other}50")).unwrap();
        let contract = ContractSource::new("MAIN", indexed_address(0), code);
        assert_eq!(
            contract.xrefs(),
            vec![format!("0x{target}"), format!("0x{other}")]
        );
    }

    #[test]
    fn code_hash_matches_keccak() {
        let contract = ContractSource::new("MAIN", indexed_address(0), vec![0x00]);
        assert_eq!(contract.code_hash(), keccak256(&[0x00]));
    }
}

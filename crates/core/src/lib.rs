//! Core bytecode handling for argus: the opcode table, hex/file decoding and
//! disassembly, contract identity, and the concrete tracer.

pub mod contract;
pub mod decoder;
pub mod opcode;
pub mod trace;

pub use contract::{indexed_address, ContractSource, MAX_INDEXED_CONTRACTS};
pub use decoder::{
    disassemble, input_to_bytes, keccak256, normalize_hex_string, selector, Instruction,
};
pub use opcode::Opcode;

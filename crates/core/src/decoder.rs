//! argus's single entry-point for turning hex strings, files and raw bytes
//! into instruction streams.

use crate::opcode::Opcode;
use argus_utils::errors::DecodeError;
use std::{fmt, fs, path::Path};
use tiny_keccak::{Hasher, Keccak};

/// Represents a single disassembled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// the instruction's program counter (in bytes)
    pub pc: usize,
    /// the decoded opcode
    pub op: Opcode,
    /// any immediate data (hex string without 0x), if present
    pub imm: Option<String>,
}

impl Instruction {
    /// Returns the number of bytes this instruction occupies in bytecode.
    ///
    /// A PUSH truncated by end-of-code still reports its nominal width so
    /// program counters stay consistent with the byte stream.
    #[inline]
    pub fn byte_size(&self) -> usize {
        1 + self.op.imm_size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pc: six-digit hex, opcode left-padded to 8 chars, then optional imm
        if let Some(imm) = &self.imm {
            write!(f, "{:06x}  {:<8} 0x{}", self.pc, self.op.to_string(), imm)
        } else {
            write!(f, "{:06x}  {}", self.pc, self.op)
        }
    }
}

/// Normalizes hex strings by removing whitespace and the 0x prefix, and
/// padding to even length.
pub fn normalize_hex_string(input: &str) -> Result<String, DecodeError> {
    let stripped: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let clean = stripped.strip_prefix("0x").unwrap_or(&stripped);

    if let Some(bad) = clean.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(DecodeError::HexDecode(
            hex::FromHexError::InvalidHexCharacter { c: bad, index: 0 },
        ));
    }

    Ok(if clean.len() % 2 == 1 {
        format!("0{clean}")
    } else {
        clean.to_string()
    })
}

/// Normalizes input into a byte vector from a hex string or a file of hex.
pub fn input_to_bytes(input: &str, is_file: bool) -> Result<Vec<u8>, DecodeError> {
    let raw = if is_file {
        let path = Path::new(input);
        fs::read_to_string(path).map_err(|e| DecodeError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?
    } else {
        input.to_string()
    };
    let normalized = normalize_hex_string(&raw)?;
    hex::decode(&normalized).map_err(DecodeError::HexDecode)
}

/// Disassembles raw bytecode into a linear instruction stream.
///
/// The walk is total: unknown bytes decode to `UNKNOWN_0xNN` single-byte
/// instructions, and a PUSH whose immediate runs past the end of the code
/// takes whatever bytes remain.
pub fn disassemble(code: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pc = 0;

    while pc < code.len() {
        let op = Opcode::from_byte(code[pc]);
        let width = op.imm_size();
        let imm = if width > 0 {
            let end = (pc + 1 + width).min(code.len());
            Some(hex::encode(&code[pc + 1..end]))
        } else {
            None
        };
        instructions.push(Instruction { pc, op, imm });
        pc += 1 + width;
    }

    tracing::debug!("disassembled {} instructions", instructions.len());
    instructions
}

/// Keccak-256 digest of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

/// 4-byte function selector of a canonical signature string, e.g.
/// `transfer(address,uint256)` -> `a9059cbb`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_prefix_whitespace_and_odd_length() {
        assert_eq!(normalize_hex_string("0x6001").unwrap(), "6001");
        assert_eq!(normalize_hex_string("  60 01\n").unwrap(), "6001");
        assert_eq!(normalize_hex_string("f").unwrap(), "0f");
        assert!(normalize_hex_string("0xzz").is_err());
    }

    #[test]
    fn disassembles_push_immediates() {
        let code = hex::decode("6060604052").unwrap();
        let instructions = disassemble(&code);
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].op, Opcode::PUSH(1));
        assert_eq!(instructions[0].imm.as_deref(), Some("60"));
        assert_eq!(instructions[2].pc, 4);
        assert_eq!(instructions[2].op, Opcode::MSTORE);
    }

    #[test]
    fn truncated_push_takes_remaining_bytes() {
        let instructions = disassemble(&[0x62, 0x01]);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].imm.as_deref(), Some("01"));
    }

    #[test]
    fn transfer_selector() {
        assert_eq!(
            hex::encode(selector("transfer(address,uint256)")),
            "a9059cbb"
        );
    }

    #[test]
    fn instruction_display() {
        let code = hex::decode("600a00").unwrap();
        let instructions = disassemble(&code);
        assert_eq!(instructions[0].to_string(), "000000  PUSH1    0x0a");
        assert_eq!(instructions[1].to_string(), "000002  STOP");
    }
}

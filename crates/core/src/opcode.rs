/// EVM opcode enumeration used throughout argus for disassembly, tracing and
/// state-space construction.
///
/// Single-byte opcodes are plain variants; the variable families (`PUSH`,
/// `DUP`, `SWAP`, `LOG`) carry their width/position, and any byte the table
/// does not know is preserved as `Unknown(u8)` so disassembly stays total.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // 0x00 range - stop & arithmetic
    STOP,
    ADD,
    MUL,
    SUB,
    DIV,
    SDIV,
    MOD,
    SMOD,
    ADDMOD,
    MULMOD,
    EXP,
    SIGNEXTEND,
    // 0x10 range - comparison & bitwise logic
    LT,
    GT,
    SLT,
    SGT,
    EQ,
    ISZERO,
    AND,
    OR,
    XOR,
    NOT,
    BYTE,
    SHL,
    SHR,
    SAR,
    // 0x20 range - hashing
    SHA3,
    // 0x30 range - environment
    ADDRESS,
    BALANCE,
    ORIGIN,
    CALLER,
    CALLVALUE,
    CALLDATALOAD,
    CALLDATASIZE,
    CALLDATACOPY,
    CODESIZE,
    CODECOPY,
    GASPRICE,
    EXTCODESIZE,
    EXTCODECOPY,
    RETURNDATASIZE,
    RETURNDATACOPY,
    EXTCODEHASH,
    // 0x40 range - block information
    BLOCKHASH,
    COINBASE,
    TIMESTAMP,
    NUMBER,
    PREVRANDAO,
    GASLIMIT,
    CHAINID,
    SELFBALANCE,
    BASEFEE,
    // 0x50 range - stack, memory, storage & flow
    POP,
    MLOAD,
    MSTORE,
    MSTORE8,
    SLOAD,
    SSTORE,
    JUMP,
    JUMPI,
    PC,
    MSIZE,
    GAS,
    JUMPDEST,
    PUSH0,
    // 0x60-0x9f - variable-length stack ops
    PUSH(u8), // PUSH1..PUSH32
    DUP(u8),  // DUP1..DUP16
    SWAP(u8), // SWAP1..SWAP16
    // 0xa0 range - logging
    LOG(u8), // LOG0..LOG4
    // 0xf0 range - system & termination
    CREATE,
    CALL,
    CALLCODE,
    RETURN,
    DELEGATECALL,
    CREATE2,
    STATICCALL,
    REVERT,
    INVALID,
    SELFDESTRUCT,
    // Catch-all for bytes outside the table
    Unknown(u8),
}

impl Opcode {
    /// Maps a raw bytecode byte to its opcode. Total: unassigned bytes come
    /// back as `Unknown`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::STOP,
            0x01 => Self::ADD,
            0x02 => Self::MUL,
            0x03 => Self::SUB,
            0x04 => Self::DIV,
            0x05 => Self::SDIV,
            0x06 => Self::MOD,
            0x07 => Self::SMOD,
            0x08 => Self::ADDMOD,
            0x09 => Self::MULMOD,
            0x0a => Self::EXP,
            0x0b => Self::SIGNEXTEND,
            0x10 => Self::LT,
            0x11 => Self::GT,
            0x12 => Self::SLT,
            0x13 => Self::SGT,
            0x14 => Self::EQ,
            0x15 => Self::ISZERO,
            0x16 => Self::AND,
            0x17 => Self::OR,
            0x18 => Self::XOR,
            0x19 => Self::NOT,
            0x1a => Self::BYTE,
            0x1b => Self::SHL,
            0x1c => Self::SHR,
            0x1d => Self::SAR,
            0x20 => Self::SHA3,
            0x30 => Self::ADDRESS,
            0x31 => Self::BALANCE,
            0x32 => Self::ORIGIN,
            0x33 => Self::CALLER,
            0x34 => Self::CALLVALUE,
            0x35 => Self::CALLDATALOAD,
            0x36 => Self::CALLDATASIZE,
            0x37 => Self::CALLDATACOPY,
            0x38 => Self::CODESIZE,
            0x39 => Self::CODECOPY,
            0x3a => Self::GASPRICE,
            0x3b => Self::EXTCODESIZE,
            0x3c => Self::EXTCODECOPY,
            0x3d => Self::RETURNDATASIZE,
            0x3e => Self::RETURNDATACOPY,
            0x3f => Self::EXTCODEHASH,
            0x40 => Self::BLOCKHASH,
            0x41 => Self::COINBASE,
            0x42 => Self::TIMESTAMP,
            0x43 => Self::NUMBER,
            0x44 => Self::PREVRANDAO,
            0x45 => Self::GASLIMIT,
            0x46 => Self::CHAINID,
            0x47 => Self::SELFBALANCE,
            0x48 => Self::BASEFEE,
            0x50 => Self::POP,
            0x51 => Self::MLOAD,
            0x52 => Self::MSTORE,
            0x53 => Self::MSTORE8,
            0x54 => Self::SLOAD,
            0x55 => Self::SSTORE,
            0x56 => Self::JUMP,
            0x57 => Self::JUMPI,
            0x58 => Self::PC,
            0x59 => Self::MSIZE,
            0x5a => Self::GAS,
            0x5b => Self::JUMPDEST,
            0x5f => Self::PUSH0,
            0x60..=0x7f => Self::PUSH(byte - 0x5f),
            0x80..=0x8f => Self::DUP(byte - 0x7f),
            0x90..=0x9f => Self::SWAP(byte - 0x8f),
            0xa0..=0xa4 => Self::LOG(byte - 0xa0),
            0xf0 => Self::CREATE,
            0xf1 => Self::CALL,
            0xf2 => Self::CALLCODE,
            0xf3 => Self::RETURN,
            0xf4 => Self::DELEGATECALL,
            0xf5 => Self::CREATE2,
            0xfa => Self::STATICCALL,
            0xfd => Self::REVERT,
            0xfe => Self::INVALID,
            0xff => Self::SELFDESTRUCT,
            other => Self::Unknown(other),
        }
    }

    /// Number of immediate bytes following the opcode in the bytecode.
    pub fn imm_size(&self) -> usize {
        match self {
            Self::PUSH(n) => *n as usize,
            _ => 0,
        }
    }

    /// True for the whole PUSH family, including PUSH0.
    pub fn is_push(&self) -> bool {
        matches!(self, Self::PUSH0 | Self::PUSH(_))
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Self::JUMP | Self::JUMPI)
    }

    /// Opcodes that end a basic block: jumps plus every terminal.
    pub fn is_block_ending(&self) -> bool {
        self.is_jump() || self.is_terminal()
    }

    /// Opcodes after which execution cannot continue on the next instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::STOP | Self::RETURN | Self::REVERT | Self::INVALID | Self::SELFDESTRUCT
        )
    }

    /// The message-call family, relevant to dynamic dependency loading.
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Self::CALL | Self::CALLCODE | Self::DELEGATECALL | Self::STATICCALL
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PUSH(n) => write!(f, "PUSH{n}"),
            Self::DUP(n) => write!(f, "DUP{n}"),
            Self::SWAP(n) => write!(f, "SWAP{n}"),
            Self::LOG(n) => write!(f, "LOG{n}"),
            Self::Unknown(b) => write!(f, "UNKNOWN_0x{b:02x}"),
            other => write!(f, "{}", mnemonic(other)),
        }
    }
}

fn mnemonic(op: &Opcode) -> &'static str {
    match op {
        Opcode::STOP => "STOP",
        Opcode::ADD => "ADD",
        Opcode::MUL => "MUL",
        Opcode::SUB => "SUB",
        Opcode::DIV => "DIV",
        Opcode::SDIV => "SDIV",
        Opcode::MOD => "MOD",
        Opcode::SMOD => "SMOD",
        Opcode::ADDMOD => "ADDMOD",
        Opcode::MULMOD => "MULMOD",
        Opcode::EXP => "EXP",
        Opcode::SIGNEXTEND => "SIGNEXTEND",
        Opcode::LT => "LT",
        Opcode::GT => "GT",
        Opcode::SLT => "SLT",
        Opcode::SGT => "SGT",
        Opcode::EQ => "EQ",
        Opcode::ISZERO => "ISZERO",
        Opcode::AND => "AND",
        Opcode::OR => "OR",
        Opcode::XOR => "XOR",
        Opcode::NOT => "NOT",
        Opcode::BYTE => "BYTE",
        Opcode::SHL => "SHL",
        Opcode::SHR => "SHR",
        Opcode::SAR => "SAR",
        Opcode::SHA3 => "SHA3",
        Opcode::ADDRESS => "ADDRESS",
        Opcode::BALANCE => "BALANCE",
        Opcode::ORIGIN => "ORIGIN",
        Opcode::CALLER => "CALLER",
        Opcode::CALLVALUE => "CALLVALUE",
        Opcode::CALLDATALOAD => "CALLDATALOAD",
        Opcode::CALLDATASIZE => "CALLDATASIZE",
        Opcode::CALLDATACOPY => "CALLDATACOPY",
        Opcode::CODESIZE => "CODESIZE",
        Opcode::CODECOPY => "CODECOPY",
        Opcode::GASPRICE => "GASPRICE",
        Opcode::EXTCODESIZE => "EXTCODESIZE",
        Opcode::EXTCODECOPY => "EXTCODECOPY",
        Opcode::RETURNDATASIZE => "RETURNDATASIZE",
        Opcode::RETURNDATACOPY => "RETURNDATACOPY",
        Opcode::EXTCODEHASH => "EXTCODEHASH",
        Opcode::BLOCKHASH => "BLOCKHASH",
        Opcode::COINBASE => "COINBASE",
        Opcode::TIMESTAMP => "TIMESTAMP",
        Opcode::NUMBER => "NUMBER",
        Opcode::PREVRANDAO => "PREVRANDAO",
        Opcode::GASLIMIT => "GASLIMIT",
        Opcode::CHAINID => "CHAINID",
        Opcode::SELFBALANCE => "SELFBALANCE",
        Opcode::BASEFEE => "BASEFEE",
        Opcode::POP => "POP",
        Opcode::MLOAD => "MLOAD",
        Opcode::MSTORE => "MSTORE",
        Opcode::MSTORE8 => "MSTORE8",
        Opcode::SLOAD => "SLOAD",
        Opcode::SSTORE => "SSTORE",
        Opcode::JUMP => "JUMP",
        Opcode::JUMPI => "JUMPI",
        Opcode::PC => "PC",
        Opcode::MSIZE => "MSIZE",
        Opcode::GAS => "GAS",
        Opcode::JUMPDEST => "JUMPDEST",
        Opcode::PUSH0 => "PUSH0",
        Opcode::CREATE => "CREATE",
        Opcode::CALL => "CALL",
        Opcode::CALLCODE => "CALLCODE",
        Opcode::RETURN => "RETURN",
        Opcode::DELEGATECALL => "DELEGATECALL",
        Opcode::CREATE2 => "CREATE2",
        Opcode::STATICCALL => "STATICCALL",
        Opcode::REVERT => "REVERT",
        Opcode::INVALID => "INVALID",
        Opcode::SELFDESTRUCT => "SELFDESTRUCT",
        _ => unreachable!("parameterized opcodes are formatted in Display"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_family_bytes() {
        assert_eq!(Opcode::from_byte(0x60), Opcode::PUSH(1));
        assert_eq!(Opcode::from_byte(0x7f), Opcode::PUSH(32));
        assert_eq!(Opcode::from_byte(0x5f), Opcode::PUSH0);
        assert_eq!(Opcode::PUSH(20).imm_size(), 20);
        assert_eq!(Opcode::PUSH0.imm_size(), 0);
    }

    #[test]
    fn dup_swap_log_bytes() {
        assert_eq!(Opcode::from_byte(0x80), Opcode::DUP(1));
        assert_eq!(Opcode::from_byte(0x9f), Opcode::SWAP(16));
        assert_eq!(Opcode::from_byte(0xa2), Opcode::LOG(2));
    }

    #[test]
    fn unknown_bytes_are_preserved() {
        assert_eq!(Opcode::from_byte(0x0c), Opcode::Unknown(0x0c));
        assert_eq!(Opcode::from_byte(0x0c).to_string(), "UNKNOWN_0x0c");
    }

    #[test]
    fn block_ending_predicates() {
        assert!(Opcode::JUMP.is_block_ending());
        assert!(Opcode::REVERT.is_block_ending());
        assert!(Opcode::REVERT.is_terminal());
        assert!(!Opcode::JUMPI.is_terminal());
        assert!(!Opcode::ADD.is_block_ending());
    }

    #[test]
    fn display_mnemonics() {
        assert_eq!(Opcode::PUSH(32).to_string(), "PUSH32");
        assert_eq!(Opcode::SELFDESTRUCT.to_string(), "SELFDESTRUCT");
        assert_eq!(Opcode::from_byte(0x44).to_string(), "PREVRANDAO");
    }
}

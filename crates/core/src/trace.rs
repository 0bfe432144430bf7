//! Concrete execution tracer.
//!
//! Executes a contract's instruction stream on a small 256-bit stack machine
//! and records one [`TraceStep`] per executed instruction: program counter,
//! mnemonic, pushed immediate (for the PUSH family) and the stack snapshot
//! after the step. Environment opcodes read from a dummy context (zero
//! caller, zero value), calldata comes from the caller. The machine halts on
//! terminal opcodes, on anything it does not model (message calls, contract
//! creation and a handful of rare arithmetic opcodes), and at a hard step
//! ceiling so non-terminating code cannot hang a run.

use crate::decoder::{disassemble, keccak256, Instruction};
use crate::opcode::Opcode;
use argus_utils::errors::TraceError;
use num_bigint::BigUint;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Upper bound on executed steps per trace.
pub const MAX_STEPS: usize = 10_000;

/// Upper bound on addressable memory per trace, in bytes.
const MAX_MEMORY: usize = 1 << 22;

/// Stub gas value reported by the GAS opcode.
const GAS_STUB: u64 = 10_000_000;

/// One executed instruction with the machine stack after execution.
#[derive(Clone, Debug)]
pub struct TraceStep {
    pub pc: usize,
    pub op: Opcode,
    /// The pushed literal, for PUSH-class opcodes.
    pub pushed: Option<String>,
    /// Stack snapshot after the step, bottom first.
    pub stack: Vec<BigUint>,
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}  {:<8}", self.pc, self.op.to_string())?;
        if let Some(pushed) = &self.pushed {
            write!(f, " 0x{pushed}")?;
        }
        let items: Vec<String> = self
            .stack
            .iter()
            .map(|v| format!("0x{}", v.to_str_radix(16)))
            .collect();
        write!(f, "\tstack: [{}]", items.join(", "))
    }
}

struct Machine<'a> {
    code: &'a [u8],
    calldata: &'a [u8],
    stack: Vec<BigUint>,
    memory: Vec<u8>,
    storage: HashMap<BigUint, BigUint>,
    modulus: BigUint,
}

impl Machine<'_> {
    fn pop(&mut self, instr: &Instruction) -> Result<BigUint, TraceError> {
        self.stack.pop().ok_or(TraceError::StackUnderflow {
            pc: instr.pc,
            op: instr.op.to_string(),
        })
    }

    fn push(&mut self, value: BigUint) {
        self.stack.push(value % &self.modulus);
    }

    fn push_u64(&mut self, value: u64) {
        self.stack.push(BigUint::from(value));
    }

    fn push_bool(&mut self, value: bool) {
        self.push_u64(u64::from(value));
    }

    fn grow_memory(&mut self, end: usize, pc: usize) -> Result<(), TraceError> {
        if end > MAX_MEMORY {
            return Err(TraceError::MemoryLimit { pc });
        }
        if end > self.memory.len() {
            self.memory.resize(end, 0);
        }
        Ok(())
    }

    /// 32-byte word from a byte slice at `offset`, zero-padded past the end.
    fn word_from(data: &[u8], offset: usize) -> BigUint {
        let mut word = [0u8; 32];
        for (i, byte) in word.iter_mut().enumerate() {
            *byte = data.get(offset + i).copied().unwrap_or(0);
        }
        BigUint::from_bytes_be(&word)
    }

    fn store_word(&mut self, offset: usize, value: &BigUint, pc: usize) -> Result<(), TraceError> {
        self.grow_memory(offset + 32, pc)?;
        let bytes = value.to_bytes_be();
        self.memory[offset..offset + 32].fill(0);
        self.memory[offset + 32 - bytes.len()..offset + 32].copy_from_slice(&bytes);
        Ok(())
    }

    fn copy_into_memory(
        &mut self,
        source: &[u8],
        dest: usize,
        offset: usize,
        len: usize,
        pc: usize,
    ) -> Result<(), TraceError> {
        if len == 0 {
            return Ok(());
        }
        self.grow_memory(dest + len, pc)?;
        for i in 0..len {
            self.memory[dest + i] = source.get(offset + i).copied().unwrap_or(0);
        }
        Ok(())
    }
}

fn to_usize(value: &BigUint) -> Option<usize> {
    let digits = value.to_u64_digits();
    match digits.len() {
        0 => Some(0),
        1 => usize::try_from(digits[0]).ok(),
        _ => None,
    }
}

/// Concretely executes `code` against `calldata`, returning the executed
/// steps in execution order.
pub fn run_trace(code: &[u8], calldata: &[u8]) -> Result<Vec<TraceStep>, TraceError> {
    let instructions = disassemble(code);
    let index_of: HashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.pc, i))
        .collect();
    let jumpdests: HashSet<usize> = instructions
        .iter()
        .filter(|instr| instr.op == Opcode::JUMPDEST)
        .map(|instr| instr.pc)
        .collect();

    let mut vm = Machine {
        code,
        calldata,
        stack: Vec::new(),
        memory: Vec::new(),
        storage: HashMap::new(),
        modulus: BigUint::from(1u8) << 256u32,
    };
    let max_word = vm.modulus.clone() - BigUint::from(1u8);
    let sign_bit = BigUint::from(1u8) << 255u32;

    let mut steps: Vec<TraceStep> = Vec::new();
    let mut idx = 0;

    while idx < instructions.len() && steps.len() < MAX_STEPS {
        let instr = instructions[idx].clone();
        let pc = instr.pc;
        let mut next = idx + 1;
        let mut halt = false;
        let mut pushed = None;

        match instr.op {
            Opcode::STOP | Opcode::RETURN | Opcode::REVERT | Opcode::INVALID => halt = true,
            Opcode::SELFDESTRUCT => {
                vm.pop(&instr)?;
                halt = true;
            }
            Opcode::PUSH0 => vm.push_u64(0),
            Opcode::PUSH(_) => {
                let imm = instr.imm.clone().unwrap_or_default();
                let value =
                    BigUint::parse_bytes(imm.as_bytes(), 16).unwrap_or_else(|| BigUint::from(0u8));
                vm.push(value);
                pushed = Some(imm);
            }
            Opcode::DUP(n) => {
                let depth = n as usize;
                if vm.stack.len() < depth {
                    return Err(TraceError::StackUnderflow {
                        pc,
                        op: instr.op.to_string(),
                    });
                }
                let value = vm.stack[vm.stack.len() - depth].clone();
                vm.stack.push(value);
            }
            Opcode::SWAP(n) => {
                let depth = n as usize;
                if vm.stack.len() < depth + 1 {
                    return Err(TraceError::StackUnderflow {
                        pc,
                        op: instr.op.to_string(),
                    });
                }
                let top = vm.stack.len() - 1;
                vm.stack.swap(top, top - depth);
            }
            Opcode::POP => {
                vm.pop(&instr)?;
            }
            Opcode::ADD => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(a + b);
            }
            Opcode::MUL => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(a * b);
            }
            Opcode::SUB => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push((a + &vm.modulus) - b);
            }
            Opcode::DIV => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(if b == BigUint::from(0u8) {
                    BigUint::from(0u8)
                } else {
                    a / b
                });
            }
            Opcode::MOD => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(if b == BigUint::from(0u8) {
                    BigUint::from(0u8)
                } else {
                    a % b
                });
            }
            Opcode::ADDMOD => {
                let (a, b, m) = (vm.pop(&instr)?, vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(if m == BigUint::from(0u8) {
                    BigUint::from(0u8)
                } else {
                    (a + b) % m
                });
            }
            Opcode::MULMOD => {
                let (a, b, m) = (vm.pop(&instr)?, vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(if m == BigUint::from(0u8) {
                    BigUint::from(0u8)
                } else {
                    (a * b) % m
                });
            }
            Opcode::EXP => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let result = a.modpow(&b, &vm.modulus);
                vm.push(result);
            }
            Opcode::LT => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push_bool(a < b);
            }
            Opcode::GT => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push_bool(a > b);
            }
            Opcode::SLT | Opcode::SGT => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let (a_neg, b_neg) = (a >= sign_bit, b >= sign_bit);
                let less = if a_neg != b_neg { a_neg } else { a < b };
                vm.push_bool(if instr.op == Opcode::SLT {
                    less
                } else {
                    !less && a != b
                });
            }
            Opcode::EQ => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push_bool(a == b);
            }
            Opcode::ISZERO => {
                let a = vm.pop(&instr)?;
                vm.push_bool(a == BigUint::from(0u8));
            }
            Opcode::AND => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(a & b);
            }
            Opcode::OR => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(a | b);
            }
            Opcode::XOR => {
                let (a, b) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.push(a ^ b);
            }
            Opcode::NOT => {
                let a = vm.pop(&instr)?;
                vm.push(&max_word ^ a);
            }
            Opcode::BYTE => {
                let (i, x) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let value = match to_usize(&i) {
                    Some(i) if i < 32 => (x >> (8 * (31 - i))) & BigUint::from(0xffu8),
                    _ => BigUint::from(0u8),
                };
                vm.push(value);
            }
            Opcode::SHL => {
                let (shift, value) = (vm.pop(&instr)?, vm.pop(&instr)?);
                match to_usize(&shift) {
                    Some(s) if s < 256 => vm.push(value << s),
                    _ => vm.push_u64(0),
                }
            }
            Opcode::SHR => {
                let (shift, value) = (vm.pop(&instr)?, vm.pop(&instr)?);
                match to_usize(&shift) {
                    Some(s) if s < 256 => vm.push(value >> s),
                    _ => vm.push_u64(0),
                }
            }
            Opcode::SHA3 => {
                let (offset, len) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let (offset, len) = match (to_usize(&offset), to_usize(&len)) {
                    (Some(o), Some(l)) => (o, l),
                    _ => return Err(TraceError::MemoryLimit { pc }),
                };
                vm.grow_memory(offset + len, pc)?;
                let digest = keccak256(&vm.memory[offset..offset + len]);
                vm.push(BigUint::from_bytes_be(&digest));
            }
            Opcode::CALLDATALOAD => {
                let offset = vm.pop(&instr)?;
                let word = match to_usize(&offset) {
                    Some(o) => Machine::word_from(vm.calldata, o),
                    None => BigUint::from(0u8),
                };
                vm.push(word);
            }
            Opcode::CALLDATASIZE => vm.push_u64(vm.calldata.len() as u64),
            Opcode::CALLDATACOPY => {
                let (dest, offset, len) = (vm.pop(&instr)?, vm.pop(&instr)?, vm.pop(&instr)?);
                let (dest, offset, len) =
                    match (to_usize(&dest), to_usize(&offset), to_usize(&len)) {
                        (Some(d), Some(o), Some(l)) => (d, o, l),
                        _ => return Err(TraceError::MemoryLimit { pc }),
                    };
                let calldata = vm.calldata.to_vec();
                vm.copy_into_memory(&calldata, dest, offset, len, pc)?;
            }
            Opcode::CODESIZE => vm.push_u64(vm.code.len() as u64),
            Opcode::CODECOPY => {
                let (dest, offset, len) = (vm.pop(&instr)?, vm.pop(&instr)?, vm.pop(&instr)?);
                let (dest, offset, len) =
                    match (to_usize(&dest), to_usize(&offset), to_usize(&len)) {
                        (Some(d), Some(o), Some(l)) => (d, o, l),
                        _ => return Err(TraceError::MemoryLimit { pc }),
                    };
                let code = vm.code.to_vec();
                vm.copy_into_memory(&code, dest, offset, len, pc)?;
            }
            Opcode::MLOAD => {
                let offset = vm.pop(&instr)?;
                let offset = to_usize(&offset).ok_or(TraceError::MemoryLimit { pc })?;
                vm.grow_memory(offset + 32, pc)?;
                let word = Machine::word_from(&vm.memory, offset);
                vm.push(word);
            }
            Opcode::MSTORE => {
                let (offset, value) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let offset = to_usize(&offset).ok_or(TraceError::MemoryLimit { pc })?;
                vm.store_word(offset, &value, pc)?;
            }
            Opcode::MSTORE8 => {
                let (offset, value) = (vm.pop(&instr)?, vm.pop(&instr)?);
                let offset = to_usize(&offset).ok_or(TraceError::MemoryLimit { pc })?;
                vm.grow_memory(offset + 1, pc)?;
                let low = value % BigUint::from(256u16);
                vm.memory[offset] = low.to_bytes_be().last().copied().unwrap_or(0);
            }
            Opcode::SLOAD => {
                let key = vm.pop(&instr)?;
                let value = vm
                    .storage
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| BigUint::from(0u8));
                vm.push(value);
            }
            Opcode::SSTORE => {
                let (key, value) = (vm.pop(&instr)?, vm.pop(&instr)?);
                vm.storage.insert(key, value);
            }
            Opcode::JUMP => {
                let raw = vm.pop(&instr)?;
                let target = to_usize(&raw).unwrap_or(usize::MAX);
                if !jumpdests.contains(&target) {
                    return Err(TraceError::InvalidJump { pc, target });
                }
                next = index_of[&target];
            }
            Opcode::JUMPI => {
                let (raw, condition) = (vm.pop(&instr)?, vm.pop(&instr)?);
                if condition != BigUint::from(0u8) {
                    let target = to_usize(&raw).unwrap_or(usize::MAX);
                    if !jumpdests.contains(&target) {
                        return Err(TraceError::InvalidJump { pc, target });
                    }
                    next = index_of[&target];
                }
            }
            Opcode::JUMPDEST => {}
            Opcode::PC => vm.push_u64(pc as u64),
            Opcode::MSIZE => vm.push_u64(vm.memory.len() as u64),
            Opcode::GAS => vm.push_u64(GAS_STUB),
            // Dummy execution context: zero caller, zero value, zero block
            Opcode::ADDRESS
            | Opcode::ORIGIN
            | Opcode::CALLER
            | Opcode::CALLVALUE
            | Opcode::GASPRICE
            | Opcode::RETURNDATASIZE
            | Opcode::COINBASE
            | Opcode::TIMESTAMP
            | Opcode::NUMBER
            | Opcode::PREVRANDAO
            | Opcode::GASLIMIT
            | Opcode::CHAINID
            | Opcode::SELFBALANCE
            | Opcode::BASEFEE => vm.push_u64(0),
            Opcode::BALANCE | Opcode::EXTCODESIZE | Opcode::EXTCODEHASH | Opcode::BLOCKHASH => {
                vm.pop(&instr)?;
                vm.push_u64(0);
            }
            Opcode::LOG(n) => {
                for _ in 0..(2 + n as usize) {
                    vm.pop(&instr)?;
                }
            }
            // Message calls and contract creation are not modeled; the trace
            // ends where they begin.
            other => {
                tracing::debug!("halting trace at unmodeled opcode {other} (pc={pc:#x})");
                halt = true;
            }
        }

        steps.push(TraceStep {
            pc,
            op: instr.op,
            pushed,
            stack: vm.stack.clone(),
        });
        if halt {
            break;
        }
        idx = next;
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_hex(code: &str, calldata: &str) -> Vec<TraceStep> {
        let code = hex::decode(code).unwrap();
        let calldata = hex::decode(calldata).unwrap();
        run_trace(&code, &calldata).unwrap()
    }

    #[test]
    fn adds_two_literals() {
        // PUSH1 01 PUSH1 02 ADD STOP
        let steps = trace_hex("600160020100", "");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].pushed.as_deref(), Some("01"));
        assert_eq!(steps[2].stack, vec![BigUint::from(3u8)]);
        assert_eq!(steps[3].op, Opcode::STOP);
    }

    #[test]
    fn follows_concrete_jumps() {
        // PUSH1 04 JUMP INVALID JUMPDEST STOP
        let steps = trace_hex("600456fe5b00", "");
        let ops: Vec<Opcode> = steps.iter().map(|s| s.op).collect();
        assert_eq!(
            ops,
            vec![Opcode::PUSH(1), Opcode::JUMP, Opcode::JUMPDEST, Opcode::STOP]
        );
    }

    #[test]
    fn invalid_jump_is_an_error() {
        // PUSH1 03 JUMP (target is not a JUMPDEST)
        let code = hex::decode("600356").unwrap();
        assert!(matches!(
            run_trace(&code, &[]),
            Err(TraceError::InvalidJump { .. })
        ));
    }

    #[test]
    fn reads_calldata() {
        // PUSH1 00 CALLDATALOAD STOP
        let steps = trace_hex("60003500", "ff");
        let expected = BigUint::from(0xffu8) << 248u32;
        assert_eq!(steps[1].stack, vec![expected]);
    }

    #[test]
    fn stack_underflow_is_an_error() {
        let code = hex::decode("01").unwrap(); // ADD on empty stack
        assert!(matches!(
            run_trace(&code, &[]),
            Err(TraceError::StackUnderflow { .. })
        ));
    }

    #[test]
    fn step_ceiling_bounds_infinite_loops() {
        // JUMPDEST PUSH1 00 JUMP
        let code = hex::decode("5b600056").unwrap();
        let steps = run_trace(&code, &[]).unwrap();
        assert_eq!(steps.len(), MAX_STEPS);
    }

    #[test]
    fn halts_at_message_calls() {
        // PUSH1 00 (x6) GAS CALL
        let steps = trace_hex("6000600060006000600060005af1", "");
        assert_eq!(steps.last().unwrap().op, Opcode::CALL);
    }

    #[test]
    fn step_display_includes_stack() {
        let steps = trace_hex("600100", "");
        assert_eq!(
            steps[0].to_string(),
            "000000  PUSH1    0x01\tstack: [0x1]"
        );
    }
}

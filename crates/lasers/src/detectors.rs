//! The individual detectors.

use crate::{Detector, Finding};
use argus_analysis::{ContractInfo, StateSpace};
use argus_core::{Instruction, Opcode};

fn finding(
    title: &'static str,
    contract: &ContractInfo,
    pc: usize,
    description: String,
) -> Finding {
    Finding {
        title,
        contract: contract.name.clone(),
        address: contract.address.clone(),
        pc,
        description,
    }
}

/// Flags any use of ORIGIN. Authenticating against `tx.origin` lets an
/// intermediate contract act on behalf of the original sender.
pub struct TxOrigin;

impl Detector for TxOrigin {
    fn name(&self) -> &'static str {
        "tx-origin"
    }

    fn scan(&self, space: &StateSpace) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (contract, _, instructions) in space.blocks() {
            for instr in instructions {
                if instr.op == Opcode::ORIGIN {
                    findings.push(finding(
                        "Use of tx.origin",
                        contract,
                        instr.pc,
                        "The contract reads tx.origin. Using it for authentication makes \
                         the contract vulnerable to calls relayed through an attacker \
                         contract; use msg.sender instead."
                            .to_string(),
                    ));
                }
            }
        }
        findings
    }
}

/// Flags SELFDESTRUCT in blocks with no caller check in front of it.
pub struct UnprotectedSelfdestruct;

impl Detector for UnprotectedSelfdestruct {
    fn name(&self) -> &'static str {
        "unprotected-selfdestruct"
    }

    fn scan(&self, space: &StateSpace) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (contract, _, instructions) in space.blocks() {
            for (i, instr) in instructions.iter().enumerate() {
                if instr.op != Opcode::SELFDESTRUCT {
                    continue;
                }
                let guarded = instructions[..i].iter().any(|p| p.op == Opcode::CALLER);
                if !guarded {
                    findings.push(finding(
                        "Unprotected SELFDESTRUCT",
                        contract,
                        instr.pc,
                        "A SELFDESTRUCT is reachable without a caller comparison in its \
                         basic block. Anyone who reaches this path can destroy the \
                         contract."
                            .to_string(),
                    ));
                }
            }
        }
        findings
    }
}

/// Flags DELEGATECALL whose target is not a constant address.
pub struct DynamicDelegatecall;

impl Detector for DynamicDelegatecall {
    fn name(&self) -> &'static str {
        "dynamic-delegatecall"
    }

    fn scan(&self, space: &StateSpace) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (contract, _, instructions) in space.blocks() {
            for (i, instr) in instructions.iter().enumerate() {
                if instr.op != Opcode::DELEGATECALL {
                    continue;
                }
                if !has_constant_target(&instructions[..i]) {
                    findings.push(finding(
                        "DELEGATECALL to a dynamic target",
                        contract,
                        instr.pc,
                        "The DELEGATECALL target is not a constant address. If it can \
                         be influenced by a caller, the callee executes with this \
                         contract's storage and balance."
                            .to_string(),
                    ));
                }
            }
        }
        findings
    }
}

fn has_constant_target(before: &[Instruction]) -> bool {
    before
        .iter()
        .rev()
        .find(|p| p.op == Opcode::PUSH(20))
        .and_then(|p| p.imm.as_deref())
        .is_some_and(|imm| imm.len() == 40)
}

/// Flags branches whose condition block reads the block timestamp.
pub struct TimestampDependence;

impl Detector for TimestampDependence {
    fn name(&self) -> &'static str {
        "timestamp-dependence"
    }

    fn scan(&self, space: &StateSpace) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (contract, _, instructions) in space.blocks() {
            let branches = instructions
                .last()
                .is_some_and(|last| last.op == Opcode::JUMPI);
            if !branches {
                continue;
            }
            if let Some(ts) = instructions.iter().find(|i| i.op == Opcode::TIMESTAMP) {
                findings.push(finding(
                    "Dependence on block.timestamp",
                    contract,
                    ts.pc,
                    "Control flow in this block depends on block.timestamp, which a \
                     miner can influence within a small window."
                        .to_string(),
                ));
            }
        }
        findings
    }
}

/// Flags storage writes that follow an external call in the same block, the
/// classic reentrancy shape.
pub struct StateWriteAfterCall;

impl Detector for StateWriteAfterCall {
    fn name(&self) -> &'static str {
        "state-write-after-call"
    }

    fn scan(&self, space: &StateSpace) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (contract, _, instructions) in space.blocks() {
            let Some(call_at) = instructions.iter().position(|i| i.op == Opcode::CALL) else {
                continue;
            };
            for instr in &instructions[call_at + 1..] {
                if instr.op == Opcode::SSTORE {
                    findings.push(finding(
                        "State write after external call",
                        contract,
                        instr.pc,
                        "Storage is written after an external call. A reentrant callee \
                         observes stale state and may drain value before the write \
                         lands."
                            .to_string(),
                    ));
                    break;
                }
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fire;
    use argus_analysis::{Mode, StateSpaceBuilder};
    use argus_core::{indexed_address, ContractSource};

    async fn space_for(code_hex: &str) -> StateSpace {
        let contract =
            ContractSource::new("MAIN", indexed_address(0), hex::decode(code_hex).unwrap());
        StateSpaceBuilder::new(Mode::Full)
            .build(&[contract], None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn origin_use_is_reported() {
        // ORIGIN, POP, STOP
        let space = space_for("325000").await;
        let findings = TxOrigin.scan(&space);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Use of tx.origin");
        assert_eq!(findings[0].pc, 0);
    }

    #[tokio::test]
    async fn unguarded_selfdestruct_is_reported() {
        // PUSH1 00, SELFDESTRUCT
        let space = space_for("6000ff").await;
        assert_eq!(UnprotectedSelfdestruct.scan(&space).len(), 1);

        // CALLER, PUSH1 00, SELFDESTRUCT - caller comparison in the block
        let guarded = space_for("336000ff").await;
        assert!(UnprotectedSelfdestruct.scan(&guarded).is_empty());
    }

    #[tokio::test]
    async fn dynamic_delegatecall_is_reported() {
        // five zero args, GAS, DELEGATECALL - no constant target
        let space = space_for("600060006000600060005af4").await;
        assert_eq!(DynamicDelegatecall.scan(&space).len(), 1);
    }

    #[tokio::test]
    async fn timestamp_branch_is_reported() {
        // TIMESTAMP, PUSH1 06, JUMPI, STOP, JUMPDEST, STOP
        let space = space_for("42600657005b00").await;
        assert_eq!(TimestampDependence.scan(&space).len(), 1);
    }

    #[tokio::test]
    async fn write_after_call_is_reported() {
        // PUSH1 00 x6, GAS, CALL, PUSH1 01, PUSH1 02, SSTORE, STOP
        let space = space_for("6000600060006000600060005af1600160025500").await;
        assert_eq!(StateWriteAfterCall.scan(&space).len(), 1);
    }

    #[tokio::test]
    async fn clean_code_fires_nothing() {
        // PUSH1 01, PUSH1 02, ADD, STOP
        let space = space_for("600160020100").await;
        assert!(fire(&space).is_empty());
    }
}

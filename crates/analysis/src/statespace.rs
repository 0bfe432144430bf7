//! Core state-space construction logic.

use argus_core::{disassemble, ContractSource, Instruction, Opcode};
use argus_utils::errors::ConnectionError;
use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How much detail the space keeps per block.
///
/// `Simplified` is what the graph exporter wants: one summary line per block.
/// `Full` keeps the complete instruction listings the detectors scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Simplified,
    Full,
}

/// Capability to fetch a dependency's runtime code during construction.
/// Implemented by the chain client at the orchestrator boundary.
#[async_trait]
pub trait CodeLoader: Sync {
    async fn code_at(&self, address: &str) -> Result<Vec<u8>, ConnectionError>;
}

/// Identity of one contract inside the space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInfo {
    pub name: String,
    pub address: String,
}

/// Graph node: shared entry/exit plus one node per basic block.
#[derive(Clone, Debug)]
pub enum Node {
    Entry,
    Exit,
    Block {
        /// Index into [`StateSpace::contracts`].
        contract: usize,
        start_pc: usize,
        label: String,
        /// Empty in `Simplified` mode.
        instructions: Vec<Instruction>,
    },
}

/// Control-flow edge kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Fallthrough,
    Jump,
    BranchTrue,
    BranchFalse,
    Call,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fallthrough => "Fallthrough",
            Self::Jump => "Jump",
            Self::BranchTrue => "BranchTrue",
            Self::BranchFalse => "BranchFalse",
            Self::Call => "Call",
        };
        write!(f, "{label}")
    }
}

/// The built state space over all resolved contracts.
pub struct StateSpace {
    pub graph: DiGraph<Node, Edge>,
    pub contracts: Vec<ContractInfo>,
    pub mode: Mode,
}

impl StateSpace {
    /// Iterates every block with its owning contract, in graph order.
    pub fn blocks(&self) -> impl Iterator<Item = (&ContractInfo, usize, &[Instruction])> + '_ {
        self.graph.node_weights().filter_map(move |node| match node {
            Node::Block {
                contract,
                start_pc,
                instructions,
                ..
            } => Some((&self.contracts[*contract], *start_pc, instructions.as_slice())),
            _ => None,
        })
    }
}

struct BasicBlock {
    start_pc: usize,
    instructions: Vec<Instruction>,
}

/// Builds a [`StateSpace`] from resolved contracts.
pub struct StateSpaceBuilder {
    mode: Mode,
}

impl StateSpaceBuilder {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Constructs the space. With a loader, statically addressed message-call
    /// targets are fetched and appended to the space with a `Call` edge from
    /// the calling block; a loader failure aborts construction.
    pub async fn build(
        &self,
        contracts: &[ContractSource],
        loader: Option<&dyn CodeLoader>,
    ) -> Result<StateSpace, ConnectionError> {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(Node::Entry);
        let exit = graph.add_node(Node::Exit);

        let mut infos: Vec<ContractInfo> = Vec::new();
        let mut entry_blocks: Vec<Option<NodeIndex>> = Vec::new();
        let mut call_sites: Vec<(NodeIndex, String)> = Vec::new();

        // Worklist of (name, address, code, primary); dynamic dependencies
        // are appended behind the primary contracts as they are discovered.
        let mut worklist: Vec<(String, String, Vec<u8>, bool)> = contracts
            .iter()
            .map(|c| (c.name.clone(), c.address.clone(), c.code.clone(), true))
            .collect();
        let mut known: HashSet<String> = worklist.iter().map(|(_, a, _, _)| a.clone()).collect();

        let mut next = 0;
        while next < worklist.len() {
            let (name, address, code, primary) = worklist[next].clone();
            next += 1;

            let contract_idx = infos.len();
            infos.push(ContractInfo { name, address });

            let instructions = disassemble(&code);
            let blocks = split_blocks(&instructions);
            tracing::debug!(
                "contract {} split into {} blocks",
                infos[contract_idx].address,
                blocks.len()
            );

            let mut node_of: HashMap<usize, NodeIndex> = HashMap::new();
            for block in &blocks {
                let node = graph.add_node(self.make_node(contract_idx, block));
                node_of.insert(block.start_pc, node);
            }
            entry_blocks.push(blocks.first().map(|b| node_of[&b.start_pc]));
            if primary {
                if let Some(first) = entry_blocks[contract_idx] {
                    graph.add_edge(entry, first, Edge::Fallthrough);
                }
            }

            for (i, block) in blocks.iter().enumerate() {
                let from = node_of[&block.start_pc];
                let Some(last) = block.instructions.last() else {
                    continue;
                };
                match last.op {
                    Opcode::JUMP => {
                        if let Some(target) = static_target(block) {
                            if let Some(&to) = node_of.get(&target) {
                                graph.add_edge(from, to, Edge::Jump);
                            }
                        }
                    }
                    Opcode::JUMPI => {
                        if let Some(target) = static_target(block) {
                            if let Some(&to) = node_of.get(&target) {
                                graph.add_edge(from, to, Edge::BranchTrue);
                            }
                        }
                        if let Some(following) = blocks.get(i + 1) {
                            graph.add_edge(from, node_of[&following.start_pc], Edge::BranchFalse);
                        }
                    }
                    op if op.is_terminal() => {
                        graph.add_edge(from, exit, Edge::Fallthrough);
                    }
                    _ => {
                        if let Some(following) = blocks.get(i + 1) {
                            graph.add_edge(from, node_of[&following.start_pc], Edge::Fallthrough);
                        } else {
                            graph.add_edge(from, exit, Edge::Fallthrough);
                        }
                    }
                }

                if let Some(loader) = loader {
                    for target in call_targets(block) {
                        call_sites.push((from, target.clone()));
                        if known.insert(target.clone()) {
                            tracing::info!("dynamically loading dependency {target}");
                            let dep_code = loader.code_at(&target).await?;
                            if dep_code.is_empty() {
                                tracing::debug!("no code at {target}");
                                continue;
                            }
                            worklist.push((target.clone(), target, dep_code, false));
                        }
                    }
                }
            }
        }

        // Wire call edges now that every dependency has its entry block.
        let index_by_address: HashMap<&str, usize> = infos
            .iter()
            .enumerate()
            .map(|(i, c)| (c.address.as_str(), i))
            .collect();
        for (site, target) in call_sites {
            if let Some(&dep) = index_by_address.get(target.as_str()) {
                if let Some(Some(dep_entry)) = entry_blocks.get(dep) {
                    graph.add_edge(site, *dep_entry, Edge::Call);
                }
            }
        }

        tracing::debug!(
            "state space built: {} nodes, {} edges, {} contracts",
            graph.node_count(),
            graph.edge_count(),
            infos.len()
        );
        Ok(StateSpace {
            graph,
            contracts: infos,
            mode: self.mode,
        })
    }

    fn make_node(&self, contract: usize, block: &BasicBlock) -> Node {
        match self.mode {
            Mode::Simplified => {
                let first = block
                    .instructions
                    .first()
                    .map(|i| i.op.to_string())
                    .unwrap_or_default();
                let last = block
                    .instructions
                    .last()
                    .map(|i| i.op.to_string())
                    .unwrap_or_default();
                Node::Block {
                    contract,
                    start_pc: block.start_pc,
                    label: format!(
                        "{:#x}: {first}..{last} ({} ops)",
                        block.start_pc,
                        block.instructions.len()
                    ),
                    instructions: Vec::new(),
                }
            }
            Mode::Full => {
                let listing: Vec<String> =
                    block.instructions.iter().map(|i| i.to_string()).collect();
                Node::Block {
                    contract,
                    start_pc: block.start_pc,
                    label: listing.join("\n"),
                    instructions: block.instructions.clone(),
                }
            }
        }
    }
}

/// Splits instructions into basic blocks: split before every JUMPDEST, seal
/// after every block-ending opcode.
fn split_blocks(instructions: &[Instruction]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current = BasicBlock {
        start_pc: 0,
        instructions: Vec::new(),
    };

    for instr in instructions {
        if instr.op == Opcode::JUMPDEST && !current.instructions.is_empty() {
            blocks.push(std::mem::replace(
                &mut current,
                BasicBlock {
                    start_pc: instr.pc,
                    instructions: Vec::new(),
                },
            ));
        }
        current.instructions.push(instr.clone());
        if instr.op.is_block_ending() {
            let next_pc = instr.pc + instr.byte_size();
            blocks.push(std::mem::replace(
                &mut current,
                BasicBlock {
                    start_pc: next_pc,
                    instructions: Vec::new(),
                },
            ));
        }
    }
    if !current.instructions.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Static jump target: the PUSH immediately preceding a block-ending
/// JUMP/JUMPI, when present.
fn static_target(block: &BasicBlock) -> Option<usize> {
    let len = block.instructions.len();
    if len < 2 {
        return None;
    }
    let prev = &block.instructions[len - 2];
    if !matches!(prev.op, Opcode::PUSH(_)) {
        return None;
    }
    usize::from_str_radix(prev.imm.as_deref()?, 16).ok()
}

/// Statically addressed message-call targets in a block: for each call-family
/// opcode, the nearest preceding full-width PUSH20 immediate.
fn call_targets(block: &BasicBlock) -> Vec<String> {
    let mut targets = Vec::new();
    for (i, instr) in block.instructions.iter().enumerate() {
        if !instr.op.is_call() {
            continue;
        }
        for prev in block.instructions[..i].iter().rev() {
            if prev.op == Opcode::PUSH(20) {
                if let Some(imm) = &prev.imm {
                    if imm.len() == 40 {
                        targets.push(format!("0x{imm}"));
                    }
                }
                break;
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::indexed_address;

    // PUSH1 01, PUSH1 06, JUMPI, STOP, JUMPDEST, STOP
    const BRANCHING: &str = "6001600657005b00";

    fn contract(code_hex: &str) -> ContractSource {
        ContractSource::new("MAIN", indexed_address(0), hex::decode(code_hex).unwrap())
    }

    #[tokio::test]
    async fn builds_branching_cfg() {
        let space = StateSpaceBuilder::new(Mode::Full)
            .build(&[contract(BRANCHING)], None)
            .await
            .unwrap();

        // entry + exit + three blocks
        assert_eq!(space.graph.node_count(), 5);
        assert_eq!(space.blocks().count(), 3);

        let kinds: Vec<Edge> = space.graph.edge_weights().copied().collect();
        assert!(kinds.contains(&Edge::BranchTrue));
        assert!(kinds.contains(&Edge::BranchFalse));
    }

    #[tokio::test]
    async fn simplified_mode_drops_instruction_bodies() {
        let space = StateSpaceBuilder::new(Mode::Simplified)
            .build(&[contract(BRANCHING)], None)
            .await
            .unwrap();
        for (_, _, instructions) in space.blocks() {
            assert!(instructions.is_empty());
        }
        let labels: Vec<&str> = space
            .graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Block { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert!(labels.iter().all(|l| l.contains("ops")));
    }

    struct FakeLoader;

    #[async_trait]
    impl CodeLoader for FakeLoader {
        async fn code_at(&self, _address: &str) -> Result<Vec<u8>, ConnectionError> {
            Ok(vec![0x00])
        }
    }

    #[tokio::test]
    async fn loads_static_call_dependencies() {
        // PUSH20 <addr>, GAS, CALL, STOP
        let target = "cafecafecafecafecafecafecafecafecafecafe";
        let code = format!("73{target}5af100");
        let space = StateSpaceBuilder::new(Mode::Full)
            .build(&[contract(&code)], Some(&FakeLoader))
            .await
            .unwrap();

        assert_eq!(space.contracts.len(), 2);
        assert_eq!(space.contracts[1].address, format!("0x{target}"));
        assert!(space.graph.edge_weights().any(|e| *e == Edge::Call));
    }
}

//! State-space construction and graph rendering.
//!
//! The state space is the unit every whole-contract analysis consumes: a
//! control-flow graph over the basic blocks of all resolved contracts, with
//! optional on-chain dependency loading at message-call sites.

pub mod render;
pub mod statespace;

pub use render::render;
pub use statespace::{CodeLoader, ContractInfo, Edge, Mode, Node, StateSpace, StateSpaceBuilder};

//! The vulnerability detection suite.
//!
//! Detectors are pattern checks over the blocks of a full state space. Each
//! one is intentionally narrow; the value is in running all of them over
//! every block of every resolved contract (dependencies included) in one
//! pass.

pub mod detectors;

use argus_analysis::StateSpace;
use std::fmt;

/// One reported issue.
#[derive(Clone, Debug)]
pub struct Finding {
    pub title: &'static str,
    pub contract: String,
    pub address: String,
    pub pc: usize,
    pub description: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== {} ====", self.title)?;
        writeln!(f, "Contract: {}", self.contract)?;
        writeln!(f, "Address: {}", self.address)?;
        writeln!(f, "PC: {:#x}", self.pc)?;
        writeln!(f, "{}", self.description)
    }
}

/// A single vulnerability check over a state space.
pub trait Detector {
    fn name(&self) -> &'static str;
    fn scan(&self, space: &StateSpace) -> Vec<Finding>;
}

/// The full registry, in reporting order.
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(detectors::TxOrigin),
        Box::new(detectors::UnprotectedSelfdestruct),
        Box::new(detectors::DynamicDelegatecall),
        Box::new(detectors::TimestampDependence),
        Box::new(detectors::StateWriteAfterCall),
    ]
}

/// Runs every registered detector over the space.
pub fn fire(space: &StateSpace) -> Vec<Finding> {
    let mut findings = Vec::new();
    for detector in default_detectors() {
        tracing::info!("running detector {}", detector.name());
        findings.extend(detector.scan(space));
    }
    findings
}

/// Human-readable report for a set of findings.
pub fn report(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "No issues detected.\n".to_string();
    }
    findings.iter().map(Finding::to_string).collect()
}

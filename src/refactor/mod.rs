//! Chain refactoring: check that a selection is one straight run of
//! nodes, guess its interface, and lift it into its own workflow.

mod analyze;
mod extract;
mod validate;

use serde::Serialize;

pub use analyze::analyze_chain_variables;
pub use extract::extract;
pub use validate::validate;

/// How control reaches the head of a selected chain from outside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predecessor {
    /// A node whose `next` is the head.
    Next(String),
    /// A branch slot whose target is the head.
    Branch { node: String, label: String },
}

impl Predecessor {
    pub fn node(&self) -> &str {
        match self {
            Predecessor::Next(id) => id,
            Predecessor::Branch { node, .. } => node,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSelection {
    pub workflow: String,
    /// Selected ids in `next` order.
    pub chain: Vec<String>,
    pub head: String,
    pub tail: String,
    pub predecessor: Option<Predecessor>,
    pub successor: Option<String>,
}

/// Proposed interface for an extracted chain. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableAnalysis {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub document: String,
    pub workflow: String,
    pub call_id: String,
    /// Node ids moved into the new workflow, chain first, then reporters.
    pub moved: Vec<String>,
}

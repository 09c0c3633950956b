//! Graph extraction: rebuilds the chain / branch / reporter / orphan tree
//! of each workflow from the document text.

mod extract;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dsl::{Interface, ValueKind, Variable};

pub use extract::Extractor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphTree {
    pub workflows: Vec<WorkflowTree>,
}

impl GraphTree {
    pub fn workflow(&self, name: &str) -> Option<&WorkflowTree> {
        self.workflows.iter().find(|w| w.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowTree {
    pub name: String,
    pub interface: Interface,
    pub variables: Vec<Variable>,
    /// Main chain, starting with the `start` node.
    pub chain: Vec<TreeNode>,
    pub orphans: Vec<Fragment>,
}

impl WorkflowTree {
    /// Ids of the main chain, in order.
    pub fn chain_ids(&self) -> Vec<&str> {
        self.chain.iter().map(|n| n.id.as_str()).collect()
    }

    /// Ids placed in the main chain or any branch sub-chain below it.
    pub fn placed_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for node in &self.chain {
            node.collect_placed(&mut out);
        }
        out
    }

    pub fn orphan_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for fragment in &self.orphans {
            for node in &fragment.chain {
                node.collect_placed(&mut out);
            }
        }
        out
    }

    /// Finds a placed node anywhere in the main chain or its branches.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.chain.iter().find_map(|n| n.find(id))
    }
}

/// A run of disconnected nodes linked by their own `next` pointers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub head: String,
    pub chain: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub opcode: String,
    pub inputs: BTreeMap<String, FormattedValue>,
    pub branches: Vec<BranchTree>,
}

impl TreeNode {
    pub fn branch(&self, label: &str) -> Option<&BranchTree> {
        self.branches.iter().find(|b| b.label == label)
    }

    fn collect_placed<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(self.id.as_str());
        for branch in &self.branches {
            for node in &branch.chain {
                node.collect_placed(out);
            }
        }
    }

    fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.branches
            .iter()
            .flat_map(|b| b.chain.iter())
            .find_map(|n| n.find(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTree {
    pub label: String,
    pub target: Option<String>,
    pub chain: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
}

/// A non-branch input as the rendering layer shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedValue {
    pub kind: ValueKind,
    pub text: String,
    /// The embedded node for `node` inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Box<TreeNode>>,
}

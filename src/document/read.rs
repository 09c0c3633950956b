//! Read-only snapshots of workflow slices.
//!
//! Each node, interface and variables block is located through the
//! locator and deserialized on its own; nothing here is retained across
//! commands.

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use tracing::warn;

use crate::document::format::{block_value, classify, scalar_id, yaml_to_json};
use crate::document::locator::{self, Block, WorkflowSpan};
use crate::dsl::{Interface, Slot, Value, Variable};

#[derive(Debug, Default, Deserialize)]
struct RawNode {
    #[serde(default)]
    opcode: String,
    #[serde(default)]
    next: Option<YamlValue>,
    #[serde(default)]
    inputs: Option<YamlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: String,
    pub opcode: String,
    pub next: Option<String>,
    pub inputs: Vec<(String, YamlValue)>,
}

impl NodeSnapshot {
    pub fn input(&self, key: &str) -> Option<&YamlValue> {
        self.inputs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn slot(&self, key: &str) -> Option<Slot> {
        self.input(key).and_then(classify)
    }

    /// Reporter ids referenced through `{ node: id }` inputs.
    pub fn reporter_refs(&self) -> Vec<String> {
        self.inputs
            .iter()
            .filter_map(|(_, v)| match classify(v) {
                Some(Slot::Value(Value::Node(id))) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub name: String,
    pub interface: Interface,
    pub variables: Vec<Variable>,
    pub nodes: Vec<NodeSnapshot>,
}

impl WorkflowSnapshot {
    pub fn node(&self, id: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

pub fn read_node(lines: &[String], block: &Block) -> Option<NodeSnapshot> {
    let raw = match block_value(lines, block) {
        Some(YamlValue::Null) => RawNode::default(),
        Some(v) => match serde_yaml::from_value::<RawNode>(v) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(node = %block.key, error = %e, "Unreadable node block");
                return None;
            }
        },
        None => {
            warn!(node = %block.key, "Node block is not valid YAML");
            return None;
        }
    };

    let inputs = match raw.inputs {
        Some(YamlValue::Mapping(map)) => map
            .into_iter()
            .filter_map(|(k, v)| scalar_id(&k).map(|k| (k, v)))
            .collect(),
        _ => Vec::new(),
    };

    Some(NodeSnapshot {
        id: block.key.clone(),
        opcode: raw.opcode,
        next: raw.next.as_ref().and_then(scalar_id),
        inputs,
    })
}

pub fn read_interface(lines: &[String], span: &WorkflowSpan) -> Interface {
    let Some(value) = locator::workflow_block(lines, span, "interface")
        .and_then(|b| block_value(lines, &b))
    else {
        return Interface::default();
    };
    if value.is_null() {
        return Interface::default();
    }
    serde_yaml::from_value(value).unwrap_or_else(|e| {
        warn!(workflow = %span.name, error = %e, "Unreadable interface block");
        Interface::default()
    })
}

pub fn read_variables(lines: &[String], span: &WorkflowSpan) -> Vec<Variable> {
    match locator::workflow_block(lines, span, "variables").and_then(|b| block_value(lines, &b)) {
        Some(YamlValue::Mapping(map)) => map
            .iter()
            .filter_map(|(k, v)| scalar_id(k).map(|name| Variable::new(name, yaml_to_json(v))))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn read_workflow(lines: &[String], span: &WorkflowSpan) -> WorkflowSnapshot {
    WorkflowSnapshot {
        name: span.name.clone(),
        interface: read_interface(lines, span),
        variables: read_variables(lines, span),
        nodes: locator::workflow_nodes(lines, span)
            .iter()
            .filter_map(|b| read_node(lines, b))
            .collect(),
    }
}

pub fn read_document(lines: &[String]) -> Vec<WorkflowSnapshot> {
    locator::workflows(lines)
        .iter()
        .map(|span| read_workflow(lines, span))
        .collect()
}

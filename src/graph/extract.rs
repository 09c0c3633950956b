use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde_yaml::Value as YamlValue;
use tracing::{debug, warn};

use crate::document::format::{classify, display_value, yaml_to_json};
use crate::document::read::{self, NodeSnapshot, WorkflowSnapshot};
use crate::document::Lines;
use crate::dsl::{START, Slot, Value};
use crate::graph::{BranchTree, Fragment, FormattedValue, GraphTree, TreeNode, WorkflowTree};
use crate::schema::{BranchShape, ConstructSchema, family_index};

/// Builds [`GraphTree`]s from document text. Always runs from scratch.
pub struct Extractor<'a> {
    schema: &'a ConstructSchema,
}

impl<'a> Extractor<'a> {
    pub fn new(schema: &'a ConstructSchema) -> Self {
        Self { schema }
    }

    pub fn extract(&self, doc: &str) -> GraphTree {
        let lines = Lines::parse(doc);
        GraphTree {
            workflows: read::read_document(lines.as_slice())
                .iter()
                .map(|w| self.build_workflow(w))
                .collect(),
        }
    }

    pub fn extract_workflow(&self, doc: &str, workflow: &str) -> Option<WorkflowTree> {
        let lines = Lines::parse(doc);
        let span = crate::document::locator::workflow_span(lines.as_slice(), workflow)?;
        Some(self.build_workflow(&read::read_workflow(lines.as_slice(), &span)))
    }

    pub(crate) fn build_workflow(&self, snapshot: &WorkflowSnapshot) -> WorkflowTree {
        let mut walk = Walk {
            schema: self.schema,
            nodes: snapshot.nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
            chained: HashSet::new(),
            visited: HashSet::new(),
            embedding: Vec::new(),
        };

        let chain = if walk.nodes.contains_key(START) {
            walk.chain(Some(START))
        } else {
            Vec::new()
        };
        let orphans = walk.orphans(snapshot);

        WorkflowTree {
            name: snapshot.name.clone(),
            interface: snapshot.interface.clone(),
            variables: snapshot.variables.clone(),
            chain,
            orphans,
        }
    }
}

struct Walk<'a> {
    schema: &'a ConstructSchema,
    nodes: HashMap<&'a str, &'a NodeSnapshot>,
    /// Nodes placed in some chain.
    chained: HashSet<String>,
    /// Chained nodes plus every reporter reached from them.
    visited: HashSet<String>,
    /// Reporters currently being expanded, to stop reference cycles.
    embedding: Vec<String>,
}

impl<'a> Walk<'a> {
    fn chain(&mut self, head: Option<&str>) -> Vec<TreeNode> {
        let mut out = Vec::new();
        let mut current = head.map(str::to_string);
        while let Some(id) = current {
            // A node is drawn once, whether in a chain or inside its referrer.
            if self.visited.contains(&id) {
                debug!(node = %id, "Chain re-enters a placed node; stopping");
                break;
            }
            let Some(node) = self.nodes.get(id.as_str()).copied() else {
                debug!(node = %id, "Dangling next/branch target");
                break;
            };
            self.chained.insert(id.clone());
            self.visited.insert(id);
            out.push(self.build(node));
            current = node.next.clone();
        }
        out
    }

    fn build(&mut self, node: &'a NodeSnapshot) -> TreeNode {
        let (branch_slots, values) = self.partition(node);

        let mut inputs = BTreeMap::new();
        for (key, value) in values {
            let formatted = self.format_input(value);
            inputs.insert(key, formatted);
        }

        let branches = branch_slots
            .into_iter()
            .map(|(label, slot)| {
                let (target, exception_type) = match slot {
                    Slot::Handler {
                        exception_type,
                        body,
                    } => (body, Some(exception_type)),
                    Slot::Value(Value::Branch(target)) => (target, None),
                    Slot::Value(_) => (None, None),
                };
                let chain = self.chain(target.as_deref());
                BranchTree {
                    label,
                    target,
                    chain,
                    exception_type,
                }
            })
            .collect();

        TreeNode {
            id: node.id.clone(),
            opcode: node.opcode.clone(),
            inputs,
            branches,
        }
    }

    /// Splits a node's inputs into branch slots (schema-declared first, then
    /// any other branch-shaped input) and plain values.
    fn partition(&self, node: &NodeSnapshot) -> (Vec<(String, Slot)>, Vec<(String, Value)>) {
        let mut branches = Vec::new();
        let mut claimed: HashSet<&str> = HashSet::new();

        if let Some(spec) = self.schema.opcode(&node.opcode) {
            for decl in &spec.branches {
                if decl.dynamic {
                    if let Some(YamlValue::Sequence(items)) = node.input(&decl.name) {
                        claimed.insert(decl.name.as_str());
                        for (i, item) in items.iter().enumerate() {
                            if let Some(slot) = as_branch(item, decl.shape) {
                                branches.push((format!("{}{}", decl.name, i + 1), slot));
                            }
                        }
                    }
                    let mut members: Vec<(u32, &str, &YamlValue)> = node
                        .inputs
                        .iter()
                        .filter_map(|(k, v)| {
                            family_index(k, &decl.name).map(|n| (n, k.as_str(), v))
                        })
                        .collect();
                    members.sort_by_key(|(n, _, _)| *n);
                    for (_, key, raw) in members {
                        if let Some(slot) = as_branch(raw, decl.shape) {
                            claimed.insert(key);
                            branches.push((key.to_string(), slot));
                        }
                    }
                } else if let Some((key, raw)) =
                    node.inputs.iter().find(|(k, _)| *k == decl.name)
                {
                    if let Some(slot) = as_branch(raw, decl.shape) {
                        claimed.insert(key.as_str());
                        branches.push((key.clone(), slot));
                    }
                }
            }
        }

        let mut values = Vec::new();
        for (key, raw) in &node.inputs {
            if claimed.contains(key.as_str()) {
                continue;
            }
            match classify(raw) {
                Some(slot) if slot.is_branch() => branches.push((key.clone(), slot)),
                Some(Slot::Value(value)) => values.push((key.clone(), value)),
                Some(Slot::Handler { .. }) => {}
                None => {
                    warn!(node = %node.id, input = %key, "Unrecognized input shape");
                    values.push((key.clone(), Value::Literal(yaml_to_json(raw))));
                }
            }
        }
        (branches, values)
    }

    fn format_input(&mut self, value: Value) -> FormattedValue {
        let reporter = match &value {
            Value::Node(id) => self.reporter(id),
            _ => None,
        };
        FormattedValue {
            kind: value.kind(),
            text: display_value(&value),
            reporter,
        }
    }

    fn reporter(&mut self, id: &str) -> Option<Box<TreeNode>> {
        if self.embedding.iter().any(|e| e == id) || self.chained.contains(id) {
            return None;
        }
        let Some(node) = self.nodes.get(id).copied() else {
            debug!(node = id, "Reporter reference points at nothing");
            return None;
        };
        self.visited.insert(id.to_string());
        self.embedding.push(id.to_string());
        let tree = self.build(node);
        self.embedding.pop();
        Some(Box::new(tree))
    }

    /// Fragments of nodes reached neither from the main chain nor as a
    /// reporter. Heads come in ascending id order.
    fn orphans(&mut self, snapshot: &'a WorkflowSnapshot) -> Vec<Fragment> {
        let unvisited: Vec<&NodeSnapshot> = snapshot
            .nodes
            .iter()
            .filter(|n| n.id != START && !self.visited.contains(&n.id))
            .collect();

        // Reporters of disconnected nodes are drawn inside their referrers.
        let mut embedded: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = unvisited.iter().flat_map(|n| n.reporter_refs()).collect();
        while let Some(id) = stack.pop() {
            if self.visited.contains(&id) || !embedded.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(id.as_str()) {
                stack.extend(node.reporter_refs());
            }
        }

        let orphan_ids: BTreeSet<&str> = unvisited
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !embedded.contains(*id))
            .collect();
        let targeted: HashSet<&str> = unvisited
            .iter()
            .filter(|n| orphan_ids.contains(n.id.as_str()))
            .filter_map(|n| n.next.as_deref())
            .filter(|t| orphan_ids.contains(t))
            .collect();

        let mut fragments = Vec::new();
        let heads = orphan_ids.iter().filter(|id| !targeted.contains(*id));
        // Cycles have no head; whatever is left starts from its smallest id.
        let leftovers = orphan_ids.iter();
        for head in heads.chain(leftovers) {
            if self.visited.contains(*head) {
                continue;
            }
            let chain = self.chain(Some(*head));
            fragments.push(Fragment {
                head: head.to_string(),
                chain,
            });
        }
        fragments
    }
}

/// Reads a value found in a branch position. A null placeholder is an
/// empty slot of the declared shape.
fn as_branch(raw: &YamlValue, shape: BranchShape) -> Option<Slot> {
    match classify(raw) {
        Some(slot) if slot.is_branch() => Some(slot),
        Some(Slot::Value(Value::Literal(v))) if v.is_null() => Some(match shape {
            BranchShape::Plain => Slot::branch(None),
            BranchShape::Handler => Slot::handler(None),
        }),
        _ => None,
    }
}

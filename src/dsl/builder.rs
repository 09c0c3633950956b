//! Fluent construction of canonical document text, mostly for tests and
//! for `flowtext init`.

use serde_json::Value as JsonValue;

use crate::document::INDENT;
use crate::document::format::{render_node, render_workflow};
use crate::dsl::{Interface, InterfaceInput, START, Slot, Value, Variable};

#[derive(Debug, Default)]
pub struct DocumentBuilder {
    workflows: Vec<Vec<String>>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workflow(self, name: &str) -> WorkflowBuilder {
        WorkflowBuilder {
            document: self,
            name: name.to_string(),
            interface: Interface::default(),
            variables: Vec::new(),
            start_next: None,
            nodes: Vec::new(),
        }
    }

    pub fn build(self) -> String {
        if self.workflows.is_empty() {
            return "workflows: []\n".to_string();
        }
        let mut out = vec!["workflows:".to_string()];
        out.extend(self.workflows.into_iter().flatten());
        out.join("\n") + "\n"
    }
}

pub struct WorkflowBuilder {
    document: DocumentBuilder,
    name: String,
    interface: Interface,
    variables: Vec<Variable>,
    start_next: Option<String>,
    nodes: Vec<Vec<String>>,
}

impl WorkflowBuilder {
    pub fn input(mut self, name: &str, kind: &str, required: bool) -> Self {
        self.interface.inputs.push(InterfaceInput::new(name, kind, required));
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.interface.outputs.push(name.to_string());
        self
    }

    pub fn var(mut self, name: &str, default: impl Into<JsonValue>) -> Self {
        self.variables.push(Variable::new(name, default));
        self
    }

    /// Where the `start` node points.
    pub fn start(mut self, next: &str) -> Self {
        self.start_next = Some(next.to_string());
        self
    }

    pub fn node(self, id: &str, opcode: &str) -> NodeBuilder {
        NodeBuilder {
            workflow: self,
            id: id.to_string(),
            opcode: opcode.to_string(),
            next: None,
            slots: Vec::new(),
        }
    }

    pub fn build(mut self) -> DocumentBuilder {
        let mut blocks = vec![render_node(START, "start", self.start_next.as_deref(), &[], 0)];
        blocks.append(&mut self.nodes);
        self.document.workflows.push(render_workflow(
            &self.name,
            &self.interface,
            &self.variables,
            &blocks,
            INDENT,
        ));
        self.document
    }
}

pub struct NodeBuilder {
    workflow: WorkflowBuilder,
    id: String,
    opcode: String,
    next: Option<String>,
    slots: Vec<(String, Slot)>,
}

impl NodeBuilder {
    pub fn next(mut self, id: &str) -> Self {
        self.next = Some(id.to_string());
        self
    }

    pub fn input(mut self, key: &str, value: Value) -> Self {
        self.slots.push((key.to_string(), Slot::Value(value)));
        self
    }

    pub fn literal(self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.input(key, Value::literal(value))
    }

    pub fn variable(self, key: &str, name: &str) -> Self {
        self.input(key, Value::variable(name))
    }

    pub fn reporter(self, key: &str, id: &str) -> Self {
        self.input(key, Value::node(id))
    }

    pub fn branch(mut self, label: &str, target: Option<&str>) -> Self {
        self.slots.push((label.to_string(), Slot::branch(target)));
        self
    }

    pub fn handler(mut self, label: &str, exception_type: &str, body: Option<&str>) -> Self {
        self.slots.push((
            label.to_string(),
            Slot::Handler {
                exception_type: exception_type.to_string(),
                body: body.map(str::to_string),
            },
        ));
        self
    }

    pub fn build(mut self) -> WorkflowBuilder {
        let block = render_node(&self.id, &self.opcode, self.next.as_deref(), &self.slots, 0);
        self.workflow.nodes.push(block);
        self.workflow
    }
}

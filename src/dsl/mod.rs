pub mod builder;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Exception type written into freshly created handler slots.
pub const DEFAULT_EXCEPTION_TYPE: &str = "Exception";

/// Id of the chain root every workflow carries.
pub const START: &str = "start";

/// Name of the entry workflow. It can never be deleted.
pub const MAIN: &str = "main";

/// A value held by one node input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Literal(JsonValue),
    Variable(String),
    /// Output of another node (a reporter) consumed as this input.
    Node(String),
    /// First node of a branch sub-chain; `None` reserves an empty slot.
    Branch(Option<String>),
    WorkflowCall(String),
}

impl Value {
    pub fn literal(v: impl Into<JsonValue>) -> Self {
        Value::Literal(v.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Value::Variable(name.into())
    }

    pub fn node(id: impl Into<String>) -> Self {
        Value::Node(id.into())
    }

    pub fn branch(target: Option<&str>) -> Self {
        Value::Branch(target.map(str::to_string))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Literal(_) => ValueKind::Literal,
            Value::Variable(_) => ValueKind::Variable,
            Value::Node(_) => ValueKind::Node,
            Value::Branch(_) => ValueKind::Branch,
            Value::WorkflowCall(_) => ValueKind::WorkflowCall,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Literal,
    Variable,
    Node,
    Branch,
    WorkflowCall,
}

/// Content of one `inputs` entry: a plain value, or a catch-style handler
/// record `{exception_type, body: {branch}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Handler {
        exception_type: String,
        body: Option<String>,
    },
}

impl Slot {
    pub fn branch(target: Option<&str>) -> Self {
        Slot::Value(Value::branch(target))
    }

    pub fn handler(target: Option<&str>) -> Self {
        Slot::Handler {
            exception_type: DEFAULT_EXCEPTION_TYPE.to_string(),
            body: target.map(str::to_string),
        }
    }

    /// `Some(target)` for branch-shaped slots, `None` for plain values.
    pub fn branch_target(&self) -> Option<Option<&str>> {
        match self {
            Slot::Value(Value::Branch(t)) => Some(t.as_deref()),
            Slot::Handler { body, .. } => Some(body.as_deref()),
            Slot::Value(_) => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.branch_target().is_some()
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Value(v) => Some(v),
            Slot::Handler { .. } => None,
        }
    }
}

impl From<Value> for Slot {
    fn from(v: Value) -> Self {
        Slot::Value(v)
    }
}

/// Declared parameters and results of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(default)]
    pub inputs: Vec<InterfaceInput>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInput {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
}

fn any_type() -> String {
    "any".to_string()
}

impl InterfaceInput {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            required,
        }
    }
}

/// A workflow variable and its default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub default: JsonValue,
}

impl Variable {
    pub fn new(name: impl Into<String>, default: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

/// Palette entry used to create a node: an opcode plus its parameter
/// defaults. Parameter names become upper-case input keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

impl NodeTemplate {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            name: opcode.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, default: impl Into<JsonValue>) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            default: Some(default.into()),
        });
        self
    }
}

//! Construct schema: which inputs and branch slots each opcode declares.
//!
//! The schema is static configuration. The engine and the extractor only
//! read it; [`ConstructSchema::builtin`] is the default catalog and
//! [`ConstructSchema::from_yaml_str`] loads a replacement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Any value: literal, variable or reporter.
    #[default]
    Value,
    /// Names a workflow variable.
    Variable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    pub name: String,
    #[serde(default)]
    pub kind: InputKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchShape {
    /// `LABEL: { branch: id }`
    #[default]
    Plain,
    /// `LABEL: { exception_type, body: { branch: id } }`
    Handler,
}

/// A branch slot. With `dynamic`, `name` is the prefix of a numbered
/// family (`CATCH` for `CATCH1`, `CATCH2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDecl {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub shape: BranchShape,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpcodeSpec {
    #[serde(default)]
    pub inputs: Vec<InputDecl>,
    #[serde(default)]
    pub branches: Vec<BranchDecl>,
    #[serde(default)]
    pub dynamic_branches: bool,
    #[serde(default)]
    pub dynamic_inputs: bool,
    /// Prefix of the numbered input family when `dynamic_inputs` is set.
    #[serde(default)]
    pub input_prefix: Option<String>,
    /// Prefix for generated node ids; defaults to the opcode up to its first `_`.
    #[serde(default)]
    pub id_prefix: Option<String>,
    /// The opcode writes the variables named by its `variable` inputs.
    #[serde(default)]
    pub assigns: bool,
}

impl OpcodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, name: &str, default: impl Into<JsonValue>) -> Self {
        self.inputs.push(InputDecl {
            name: name.to_string(),
            kind: InputKind::Value,
            required: true,
            default: Some(default.into()),
        });
        self
    }

    pub fn variable_input(mut self, name: &str) -> Self {
        self.inputs.push(InputDecl {
            name: name.to_string(),
            kind: InputKind::Variable,
            required: true,
            default: None,
        });
        self
    }

    pub fn branch(mut self, name: &str) -> Self {
        self.branches.push(BranchDecl {
            name: name.to_string(),
            required: false,
            dynamic: false,
            shape: BranchShape::Plain,
        });
        self
    }

    pub fn branch_family(mut self, prefix: &str, shape: BranchShape) -> Self {
        self.branches.push(BranchDecl {
            name: prefix.to_string(),
            required: false,
            dynamic: true,
            shape,
        });
        self.dynamic_branches = true;
        self
    }

    pub fn input_family(mut self, prefix: &str) -> Self {
        self.dynamic_inputs = true;
        self.input_prefix = Some(prefix.to_string());
        self
    }

    pub fn id_prefix(mut self, prefix: &str) -> Self {
        self.id_prefix = Some(prefix.to_string());
        self
    }

    pub fn assigns(mut self) -> Self {
        self.assigns = true;
        self
    }

    pub fn is_branching(&self) -> bool {
        !self.branches.is_empty()
    }

    /// Declaration owning `label`, either by exact name or by family prefix.
    pub fn branch_for(&self, label: &str) -> Option<&BranchDecl> {
        self.branches.iter().find(|b| {
            if b.dynamic {
                family_index(label, &b.name).is_some()
            } else {
                b.name == label
            }
        })
    }

    pub fn branch_family_named(&self, prefix: &str) -> Option<&BranchDecl> {
        self.branches.iter().find(|b| b.dynamic && b.name == prefix)
    }

    pub fn input_decl(&self, name: &str) -> Option<&InputDecl> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// Number of a family member: `family_index("CATCH12", "CATCH") == Some(12)`.
pub fn family_index(label: &str, prefix: &str) -> Option<u32> {
    let digits = label.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructSchema {
    opcodes: BTreeMap<String, OpcodeSpec>,
}

impl ConstructSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, opcode: &str, spec: OpcodeSpec) -> Self {
        self.opcodes.insert(opcode.to_string(), spec);
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        let schema: ConstructSchema = serde_yaml::from_str(text)?;
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<(), SchemaError> {
        for (opcode, spec) in &self.opcodes {
            let mut seen = std::collections::HashSet::new();
            for b in &spec.branches {
                if !seen.insert(b.name.as_str()) {
                    return Err(SchemaError::DuplicateBranch {
                        opcode: opcode.clone(),
                        name: b.name.clone(),
                    });
                }
                if b.dynamic && b.name.ends_with(|c: char| c.is_ascii_digit()) {
                    return Err(SchemaError::InvalidFamily {
                        opcode: opcode.clone(),
                        name: b.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn opcode(&self, name: &str) -> Option<&OpcodeSpec> {
        self.opcodes.get(name)
    }

    pub fn opcodes(&self) -> impl Iterator<Item = (&str, &OpcodeSpec)> {
        self.opcodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_branching(&self, opcode: &str) -> bool {
        self.opcode(opcode).is_some_and(OpcodeSpec::is_branching)
    }

    /// Shape of a branch slot. Unknown labels fall back to the `CATCH`
    /// naming convention.
    pub fn branch_shape(&self, opcode: &str, label: &str) -> BranchShape {
        match self.opcode(opcode).and_then(|s| s.branch_for(label)) {
            Some(decl) => decl.shape,
            None if family_index(label, "CATCH").is_some() => BranchShape::Handler,
            None => BranchShape::Plain,
        }
    }

    pub fn id_prefix(&self, opcode: &str) -> String {
        self.opcode(opcode)
            .and_then(|s| s.id_prefix.clone())
            .unwrap_or_else(|| opcode.split('_').next().unwrap_or(opcode).to_string())
    }

    /// Default catalog.
    pub fn builtin() -> Self {
        ConstructSchema::new()
            .with("start", OpcodeSpec::new())
            .with("io_print", OpcodeSpec::new().input("MESSAGE", ""))
            .with("io_input", OpcodeSpec::new().input("PROMPT", ""))
            .with(
                "data_set_variable",
                OpcodeSpec::new().variable_input("VARIABLE").input("VALUE", 0).assigns(),
            )
            .with(
                "data_change_variable",
                OpcodeSpec::new().variable_input("VARIABLE").input("BY", 1).assigns(),
            )
            .with("data_get_variable", OpcodeSpec::new().variable_input("VARIABLE"))
            .with("operator_add", OpcodeSpec::new().input("A", 0).input("B", 0))
            .with("operator_subtract", OpcodeSpec::new().input("A", 0).input("B", 0))
            .with("operator_equals", OpcodeSpec::new().input("A", 0).input("B", 0))
            .with("operator_less_than", OpcodeSpec::new().input("A", 0).input("B", 0))
            .with("operator_not", OpcodeSpec::new().input("OPERAND", false))
            .with("operator_join", OpcodeSpec::new().input("A", "").input("B", ""))
            .with(
                "control_if",
                OpcodeSpec::new().input("CONDITION", false).branch("THEN"),
            )
            .with(
                "control_if_else",
                OpcodeSpec::new()
                    .input("CONDITION", false)
                    .branch("THEN")
                    .branch("ELSE"),
            )
            .with("control_repeat", OpcodeSpec::new().input("TIMES", 10).branch("BODY"))
            .with("control_while", OpcodeSpec::new().input("CONDITION", false).branch("BODY"))
            .with(
                "control_for_each",
                OpcodeSpec::new()
                    .variable_input("VARIABLE")
                    .input("LIST", JsonValue::Array(Vec::new()))
                    .branch("BODY"),
            )
            .with(
                "control_try",
                OpcodeSpec::new()
                    .branch("TRY")
                    .branch_family("CATCH", BranchShape::Handler)
                    .branch("FINALLY"),
            )
            .with(
                "control_fork",
                OpcodeSpec::new().branch_family("BRANCH", BranchShape::Plain),
            )
            .with("control_wait", OpcodeSpec::new().input("SECONDS", 1))
            .with(
                "workflow_call",
                OpcodeSpec::new()
                    .input("WORKFLOW", "")
                    .input_family("ARG")
                    .id_prefix("call"),
            )
            .with("workflow_return", OpcodeSpec::new().input("VALUE", JsonValue::Null))
    }
}

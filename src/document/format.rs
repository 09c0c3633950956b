//! Scalar formatter: canonical text for values and slots, and the inverse
//! classification of text already in a document.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::document::locator::Block;
use crate::document::{INDENT, rebase};
use crate::dsl::{DEFAULT_EXCEPTION_TYPE, Interface, Slot, Value, Variable};

const RESERVED_FIRST: &[char] = &[
    '-', '?', '!', '&', '*', '|', '>', '%', '@', '`', '$', '~', '=', '<', '+', '.',
];
const RESERVED_ANY: &[char] = &[
    ':', '#', ',', '[', ']', '{', '}', '"', '\'', '\\', '\n', '\r', '\t',
];
const KEYWORDS: &[&str] = &[
    "true", "false", "null", "~", "yes", "no", "on", "off", "y", "n",
];

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

/// Strips YAML quoting from a scalar or key.
pub fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        if let Ok(s) = serde_json::from_str::<String>(raw) {
            return s;
        }
        return raw[1..raw.len() - 1].to_string();
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].replace("''", "'");
    }
    raw.to_string()
}

/// Whether a string would be mis-read (or break the line) without quotes.
pub fn needs_quotes(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return true;
    };
    s != s.trim()
        || s.contains(RESERVED_ANY)
        || RESERVED_FIRST.contains(&first)
        || first.is_ascii_digit()
        || KEYWORDS.contains(&s.to_ascii_lowercase().as_str())
        || s.parse::<f64>().is_ok()
        || s.chars().any(needs_escape)
}

/// Characters YAML either rejects in plain scalars or folds as line breaks.
fn needs_escape(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}

pub fn format_string(s: &str) -> String {
    if needs_quotes(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

/// Double-quoted form, always.
pub fn quote(s: &str) -> String {
    // JSON escaping covers quotes and C0 controls; the rest go out as `\uXXXX`.
    let json = JsonValue::String(s.to_string()).to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if needs_escape(c) {
            out.push_str(&format!("\\u{:04x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// One-line YAML rendering of a literal. Collections use flow style.
pub fn format_scalar(v: &JsonValue) -> String {
    match v {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => format_string(s),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(format_scalar).collect();
            format!("[{}]", items.join(", "))
        }
        JsonValue::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", format_string(k), format_scalar(v)))
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
    }
}

fn format_target(target: Option<&str>) -> String {
    target.map(format_string).unwrap_or_else(|| "null".to_string())
}

/// Inline slot text, e.g. `{ literal: 3 }` or `{ variable: "count" }`.
pub fn format_value(v: &Value) -> String {
    match v {
        Value::Literal(l) => format!("{{ literal: {} }}", format_scalar(l)),
        Value::Variable(name) => format!("{{ variable: {} }}", quote(name)),
        Value::Node(id) => format!("{{ node: {} }}", format_string(id)),
        Value::Branch(t) => format!("{{ branch: {} }}", format_target(t.as_deref())),
        Value::WorkflowCall(name) => {
            format!("{{ workflow_call: {} }}", quote(name))
        }
    }
}

/// Text shown in an input box; `parse_edit` reads it back.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::Literal(l) => format_scalar(l),
        Value::Variable(name) => format!("${}", name),
        Value::Node(id) => id.clone(),
        Value::Branch(t) => t.clone().unwrap_or_default(),
        Value::WorkflowCall(name) => name.clone(),
    }
}

/// Reinterprets free text typed into an input box.
pub fn parse_edit(raw: &str) -> Value {
    let t = raw.trim();
    if let Some(name) = t.strip_prefix('$') {
        if !name.is_empty() {
            return Value::Variable(name.to_string());
        }
    }
    if let Ok(v) = serde_json::from_str::<JsonValue>(t) {
        return Value::Literal(v);
    }
    if t.starts_with('[') || t.starts_with('{') {
        if let Ok(v) = serde_yaml::from_str::<YamlValue>(t) {
            return Value::Literal(yaml_to_json(&v));
        }
    }
    Value::Literal(JsonValue::String(raw.to_string()))
}

pub fn yaml_to_json(v: &YamlValue) -> JsonValue {
    serde_json::to_value(v).unwrap_or(JsonValue::Null)
}

/// Node ids written as YAML scalars; `null` means no target.
pub fn scalar_id(v: &YamlValue) -> Option<String> {
    match v {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Classifies a parsed slot. `None` means the shape is not recognized.
pub fn classify(v: &YamlValue) -> Option<Slot> {
    let map = match v {
        YamlValue::Mapping(map) => map,
        YamlValue::Tagged(_) => return None,
        other => return Some(Slot::Value(Value::Literal(yaml_to_json(other)))),
    };

    if let Some(body) = map.get("body") {
        let exception_type = map
            .get("exception_type")
            .and_then(scalar_id)
            .unwrap_or_else(|| DEFAULT_EXCEPTION_TYPE.to_string());
        let body = match body {
            YamlValue::Mapping(inner) => inner.get("branch").and_then(scalar_id),
            YamlValue::Null => None,
            _ => return None,
        };
        return Some(Slot::Handler {
            exception_type,
            body,
        });
    }

    if map.len() != 1 {
        return None;
    }
    let (key, inner) = map.iter().next()?;
    let value = match key.as_str()? {
        "literal" => Value::Literal(yaml_to_json(inner)),
        "variable" => Value::Variable(scalar_id(inner)?),
        "node" => Value::Node(scalar_id(inner)?),
        "branch" => Value::Branch(scalar_id(inner)),
        "workflow_call" => Value::WorkflowCall(scalar_id(inner)?),
        _ => return None,
    };
    Some(Slot::Value(value))
}

/// Parses and classifies inline slot text such as `{ literal: null }`.
pub fn parse_slot(text: &str) -> Option<Slot> {
    let v = serde_yaml::from_str::<YamlValue>(text).ok()?;
    classify(&v)
}

/// Parses the value of a located block (inline text or header body).
pub fn block_value(lines: &[String], block: &Block) -> Option<YamlValue> {
    match &block.inline {
        Some(text) => serde_yaml::from_str(text).ok(),
        None => {
            let body = rebase(&lines[block.body()], 0).join("\n");
            if body.trim().is_empty() {
                return Some(YamlValue::Null);
            }
            serde_yaml::from_str(&body).ok()
        }
    }
}

/// Lines of one `inputs` entry. Branch-shaped slots always use block form.
pub fn render_slot(key: &str, slot: &Slot, indent: usize) -> Vec<String> {
    let key = format_string(key);
    let (p, p2) = (pad(indent), pad(indent + INDENT));
    match slot {
        Slot::Value(Value::Branch(target)) => vec![
            format!("{}{}:", p, key),
            format!("{}branch: {}", p2, format_target(target.as_deref())),
        ],
        Slot::Handler {
            exception_type,
            body,
        } => vec![
            format!("{}{}:", p, key),
            format!("{}exception_type: {}", p2, format_string(exception_type)),
            format!("{}body:", p2),
            format!("{}branch: {}", pad(indent + 2 * INDENT), format_target(body.as_deref())),
        ],
        Slot::Value(v) => vec![format!("{}{}: {}", p, key, format_value(v))],
    }
}

pub fn render_node(
    id: &str,
    opcode: &str,
    next: Option<&str>,
    inputs: &[(String, Slot)],
    indent: usize,
) -> Vec<String> {
    let p2 = pad(indent + INDENT);
    let mut out = vec![
        format!("{}{}:", pad(indent), format_string(id)),
        format!("{}opcode: {}", p2, format_string(opcode)),
        format!("{}next: {}", p2, format_target(next)),
    ];
    if inputs.is_empty() {
        out.push(format!("{}inputs: {{}}", p2));
    } else {
        out.push(format!("{}inputs:", p2));
        for (key, slot) in inputs {
            out.extend(render_slot(key, slot, indent + 2 * INDENT));
        }
    }
    out
}

pub fn render_interface(interface: &Interface, indent: usize) -> Vec<String> {
    let (p2, p3) = (pad(indent + INDENT), pad(indent + 2 * INDENT));
    let mut out = vec![format!("{}interface:", pad(indent))];
    if interface.inputs.is_empty() {
        out.push(format!("{}inputs: []", p2));
    } else {
        out.push(format!("{}inputs:", p2));
        for input in &interface.inputs {
            out.push(format!("{}- name: {}", p3, format_string(&input.name)));
            out.push(format!("{}  type: {}", p3, format_string(&input.kind)));
            out.push(format!("{}  required: {}", p3, input.required));
        }
    }
    let outputs: Vec<String> = interface.outputs.iter().map(|o| format_string(o)).collect();
    out.push(format!("{}outputs: [{}]", p2, outputs.join(", ")));
    out
}

pub fn render_variable(variable: &Variable, indent: usize) -> String {
    format!(
        "{}{}: {}",
        pad(indent),
        format_string(&variable.name),
        format_scalar(&variable.default)
    )
}

pub fn render_variables(variables: &[Variable], indent: usize) -> Vec<String> {
    if variables.is_empty() {
        return vec![format!("{}variables: {{}}", pad(indent))];
    }
    let mut out = vec![format!("{}variables:", pad(indent))];
    out.extend(variables.iter().map(|v| render_variable(v, indent + INDENT)));
    out
}

/// One `workflows` list entry. `nodes` are complete node blocks at any
/// indentation; they are re-based under the workflow's `nodes:` key.
pub fn render_workflow(
    name: &str,
    interface: &Interface,
    variables: &[Variable],
    nodes: &[Vec<String>],
    indent: usize,
) -> Vec<String> {
    let props = indent + INDENT;
    let mut out = vec![format!("{}- name: {}", pad(indent), format_string(name))];
    out.extend(render_interface(interface, props));
    out.extend(render_variables(variables, props));
    if nodes.is_empty() {
        out.push(format!("{}nodes: {{}}", pad(props)));
    } else {
        out.push(format!("{}nodes:", pad(props)));
        for block in nodes {
            out.extend(rebase(block, props + INDENT));
        }
    }
    out
}

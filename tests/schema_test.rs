use flowtext::error::SchemaError;
use flowtext::schema::{BranchShape, ConstructSchema, InputKind, family_index};

const SCHEMA: &str = r#"
log_line:
  inputs:
    - name: TEXT
      required: true
      default: ""
branch_on:
  inputs:
    - name: VALUE
  branches:
    - name: MATCH
    - name: MISS
guarded:
  branches:
    - name: HANDLER
      dynamic: true
      shape: handler
  id_prefix: guard
store:
  inputs:
    - name: TARGET
      kind: variable
  assigns: true
"#;

#[test]
fn test_builtin_catalog() {
    let schema = ConstructSchema::builtin();
    assert!(schema.is_branching("control_if"));
    assert!(schema.is_branching("control_try"));
    assert!(!schema.is_branching("io_print"));
    assert!(!schema.is_branching("unknown_opcode"));

    assert_eq!(schema.id_prefix("io_print"), "io");
    assert_eq!(schema.id_prefix("workflow_call"), "call");
    assert_eq!(schema.id_prefix("plain"), "plain");

    assert_eq!(schema.branch_shape("control_try", "CATCH2"), BranchShape::Handler);
    assert_eq!(schema.branch_shape("control_try", "TRY"), BranchShape::Plain);
    // Unknown opcodes still get catch-shaped CATCH slots.
    assert_eq!(schema.branch_shape("mystery", "CATCH1"), BranchShape::Handler);

    let set = schema.opcode("data_set_variable").expect("data_set_variable");
    assert!(set.assigns);
    assert_eq!(set.input_decl("VARIABLE").map(|d| d.kind), Some(InputKind::Variable));
}

#[test]
fn test_family_index() {
    assert_eq!(family_index("CATCH12", "CATCH"), Some(12));
    assert_eq!(family_index("CATCH", "CATCH"), None);
    assert_eq!(family_index("CATCHX", "CATCH"), None);
    assert_eq!(family_index("ARG1", "CATCH"), None);
}

#[test]
fn test_load_schema_from_yaml() {
    let schema = ConstructSchema::from_yaml_str(SCHEMA).expect("Failed to parse schema");

    let log = schema.opcode("log_line").expect("log_line");
    assert_eq!(log.inputs[0].default, Some(serde_json::json!("")));
    assert!(!log.is_branching());

    let branch_on = schema.opcode("branch_on").expect("branch_on");
    assert_eq!(branch_on.branches.len(), 2);
    assert!(branch_on.branch_for("MISS").is_some());
    assert!(branch_on.branch_for("MAYBE").is_none());

    assert_eq!(schema.branch_shape("guarded", "HANDLER4"), BranchShape::Handler);
    assert_eq!(schema.id_prefix("guarded"), "guard");
    assert!(schema.opcode("store").expect("store").assigns);

    let names: Vec<&str> = schema.opcodes().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["branch_on", "guarded", "log_line", "store"]);
}

#[test]
fn test_schema_validation() {
    let duplicate = "op:\n  branches:\n    - name: A\n    - name: A\n";
    assert!(matches!(
        ConstructSchema::from_yaml_str(duplicate),
        Err(SchemaError::DuplicateBranch { .. })
    ));

    let bad_family = "op:\n  branches:\n    - name: CASE1\n      dynamic: true\n";
    assert!(matches!(
        ConstructSchema::from_yaml_str(bad_family),
        Err(SchemaError::InvalidFamily { .. })
    ));

    assert!(matches!(
        ConstructSchema::from_yaml_str("op: [not, a, map]"),
        Err(SchemaError::Parse(_))
    ));
}

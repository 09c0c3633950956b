use flowtext::dsl::builder::DocumentBuilder;
use flowtext::dsl::{Interface, InterfaceInput, Variable};
use flowtext::edit;
use flowtext::error::EditError;
use serde_json::json;

fn base_doc() -> String {
    DocumentBuilder::new()
        .workflow("main")
        .var("count", 0)
        .build()
        .build()
}

#[test]
fn test_variable_crud() {
    let doc = base_doc();
    let doc = edit::set_variable(&doc, "main", "total", &json!(5)).expect("add");
    assert!(doc.contains("    variables:\n      count: 0\n      total: 5\n    nodes:"));

    let doc = edit::set_variable(&doc, "main", "count", &json!("ten")).expect("replace");
    assert!(doc.contains("      count: ten\n"));

    let doc = edit::remove_variable(&doc, "main", "count").expect("remove count");
    let doc = edit::remove_variable(&doc, "main", "total").expect("remove total");
    assert!(doc.contains("    variables: {}\n    nodes:"));

    // The inline shorthand is expanded again on insert.
    let doc = edit::set_variable(&doc, "main", "count", &json!(0)).expect("re-add");
    assert_eq!(doc, base_doc());
}

#[test]
fn test_rename_variable() {
    let doc = edit::rename_variable(&base_doc(), "main", "count", "sum").expect("rename");
    assert!(doc.contains("      sum: 0\n"));
    assert!(!doc.contains("count"));

    let doc = edit::set_variable(&doc, "main", "other", &json!(null)).expect("add");
    assert_eq!(
        edit::rename_variable(&doc, "main", "sum", "other"),
        Err(EditError::AlreadyExists("other".to_string()))
    );
    assert!(matches!(
        edit::rename_variable(&doc, "main", "ghost", "x"),
        Err(EditError::NotFound(_))
    ));
}

#[test]
fn test_missing_variables_block() {
    let doc = "workflows:\n  - name: main\n    nodes: {}\n";
    assert_eq!(
        edit::set_variable(doc, "main", "x", &json!(1)),
        Err(EditError::NotFound("main.variables".to_string()))
    );
}

#[test]
fn test_interface_inputs() {
    let doc = base_doc();
    let doc = edit::upsert_interface_input(&doc, "main", InterfaceInput::new("name", "string", true))
        .expect("add input");
    assert!(doc.contains(
        "    interface:\n      inputs:\n        - name: name\n          type: string\n          required: true\n      outputs: []\n"
    ));

    let doc = edit::upsert_interface_input(&doc, "main", InterfaceInput::new("name", "number", false))
        .expect("replace input");
    let interface = edit::read_interface(&doc, "main").expect("read");
    assert_eq!(interface.inputs, vec![InterfaceInput::new("name", "number", false)]);

    let doc = edit::remove_interface_input(&doc, "main", "name").expect("remove");
    assert_eq!(doc, base_doc());
    assert!(matches!(
        edit::remove_interface_input(&doc, "main", "name"),
        Err(EditError::NotFound(_))
    ));
}

#[test]
fn test_interface_outputs() {
    let doc = edit::add_interface_output(&base_doc(), "main", "result").expect("add");
    assert!(doc.contains("      outputs: [result]\n"));
    assert_eq!(
        edit::add_interface_output(&doc, "main", "result"),
        Err(EditError::AlreadyExists("result".to_string()))
    );

    let doc = edit::set_interface_outputs(&doc, "main", &["a".to_string(), "b".to_string()]).expect("set");
    assert!(doc.contains("      outputs: [a, b]\n"));
    assert_eq!(edit::read_interface(&doc, "main").expect("read").outputs, vec!["a", "b"]);

    let doc = edit::remove_interface_output(&doc, "main", "a").expect("remove a");
    let doc = edit::remove_interface_output(&doc, "main", "b").expect("remove b");
    assert_eq!(doc, base_doc());
}

#[test]
fn test_create_and_delete_workflow() {
    let doc = base_doc();
    let created = edit::create_workflow(&doc, "helper", &Interface::default(), &[]).expect("create");

    let expected = DocumentBuilder::new()
        .workflow("main")
        .var("count", 0)
        .build()
        .workflow("helper")
        .build()
        .build();
    assert_eq!(created, expected);
    assert_eq!(edit::list_workflows(&created), vec!["main", "helper"]);

    assert_eq!(
        edit::create_workflow(&created, "helper", &Interface::default(), &[]),
        Err(EditError::AlreadyExists("helper".to_string()))
    );

    let deleted = edit::delete_workflow(&created, "helper").expect("delete");
    assert_eq!(deleted, doc);
    assert_eq!(edit::delete_workflow(&doc, "main"), Err(EditError::Reserved("main".to_string())));
    assert!(matches!(edit::delete_workflow(&doc, "ghost"), Err(EditError::NotFound(_))));
}

#[test]
fn test_create_workflow_in_empty_document() {
    let empty = DocumentBuilder::new().build();
    assert_eq!(empty, "workflows: []\n");

    let interface = Interface {
        inputs: vec![InterfaceInput::new("n", "number", true)],
        outputs: vec!["out".to_string()],
    };
    let variables = vec![Variable::new("out", 0)];
    let doc = edit::create_workflow(&empty, "main", &interface, &variables).expect("create");

    let expected = DocumentBuilder::new()
        .workflow("main")
        .input("n", "number", true)
        .output("out")
        .var("out", 0)
        .build()
        .build();
    assert_eq!(doc, expected);
}

use flowtext::edit;
use flowtext::error::EditError;
use flowtext::schema::ConstructSchema;

const DOC: &str = r#"workflows:
  - name: main
    interface:
      inputs: []
      outputs: []
    variables: {}
    nodes:
      start:
        opcode: start
        next: cond
        inputs: {}
      cond:
        opcode: control_if
        next: null
        inputs:
          CONDITION: { literal: true }
      guard:
        opcode: control_try
        next: null
        inputs:
          TRY: { literal: null }
          CATCH1: { exception_type: IOError, body: { branch: null } }
          FINALLY:
            branch: done
      call:
        opcode: workflow_call
        next: null
        inputs: {}
      done:
        opcode: io_print
        next: null
        inputs: {}
"#;

#[test]
fn test_set_branch_appends_missing_slot() {
    let schema = ConstructSchema::builtin();
    let doc = edit::set_branch(DOC, "cond", "THEN", Some("then_node"), &schema).expect("set_branch");
    assert!(doc.contains(
        "          CONDITION: { literal: true }\n          THEN:\n            branch: then_node\n      guard:"
    ));
}

#[test]
fn test_set_branch_expands_inline_placeholder() {
    let schema = ConstructSchema::builtin();
    let doc = edit::set_branch(DOC, "guard", "TRY", Some("work"), &schema).expect("set_branch");
    assert!(doc.contains("          TRY:\n            branch: work\n          CATCH1:"));
    assert!(!doc.contains("TRY: { literal: null }"));
}

#[test]
fn test_set_branch_replaces_existing_target() {
    let schema = ConstructSchema::builtin();
    let once = edit::set_branch(DOC, "guard", "FINALLY", Some("cleanup"), &schema).expect("once");
    assert!(once.contains("          FINALLY:\n            branch: cleanup\n"));

    let twice = edit::set_branch(&once, "guard", "FINALLY", Some("cleanup"), &schema).expect("twice");
    assert_eq!(once, twice);
}

#[test]
fn test_handler_slots_keep_exception_type() {
    let schema = ConstructSchema::builtin();
    let doc = edit::set_branch(DOC, "guard", "CATCH1", Some("h1"), &schema).expect("expand");
    assert!(doc.contains(
        "          CATCH1:\n            exception_type: IOError\n            body:\n              branch: h1\n"
    ));

    let doc = edit::set_branch(&doc, "guard", "CATCH1", Some("h2"), &schema).expect("retarget");
    assert!(doc.contains("            body:\n              branch: h2\n"));

    // A catch slot created from scratch gets the full nested shape.
    let doc = edit::set_branch(&doc, "guard", "CATCH5", Some("h5"), &schema).expect("create");
    assert!(doc.contains(
        "          CATCH5:\n            exception_type: Exception\n            body:\n              branch: h5\n"
    ));
}

#[test]
fn test_set_branch_rejects_value_slots() {
    let schema = ConstructSchema::builtin();
    assert_eq!(
        edit::set_branch(DOC, "cond", "CONDITION", Some("x"), &schema),
        Err(EditError::AmbiguousShape {
            node: "cond".to_string(),
            label: "CONDITION".to_string(),
        })
    );
    assert_eq!(
        edit::set_branch(DOC, "ghost", "THEN", Some("x"), &schema),
        Err(EditError::NotFound("ghost".to_string()))
    );
}

#[test]
fn test_clear_branch_keeps_slot() {
    let schema = ConstructSchema::builtin();
    let doc = edit::clear_branch(DOC, "guard", "FINALLY", &schema).expect("clear");
    assert!(doc.contains("          FINALLY:\n            branch: null\n"));

    assert!(matches!(
        edit::clear_branch(DOC, "cond", "THEN", &schema),
        Err(EditError::NotFound(_))
    ));
}

#[test]
fn test_disconnect_checks_current_target() {
    let schema = ConstructSchema::builtin();

    let doc = edit::disconnect(DOC, "start", "cond", None, &schema).expect("next");
    assert!(doc.contains("      start:\n        opcode: start\n        next: null\n"));

    let doc = edit::disconnect(DOC, "guard", "done", Some("FINALLY"), &schema).expect("branch");
    assert!(doc.contains("          FINALLY:\n            branch: null\n"));

    assert!(matches!(
        edit::disconnect(DOC, "start", "guard", None, &schema),
        Err(EditError::NotFound(_))
    ));
    assert!(matches!(
        edit::disconnect(DOC, "guard", "elsewhere", Some("FINALLY"), &schema),
        Err(EditError::NotFound(_))
    ));
}

#[test]
fn test_dynamic_branches_are_numbered_after_the_last_member() {
    let schema = ConstructSchema::builtin();
    let (doc, key) = edit::add_dynamic_branch(DOC, "guard", "CATCH", &schema).expect("add");
    assert_eq!(key, "CATCH2");
    assert!(doc.contains(
        "          CATCH1: { exception_type: IOError, body: { branch: null } }\n          CATCH2:\n            exception_type: Exception\n            body:\n              branch: null\n          FINALLY:"
    ));

    // Removing a member leaves a gap; numbering continues from the max.
    let doc = edit::remove_dynamic_branch(&doc, "guard", "CATCH1", &schema).expect("remove");
    assert!(!doc.contains("CATCH1"));
    let (_, key) = edit::add_dynamic_branch(&doc, "guard", "CATCH", &schema).expect("add again");
    assert_eq!(key, "CATCH3");
}

#[test]
fn test_dynamic_inputs_expand_and_collapse() {
    let schema = ConstructSchema::builtin();
    let (doc, first) = edit::add_dynamic_input(DOC, "call", "ARG", &schema).expect("ARG1");
    let (doc, second) = edit::add_dynamic_input(&doc, "call", "ARG", &schema).expect("ARG2");
    assert_eq!((first.as_str(), second.as_str()), ("ARG1", "ARG2"));
    assert!(doc.contains(
        "        inputs:\n          ARG1: { literal: null }\n          ARG2: { literal: null }\n      done:"
    ));

    let doc = edit::remove_dynamic_input(&doc, "call", "ARG1", &schema).expect("remove ARG1");
    let doc = edit::remove_dynamic_input(&doc, "call", "ARG2", &schema).expect("remove ARG2");
    assert_eq!(doc, DOC);
}

#[test]
fn test_dynamic_families_must_be_declared() {
    let schema = ConstructSchema::builtin();
    assert_eq!(
        edit::add_dynamic_branch(DOC, "done", "CATCH", &schema),
        Err(EditError::NotDynamic {
            opcode: "io_print".to_string(),
            prefix: "CATCH".to_string(),
        })
    );
    assert!(matches!(
        edit::add_dynamic_input(DOC, "call", "PARAM", &schema),
        Err(EditError::NotDynamic { .. })
    ));
    assert!(matches!(
        edit::remove_dynamic_input(DOC, "call", "ARG9", &schema),
        Err(EditError::NotFound(_))
    ));
}

#[test]
fn test_removal_is_limited_to_family_members() {
    let schema = ConstructSchema::builtin();
    assert_eq!(
        edit::remove_dynamic_branch(DOC, "guard", "FINALLY", &schema),
        Err(EditError::NotDynamic {
            opcode: "control_try".to_string(),
            prefix: "FINALLY".to_string(),
        })
    );
    assert!(matches!(
        edit::remove_dynamic_branch(DOC, "guard", "TRY", &schema),
        Err(EditError::NotDynamic { .. })
    ));
    assert!(matches!(
        edit::remove_dynamic_input(DOC, "cond", "CONDITION", &schema),
        Err(EditError::NotDynamic { .. })
    ));
    assert!(matches!(
        edit::remove_dynamic_branch(DOC, "cond", "CATCH1", &schema),
        Err(EditError::NotDynamic { .. })
    ));

    let doc = edit::remove_dynamic_branch(DOC, "guard", "CATCH1", &schema).expect("member");
    assert!(doc.contains("          TRY: { literal: null }\n          FINALLY:"));
}

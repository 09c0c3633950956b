use flowtext::document::locator;
use flowtext::document::Lines;
use flowtext::dsl::builder::DocumentBuilder;
use flowtext::dsl::{Interface, InterfaceInput, Variable};
use flowtext::error::RefactorError;
use flowtext::graph::Extractor;
use flowtext::refactor::{self, Predecessor};
use flowtext::schema::ConstructSchema;
use std::collections::HashSet;

const DOC: &str = r#"workflows:
  - name: main
    interface:
      inputs: []
      outputs: []
    variables:
      x: 0
      y: 0
    nodes:
      start:
        opcode: start
        next: p
        inputs: {}
      p:
        opcode: io_print
        next: a
        inputs:
          MESSAGE: { literal: before }
      a:
        opcode: data_set_variable
        next: b
        inputs:
          VARIABLE: { literal: x }
          VALUE: { node: r1 }
      r1:
        opcode: operator_add
        next: null
        inputs:
          A: { variable: "y" }
          B: { literal: 1 }
      b:
        opcode: io_print
        next: c
        inputs:
          MESSAGE: { variable: "x" }
      c:
        opcode: data_change_variable
        next: d
        inputs:
          VARIABLE: { variable: "z" }
          BY: { variable: "z" }
      d:
        opcode: io_print
        next: null
        inputs: {}
      cond:
        opcode: control_if
        next: null
        inputs:
          THEN:
            branch: null
      q1:
        opcode: io_print
        next: q2
        inputs: {}
      q2:
        opcode: io_print
        next: q1
        inputs: {}
  - name: flow2
    interface:
      inputs: []
      outputs: []
    variables: {}
    nodes:
      start:
        opcode: start
        next: gate
        inputs: {}
      gate:
        opcode: control_if
        next: null
        inputs:
          CONDITION: { literal: true }
          THEN:
            branch: g1
      g1:
        opcode: io_print
        next: g2
        inputs: {}
      g2:
        opcode: io_print
        next: null
        inputs: {}
"#;

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn reasons(result: Result<refactor::ChainSelection, RefactorError>) -> Vec<String> {
    match result {
        Err(RefactorError::InvalidSelection(reasons)) => reasons,
        other => panic!("expected an invalid selection, got {:?}", other),
    }
}

#[test]
fn test_validate_straight_chain() {
    let schema = ConstructSchema::builtin();
    let selection = refactor::validate(DOC, "main", &ids(&["a", "b", "c"]), &schema).expect("valid");
    assert_eq!(selection.chain, ids(&["a", "b", "c"]));
    assert_eq!(selection.head, "a");
    assert_eq!(selection.tail, "c");
    assert_eq!(selection.predecessor, Some(Predecessor::Next("p".to_string())));
    assert_eq!(selection.successor.as_deref(), Some("d"));

    // Selection order does not matter.
    let shuffled = refactor::validate(DOC, "main", &ids(&["c", "a", "b"]), &schema).expect("valid");
    assert_eq!(shuffled.chain, selection.chain);
}

#[test]
fn test_validate_branch_entry_predecessor() {
    let schema = ConstructSchema::builtin();
    let selection = refactor::validate(DOC, "flow2", &ids(&["g1", "g2"]), &schema).expect("valid");
    assert_eq!(
        selection.predecessor,
        Some(Predecessor::Branch {
            node: "gate".to_string(),
            label: "THEN".to_string(),
        })
    );
    assert_eq!(selection.successor, None);
}

#[test]
fn test_validate_rejections() {
    let schema = ConstructSchema::builtin();

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a"]), &schema));
    assert!(r[0].contains("at least two"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a", "a"]), &schema));
    assert!(r[0].contains("more than once"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a", "cond"]), &schema));
    assert!(r[0].contains("has branches"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a", "g1"]), &schema));
    assert!(r[0].contains("not a node of workflow 'main'"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["start", "p"]), &schema));
    assert!(r[0].contains("start"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a", "c"]), &schema));
    assert!(r[0].contains("not a single chain"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["a", "b", "q1", "q2"]), &schema));
    assert!(r[0].contains("disconnected"));

    let r = reasons(refactor::validate(DOC, "main", &ids(&["q1", "q2"]), &schema));
    assert!(r[0].contains("loops"));

    let r = reasons(refactor::validate(DOC, "nowhere", &ids(&["a", "b"]), &schema));
    assert!(r[0].contains("nowhere"));
}

#[test]
fn test_all_reasons_are_reported() {
    let schema = ConstructSchema::builtin();
    let r = reasons(refactor::validate(DOC, "main", &ids(&["cond", "ghost"]), &schema));
    assert_eq!(r.len(), 2);
}

#[test]
fn test_analyze_chain_variables() {
    let schema = ConstructSchema::builtin();
    let analysis =
        refactor::analyze_chain_variables(DOC, "main", &ids(&["a", "b", "c"]), &schema).expect("analysis");
    // y is read through a's reporter; x is written before b reads it;
    // z is read and then written by c, so it is both.
    assert_eq!(analysis.inputs, ids(&["y", "z"]));
    assert_eq!(analysis.outputs, ids(&["x", "z"]));
}

#[test]
fn test_extract_replaces_chain_with_call() {
    let schema = ConstructSchema::builtin();
    let interface = Interface {
        inputs: vec![
            InterfaceInput::new("y", "any", true),
            InterfaceInput::new("z", "any", true),
        ],
        outputs: ids(&["x", "z"]),
    };
    let variables = vec![Variable::new("x", 0), Variable::new("z", 0)];
    let extraction = refactor::extract(DOC, "main", &ids(&["a", "b", "c"]), "sub", &interface, &variables, &schema)
        .expect("extract");

    assert_eq!(extraction.workflow, "sub");
    assert_eq!(extraction.call_id, "call_1");
    assert_eq!(extraction.moved, ids(&["a", "b", "c", "r1"]));

    let graph = Extractor::new(&schema).extract(&extraction.document);
    let main = graph.workflow("main").expect("main");
    assert_eq!(main.chain_ids(), vec!["start", "p", "call_1", "d"]);

    let call = main.find("call_1").expect("call node");
    assert_eq!(call.opcode, "workflow_call");
    assert_eq!(call.inputs["WORKFLOW"].text, "sub");
    assert_eq!(call.inputs["ARG1"].text, "$y");
    assert_eq!(call.inputs["ARG2"].text, "$z");

    let sub = graph.workflow("sub").expect("sub");
    assert_eq!(sub.chain_ids(), vec!["start", "a", "b", "c"]);
    assert_eq!(sub.interface, interface);
    assert!(sub.orphans.is_empty());
    let a = sub.find("a").expect("a");
    assert!(a.inputs["VALUE"].reporter.is_some());

    // Ids stay unique across the document.
    let all = locator::node_ids(Lines::parse(&extraction.document).as_slice());
    let unique: HashSet<&String> = all.iter().filter(|id| *id != "start").collect();
    assert_eq!(unique.len(), all.iter().filter(|id| *id != "start").count());

    // Other workflows are untouched.
    let flow2 = graph.workflow("flow2").expect("flow2");
    assert_eq!(flow2.chain_ids(), vec!["start", "gate"]);
}

#[test]
fn test_extract_from_branch_entry() {
    let schema = ConstructSchema::builtin();
    let extraction = refactor::extract(
        DOC,
        "flow2",
        &ids(&["g1", "g2"]),
        "inner",
        &Interface::default(),
        &[],
        &schema,
    )
    .expect("extract");

    let graph = Extractor::new(&schema).extract(&extraction.document);
    let gate = graph.workflow("flow2").and_then(|w| w.find("gate")).expect("gate");
    let then = gate.branch("THEN").expect("THEN");
    assert_eq!(then.target.as_deref(), Some("call_1"));
    assert_eq!(then.chain.len(), 1);
    assert!(then.chain[0].inputs.get("ARG1").is_none());

    let inner = graph.workflow("inner").expect("inner");
    assert_eq!(inner.chain_ids(), vec!["start", "g1", "g2"]);
}

#[test]
fn test_extract_after_start_of_a_later_workflow() {
    let schema = ConstructSchema::builtin();
    let doc = DocumentBuilder::new()
        .workflow("main")
        .start("m1")
        .node("m1", "io_print").build()
        .build()
        .workflow("helper")
        .start("a")
        .node("a", "io_print").next("b").build()
        .node("b", "io_print").next("c").build()
        .node("c", "io_print").build()
        .build()
        .build();

    let selection = refactor::validate(&doc, "helper", &ids(&["a", "b"]), &schema).expect("validate");
    assert_eq!(selection.predecessor, Some(Predecessor::Next("start".to_string())));

    let extraction = refactor::extract(&doc, "helper", &ids(&["a", "b"]), "sub", &Interface::default(), &[], &schema)
        .expect("extract");
    assert_eq!(extraction.call_id, "call_1");

    let graph = Extractor::new(&schema).extract(&extraction.document);
    let main = graph.workflow("main").expect("main");
    assert_eq!(main.chain_ids(), vec!["start", "m1"]);
    assert!(main.orphans.is_empty());

    let helper = graph.workflow("helper").expect("helper");
    assert_eq!(helper.chain_ids(), vec!["start", "call_1", "c"]);
    assert!(helper.orphans.is_empty());

    let sub = graph.workflow("sub").expect("sub");
    assert_eq!(sub.chain_ids(), vec!["start", "a", "b"]);
}

#[test]
fn test_extract_rejects_bad_requests() {
    let schema = ConstructSchema::builtin();
    assert_eq!(
        refactor::extract(DOC, "main", &ids(&["a", "b"]), "flow2", &Interface::default(), &[], &schema),
        Err(RefactorError::AlreadyExists("flow2".to_string()))
    );
    assert!(matches!(
        refactor::extract(DOC, "main", &ids(&["a", "cond"]), "sub", &Interface::default(), &[], &schema),
        Err(RefactorError::InvalidSelection(_))
    ));
}

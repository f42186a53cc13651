// tests/pipeline_tests.rs

use pretty_assertions::assert_eq;
use quill_lang::{
    Document, EvalOptions, Evaluator, Instruction, Node, Pipeline,
    error::{Error, ErrorKind},
    pipeline::{Executor, MemorySink, NullSink, PipelineState, SnapshotPoint},
};

fn node(instructions: &[(&str, &str)]) -> Node {
    Node::new(
        instructions
            .iter()
            .map(|(path, script)| Instruction::new(*path, *script))
            .collect(),
    )
}

fn run(nodes: Vec<Node>, input: &str) -> Document {
    let input = Document::from_json_str(input).unwrap();
    Pipeline::new(nodes)
        .run(&Evaluator::new(), input, &mut NullSink)
        .unwrap()
        .document
}

fn run_err(nodes: Vec<Node>) -> Error {
    Pipeline::new(nodes)
        .run(&Evaluator::new(), Document::empty(), &mut NullSink)
        .unwrap_err()
}

// ============================================================================
// Self and Cross References
// ============================================================================

#[test]
fn test_self_reference_sees_earlier_instruction() {
    let doc = run(
        vec![node(&[("P", "'first'"), ("P", "Concat(P, '-second')")])],
        "{}",
    );
    assert_eq!(doc.get("P"), "first-second");
}

#[test]
fn test_self_reference_reads_input_value_first() {
    let doc = run(
        vec![node(&[("Total", "Total * 2")])],
        r#"{"Total": "21"}"#,
    );
    assert_eq!(doc.get("Total"), "42");
}

#[test]
fn test_cross_reference_reads_previous_node() {
    let doc = run(
        vec![
            node(&[("P", "'A'")]),
            node(&[("P", "'B'"), ("Q", "P")]),
        ],
        "{}",
    );
    assert_eq!(doc.get("Q"), "A");
    assert_eq!(doc.get("P"), "B");
}

#[test]
fn test_same_node_writes_are_invisible_to_other_paths() {
    let doc = run(vec![node(&[("P", "'x'"), ("Q", "Concat('[', P, ']')")])], "{}");
    assert_eq!(doc.get("Q"), "[]");
}

#[test]
fn test_later_node_sees_promoted_snapshot() {
    let doc = run(
        vec![
            node(&[("Owner/Full", "Concat(Owner/First, ' ', Owner/Last)")]),
            node(&[("Letter/Greeting", "Concat('Dear ', Owner/Full)")]),
        ],
        r#"{"Owner": {"First": "Ada", "Last": "Lovelace"}}"#,
    );
    assert_eq!(doc.get("Letter/Greeting"), "Dear Ada Lovelace");
}

#[test]
fn test_null_placeholder_is_filled_in() {
    let doc = run(
        vec![node(&[("LetterData/Name", "'Ada'")])],
        r#"{"LetterData": null}"#,
    );
    assert_eq!(doc.get("LetterData/Name"), "Ada");
}

#[test]
fn test_xml_pipeline() {
    let input = Document::from_xml_str(r#"<Policy number="P1"><Premium>100</Premium></Policy>"#)
        .unwrap();
    let pipeline = Pipeline::new(vec![
        node(&[("Policy/Tax", "Premium * 0.1"), ("Policy/@status", "'rated'")]),
        node(&[("Policy/Total", "Premium + Tax")]),
    ]);
    let doc = pipeline
        .run(&Evaluator::new(), input, &mut NullSink)
        .unwrap()
        .document;

    assert_eq!(doc.get("Policy/Tax"), "10");
    assert_eq!(doc.get("Policy/@status"), "rated");
    assert_eq!(doc.get("Policy/Total"), "110");
}

// ============================================================================
// Instructions
// ============================================================================

#[test]
fn test_blank_script_writes_empty_string() {
    let doc = run(vec![node(&[("Note", "   ")])], r#"{"Note": "old"}"#);
    assert_eq!(doc.get("Note"), "");
}

#[test]
fn test_values_are_written_as_text() {
    let doc = run(
        vec![node(&[("Flag", "1 < 2"), ("Price", "2.50 * 2"), ("Name", "'Ada'")])],
        "{}",
    );
    let Document::Json(root) = &doc else {
        panic!("expected JSON");
    };
    assert_eq!(
        root,
        &serde_json::json!({"Flag": "true", "Price": "5", "Name": "Ada"})
    );
}

#[test]
fn test_entities_are_decoded() {
    let doc = run(
        vec![node(&[("Result", "If(2 &gt; 1 &amp;&amp; true, &apos;yes&apos;, &quot;no&quot;)")])],
        "{}",
    );
    assert_eq!(doc.get("Result"), "yes");
}

#[test]
fn test_repeated_script_is_reevaluated() {
    let doc = run(
        vec![node(&[("Count", "Count + 1"), ("Count", "Count + 1")])],
        r#"{"Count": 0}"#,
    );
    assert_eq!(doc.get("Count"), "2");
}

#[test]
fn test_empty_pipeline_returns_input() {
    let doc = run(vec![], r#"{"a": "1"}"#);
    assert_eq!(doc.get("a"), "1");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_names_node_and_instruction() {
    let err = run_err(vec![
        node(&[("A", "1")]),
        node(&[("B", "2"), ("C", "1 / 0")]),
    ]);
    assert!(matches!(
        err,
        Error::Instruction {
            node: 2,
            instruction: 2,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
    assert!(
        err.to_string()
            .starts_with("node 2, instruction 2 (path 'C'): DIVIDE_BY_ZERO"),
        "{}",
        err
    );
}

#[test]
fn test_parse_error_aborts_run() {
    let err = run_err(vec![node(&[("A", "Concat(")])]);
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_bad_target_path_aborts_run() {
    let err = run_err(vec![node(&[("a/@b/c", "1")])]);
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
}

#[test]
fn test_unknown_function_is_never_recovered() {
    let err = run_err(vec![node(&[("A", "Frobnicate(Missing)")])]);
    assert_eq!(err.kind(), ErrorKind::UnknownFunction);
}

// ============================================================================
// Recovery Warnings
// ============================================================================

#[test]
fn test_blank_argument_failure_becomes_warning() {
    let report = Pipeline::new(vec![node(&[("Ratio", "Divide(10, Missing)")])])
        .run(&Evaluator::new(), Document::empty(), &mut NullSink)
        .unwrap();

    assert_eq!(report.document.get("Ratio"), "");
    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!((warning.node, warning.instruction), (1, 1));
    assert_eq!(warning.path, "Ratio");
    assert_eq!(warning.function, "Divide");
    assert!(warning.message.starts_with("DIVIDE_BY_ZERO"));
}

#[test]
fn test_recovery_can_be_disabled() {
    let evaluator = Evaluator::with_options(EvalOptions {
        recover_blank_arguments: false,
        ..Default::default()
    });
    let err = Pipeline::new(vec![node(&[("Ratio", "Divide(10, Missing)")])])
        .run(&evaluator, Document::empty(), &mut NullSink)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
}

// ============================================================================
// State Machine and Snapshots
// ============================================================================

#[test]
fn test_executor_steps_through_states() {
    let pipeline = Pipeline::new(vec![node(&[("A", "'1'")]), node(&[("B", "A")])]);
    let evaluator = Evaluator::new();
    let mut sink = NullSink;
    let mut executor = Executor::new(&pipeline, &evaluator, Document::empty(), &mut sink);

    assert_eq!(executor.state(), PipelineState::NotStarted);

    assert!(executor.step().unwrap());
    assert_eq!(executor.state(), PipelineState::ProcessingNode(0));
    assert_eq!(executor.output().get("A"), "");

    assert!(executor.step().unwrap());
    assert_eq!(executor.state(), PipelineState::NodeComplete(0));
    assert_eq!(executor.output().get("A"), "1");

    assert!(executor.step().unwrap());
    assert_eq!(executor.state(), PipelineState::ProcessingNode(1));

    assert!(executor.step().unwrap());
    assert_eq!(executor.state(), PipelineState::NodeComplete(1));
    assert_eq!(executor.output().get("B"), "1");

    assert!(executor.step().unwrap());
    assert_eq!(executor.state(), PipelineState::Done);
    assert!(!executor.step().unwrap());
}

#[test]
fn test_memory_sink_records_every_step() {
    let pipeline = Pipeline::new(vec![
        node(&[("A", "'1'"), ("B", "'2'")]),
        node(&[("C", "Concat(A, B)")]),
    ]);
    let mut sink = MemorySink::new();
    pipeline
        .run(&Evaluator::new(), Document::empty(), &mut sink)
        .unwrap();

    let points: Vec<SnapshotPoint> = sink.snapshots().iter().map(|(p, _)| *p).collect();
    assert_eq!(
        points,
        vec![
            SnapshotPoint::Instruction { node: 1, instruction: 1 },
            SnapshotPoint::Instruction { node: 1, instruction: 2 },
            SnapshotPoint::NodeComplete { node: 1 },
            SnapshotPoint::Instruction { node: 2, instruction: 1 },
            SnapshotPoint::NodeComplete { node: 2 },
        ]
    );

    let first = sink
        .at(SnapshotPoint::Instruction { node: 1, instruction: 1 })
        .unwrap();
    assert_eq!(first.get("A"), "1");
    assert_eq!(first.get("B"), "");

    let last = sink.at(SnapshotPoint::NodeComplete { node: 2 }).unwrap();
    assert_eq!(last.get("C"), "12");
}

#[test]
fn test_failed_run_keeps_snapshots_up_to_failure() {
    let pipeline = Pipeline::new(vec![node(&[("A", "'ok'"), ("B", "1 % 0")])]);
    let mut sink = MemorySink::new();
    assert!(pipeline.run(&Evaluator::new(), Document::empty(), &mut sink).is_err());
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_snapshot_point_display() {
    assert_eq!(
        SnapshotPoint::Instruction { node: 2, instruction: 3 }.to_string(),
        "node 2 instruction 3"
    );
    assert_eq!(SnapshotPoint::NodeComplete { node: 1 }.to_string(), "node 1 complete");
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_pipeline_from_json() {
    let pipeline = Pipeline::from_json_str(
        r#"{"nodes": [
            {"name": "first", "instructions": [{"path": "A", "script": "1"}, {"path": "B"}]},
            {"instructions": []}
        ]}"#,
    )
    .unwrap();

    assert_eq!(pipeline.nodes.len(), 2);
    assert_eq!(pipeline.nodes[0].name.as_deref(), Some("first"));
    assert_eq!(pipeline.nodes[0].instructions[1], Instruction::new("B", ""));
    assert_eq!(pipeline.instruction_count(), 2);
}

#[test]
fn test_invalid_pipeline_is_config_error() {
    let err = Pipeline::from_json_str(r#"{"nodes": [{"instructions": [{"script": "1"}]}]}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("invalid pipeline"));
}

//! End-to-end integration tests for the Routeweave tree engine.
//!
//! Each test exercises the full path: parse text -> build document -> navigate
//! or mutate -> validate or export -> verify.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use routeweave_dsl::{parse_json, parse_yaml};
use routeweave_tree::{
    ancestor_chain, collect_placeholders, count_duplicate_identities, delete, document_placeholders,
    document_to_raw, find_by_identity, find_node, insert, move_node, project, ConnectorCatalog,
    Document, MetadataCatalog, NodeFactory, Severity, StepNode, Validator,
};
use routeweave_types::StepKind;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ROUTES_YAML: &str = r#"
- route:
    id: route-orders
    from:
      id: from-orders
      uri: kafka:orders?brokers={{ kafka.brokers }}
      steps:
        - set-header:
            id: set-header-1
            name: source
            constant: kafka
        - choice:
            id: choice-1
            when:
              - id: when-big
                simple: ${body.total} > 1000
                steps:
                  - to:
                      id: to-review
                      uri: direct:review
            otherwise:
              id: otherwise-1
              steps:
                - log:
                    id: log-small
                    message: small order
        - to:
            id: to-archive
            uri: file:/var/archive
- from:
    id: from-review
    uri: direct:review
    steps:
      - step:
          id: step-audit
          steps:
            - log:
                id: log-audit
                message: audit {{ audit.prefix }}
"#;

fn build(raw: &Value) -> Document {
    let catalog = MetadataCatalog::builtin();
    NodeFactory::new(&catalog)
        .create_document(raw)
        .expect("document should build")
}

fn routes() -> Document {
    build(&parse_yaml(ROUTES_YAML).expect("YAML parse failed"))
}

fn node(kind: &str, raw: Value) -> StepNode {
    let catalog = MetadataCatalog::builtin();
    NodeFactory::new(&catalog)
        .create_node(kind, &raw, false)
        .expect("node should build")
}

fn step_ids(document: &Document, id: &str) -> Vec<String> {
    find_node(document, id)
        .expect("node should exist")
        .steps()
        .iter()
        .map(|s| s.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[test]
fn log_step_is_found_under_its_entry() {
    let doc = build(&json!([
        { "from": { "id": "from-1", "uri": "timer:tick", "steps": [
            { "log": { "id": "log-1", "message": "hello" } }
        ] } }
    ]));

    let found = find_by_identity(&doc, "log-1");
    assert_eq!(found.node.map(|n| n.kind), Some(StepKind::Log));
    assert_eq!(found.parent_id, Some("from-1"));
    assert_eq!(found.position, Some(0));
}

#[test]
fn yaml_keys_are_normalized_before_building() {
    let doc = routes();
    let header = find_node(&doc, "set-header-1").expect("set-header should be found");
    assert_eq!(header.kind, StepKind::SetHeader);
    assert_eq!(
        header.expression.as_ref().and_then(|e| e.expression_text()),
        Some("kafka")
    );
    assert_eq!(
        ancestor_chain(&doc, "to-review"),
        vec!["when-big", "choice-1", "from-orders"]
    );
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

#[test]
fn insert_at_front_shifts_existing_steps() {
    let doc = build(&json!([
        { "from": { "id": "from-1", "uri": "timer:tick", "steps": [
            { "log": { "id": "log-1", "message": "a" } },
            { "log": { "id": "log-2", "message": "b" } }
        ] } }
    ]));

    let to = node("to", json!({ "id": "to-new", "uri": "direct:x" }));
    let updated = insert(&doc, to, Some("from-1"), Some(0));

    assert_eq!(step_ids(&updated, "from-1"), vec!["to-new", "log-1", "log-2"]);
    assert_eq!(find_by_identity(&updated, "log-2").position, Some(2));
    assert_eq!(step_ids(&doc, "from-1"), vec!["log-1", "log-2"]);
}

#[test]
fn insert_then_delete_restores_document() {
    let doc = routes();
    let fresh = node("log", json!({ "id": "log-fresh", "message": "x" }));
    let inserted = insert(&doc, fresh, Some("otherwise-1"), Some(0));
    assert_ne!(inserted, doc);
    assert_eq!(delete(&inserted, "log-fresh"), doc);
}

#[test]
fn mutations_with_unknown_identity_are_noops() {
    let doc = routes();
    assert_eq!(delete(&doc, "ghost"), doc);
    assert_eq!(move_node(&doc, "ghost", "log-small", false), doc);
    assert_eq!(
        insert(&doc, node("log", json!({ "id": "log-x" })), Some("ghost"), None),
        doc
    );
}

#[test]
fn move_into_own_subtree_is_rejected() {
    let doc = routes();
    assert_eq!(move_node(&doc, "choice-1", "when-big", true), doc);
    assert_eq!(move_node(&doc, "choice-1", "log-small", false), doc);
}

#[test]
fn move_across_flows() {
    let doc = routes();
    let updated = move_node(&doc, "to-archive", "step-audit", true);
    assert_eq!(step_ids(&updated, "step-audit"), vec!["log-audit", "to-archive"]);
    assert_eq!(step_ids(&updated, "from-orders"), vec!["set-header-1", "choice-1"]);
    assert_eq!(count_duplicate_identities(&updated, "to-archive"), 1);
}

#[test]
fn duplicate_insert_is_refused() {
    let doc = routes();
    let dup = node("log", json!({ "id": "log-small", "message": "again" }));
    let updated = insert(&doc, dup, Some("step-audit"), None);
    assert_eq!(updated, doc);
    assert_eq!(count_duplicate_identities(&updated, "log-small"), 1);
}

#[test]
fn regenerated_clone_can_be_inserted() {
    let doc = routes();
    let catalog = MetadataCatalog::builtin();
    let factory = NodeFactory::new(&catalog);
    let original = find_node(&doc, "choice-1").expect("choice should exist").clone();

    let copy = factory.clone_node(&original, true);
    let copy_id = copy.id.clone();
    let updated = insert(&doc, copy, Some("from-review"), None);

    assert_eq!(updated.node_count(), doc.node_count() + original.identities().len());
    assert_eq!(find_by_identity(&updated, &copy_id).parent_id, Some("from-review"));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn export_then_rebuild_is_identity() {
    let doc = routes();
    let raw = document_to_raw(&doc);
    let rebuilt = build(&raw);
    assert_eq!(rebuilt, doc);
    assert_eq!(document_to_raw(&rebuilt), raw);
}

#[test]
fn identities_survive_round_trip() {
    let doc = build(&json!([{ "from": { "uri": "timer:t", "steps": [{ "log": "minted" }] } }]));
    let log_id = doc.flows[0].steps()[0].id.clone();
    let rebuilt = build(&document_to_raw(&doc));
    assert_eq!(rebuilt.flows[0].steps()[0].id, log_id);
}

#[test]
fn unknown_kind_round_trips_as_opaque() {
    let raw = parse_json(
        r#"[{ "from": { "id": "f", "uri": "timer:t", "steps": [
            { "quantum-entangle": { "id": "q", "particles": [1, 2], "spin-mode": "up" } }
        ] } }]"#,
    )
    .expect("JSON parse failed");
    let doc = build(&raw);

    let opaque = find_node(&doc, "q").expect("opaque node should be found");
    assert_eq!(opaque.kind, StepKind::Opaque);
    assert_eq!(opaque.kind_name(), "quantumEntangle");
    assert_eq!(document_to_raw(&doc), raw);
}

// ---------------------------------------------------------------------------
// Placeholders, validation, projection
// ---------------------------------------------------------------------------

#[test]
fn placeholder_scan() {
    assert_eq!(
        collect_placeholders(&json!({ "uri": "{{ myParam }}" })),
        BTreeSet::from(["myParam".to_string()])
    );
    assert!(collect_placeholders(&json!({ "uri": "plain" })).is_empty());

    let names: Vec<_> = document_placeholders(&routes()).into_iter().collect();
    assert_eq!(names, vec!["audit.prefix", "kafka.brokers"]);
}

#[test]
fn kafka_without_brokers_names_the_parameter() {
    let catalog = MetadataCatalog::builtin();
    let connectors = ConnectorCatalog::builtin();
    let to = node("to", json!({ "uri": "kafka:orders" }));

    let report = Validator::new(&catalog, &connectors).check_required(&to);
    assert!(!report.is_valid);
    assert_eq!(report.messages().len(), 1);
    assert!(
        report.messages()[0].contains("brokers"),
        "message should name the parameter: {:?}",
        report.messages()
    );
}

#[test]
fn sample_routes_validate_cleanly() {
    let catalog = MetadataCatalog::builtin();
    let connectors = ConnectorCatalog::builtin();
    let diags = Validator::new(&catalog, &connectors).validate_document(&routes());
    let errors: Vec<_> = diags.iter().filter(|d| d.severity == Severity::Error).collect();
    assert!(errors.is_empty(), "Expected no validation errors: {errors:?}");
}

#[test]
fn projector_hides_collapsed_group_children() {
    let doc = routes();
    let collapsed = project(&doc, Some("log-small"));
    assert!(find_node(&collapsed, "step-audit").expect("group").visible);
    assert!(!find_node(&collapsed, "log-audit").expect("child").visible);
    assert!(find_node(&collapsed, "log-small").expect("log").visible);

    let expanded = project(&doc, Some("log-audit"));
    assert!(find_node(&expanded, "log-audit").expect("child").visible);
}

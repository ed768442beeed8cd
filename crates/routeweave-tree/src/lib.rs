//! Workflow-definition tree engine for Routeweave.
//!
//! This crate holds the typed model of an integration pipeline and everything
//! that works on it: the node factory that builds typed nodes from the raw
//! shape, the navigator that locates nodes, the copy-on-write mutator, the
//! validator with its lint rules, the visibility projector for tree views,
//! and the placeholder scanner.
//!
//! Per-kind child slots, required fields and connector parameters are data,
//! held in a [`MetadataCatalog`] and a [`ConnectorCatalog`] that callers build
//! once and pass by reference.
//!
//! # Example
//! ```
//! use routeweave_tree::{mutator, navigator, MetadataCatalog, NodeFactory};
//!
//! let raw = routeweave_dsl::parse_yaml(
//!     "- from:\n    id: from-1\n    uri: timer:tick\n    steps:\n      - log: tick\n",
//! )
//! .unwrap();
//! let catalog = MetadataCatalog::builtin();
//! let factory = NodeFactory::new(&catalog);
//! let document = factory.create_document(&raw).unwrap();
//!
//! let to = factory.create_node("to", &serde_json::json!("direct:out"), false).unwrap();
//! let updated = mutator::insert(&document, to.clone(), Some("from-1"), None);
//! assert_eq!(navigator::find_by_identity(&updated, &to.id).position, Some(1));
//! ```

pub mod catalog;
pub mod connectors;
pub mod export;
pub mod factory;
pub mod mutator;
pub mod navigator;
pub mod node;
pub mod placeholders;
pub mod validation;
pub mod visibility;

pub use catalog::{
    ChildSlotDescriptor, FieldDescriptor, FieldKind, KindMetadata, MetadataCatalog, SlotTarget,
};
pub use connectors::{
    parse_endpoint_uri, ConnectorCatalog, ConnectorDescriptor, ConnectorParameter, EndpointUri,
};
pub use export::{document_to_raw, entry_to_raw, node_to_raw};
pub use factory::{NodeFactory, DISCRIMINATOR_FIELDS};
pub use mutator::{delete, insert, move_node, replace, replace_in_node, update_all_occurrences};
pub use navigator::{
    all_identities, ancestor_chain, count_duplicate_identities, duplicate_identities,
    find_by_identity, find_node, find_topmost_flow_identity_for, is_descendant, walk, Visit,
};
pub use node::{
    ChildSlot, Document, ElementLookupResult, ExpressionNode, ExpressionPlacement, OpaqueData,
    SlotValue, StepNode, STEPS_SLOT,
};
pub use placeholders::{collect_placeholders, document_placeholders, placeholder_name};
pub use validation::{lint_rules, Diagnostic, LintRule, Severity, ValidationReport, Validator};
pub use visibility::project;

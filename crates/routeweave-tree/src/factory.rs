//! Node Factory: builds typed step nodes from the raw shape.
//!
//! The raw shape is what `routeweave-dsl` produces: generic JSON values with
//! camelCase keys, where a step is either a bare body (`{ uri: ... }`) or a
//! single-key entry (`{ to: { uri: ... } }`). Which form a child takes is
//! decided by the [`SlotTarget`] of the slot it sits in.

use serde_json::{Map, Value};

use routeweave_dsl::single_entry;
use routeweave_types::{mint_identity, ExpressionLanguage, Result, RouteweaveError, StepKind};

use crate::catalog::{ChildSlotDescriptor, MetadataCatalog, SlotTarget};
use crate::node::{
    ChildSlot, Document, ExpressionNode, ExpressionPlacement, OpaqueData, SlotValue, StepNode,
};

/// Keys that tag a root entry with its kind and are not part of the step body.
pub const DISCRIMINATOR_FIELDS: &[&str] = &["stepName"];

/// Builds [`StepNode`]s against a metadata catalog.
#[derive(Debug, Clone, Copy)]
pub struct NodeFactory<'a> {
    catalog: &'a MetadataCatalog,
}

impl<'a> NodeFactory<'a> {
    pub fn new(catalog: &'a MetadataCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a MetadataCatalog {
        self.catalog
    }

    /// Build a node of a named kind. Fails with `UnknownKind` for names outside
    /// the closed kind set.
    pub fn create_node(&self, kind_name: &str, raw: &Value, regenerate: bool) -> Result<StepNode> {
        let kind: StepKind = kind_name.parse()?;
        self.create_typed(kind, raw, regenerate)
    }

    /// Like [`create_node`](Self::create_node), but an unknown kind becomes an
    /// opaque node carrying the raw data untouched.
    pub fn create_node_or_opaque(
        &self,
        kind_name: &str,
        raw: &Value,
        regenerate: bool,
    ) -> Result<StepNode> {
        match StepKind::from_name(kind_name) {
            Some(kind) => self.create_typed(kind, raw, regenerate),
            None => {
                tracing::warn!(kind = %kind_name, "Unknown step kind, keeping it as an opaque node");
                Ok(opaque_node(kind_name, raw, regenerate))
            }
        }
    }

    /// Build a node of a known kind from its raw body.
    pub fn create_typed(&self, kind: StepKind, raw: &Value, regenerate: bool) -> Result<StepNode> {
        if kind == StepKind::Opaque {
            return Ok(opaque_node(kind.as_str(), raw, regenerate));
        }

        let mut fields = coerce_body(kind, raw)?;
        let id = take_identity(&mut fields, kind.as_str(), regenerate);

        let mut slots = Vec::new();
        for descriptor in self.catalog.child_slots(kind) {
            let raw_slot = fields.remove(&descriptor.name).unwrap_or(Value::Null);
            slots.push(ChildSlot {
                name: descriptor.name.clone(),
                target: descriptor.target,
                value: self.build_slot(kind, descriptor, &raw_slot, regenerate)?,
            });
        }

        let expression = kind
            .is_expression_bearing()
            .then(|| take_expression(&mut fields));

        Ok(StepNode {
            id,
            kind,
            fields,
            slots,
            expression,
            opaque: None,
            visible: true,
        })
    }

    /// Build a top-level document entry, dropping kind-tag keys from its body.
    pub fn create_root_step(&self, kind_name: &str, raw: &Value) -> Result<StepNode> {
        let mut body = raw.clone();
        if let Some(map) = body.as_object_mut() {
            for key in DISCRIMINATOR_FIELDS {
                map.remove(*key);
            }
        }
        self.create_node_or_opaque(kind_name, &body, false)
    }

    /// Build a document from a sequence of `{ kindName: body }` flows.
    ///
    /// A single flow map is accepted as a one-flow document and `null` as an
    /// empty one.
    pub fn create_document(&self, raw: &Value) -> Result<Document> {
        let entries: Vec<&Value> = match raw {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![raw],
            other => {
                return Err(document_shape_error(format!(
                    "expected a list of flows, found {}",
                    describe(other)
                )))
            }
        };

        let mut flows = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let (kind_name, body) = single_entry(entry).ok_or_else(|| {
                document_shape_error(format!("flow {index} is not a single-key map"))
            })?;
            flows.push(self.create_root_step(kind_name, body)?);
        }

        let document = Document::new(flows);
        tracing::debug!(flows = document.len(), nodes = document.node_count(), "Document built");
        Ok(document)
    }

    /// Deep-clone a subtree; with `regenerate`, every node in it gets a fresh identity.
    pub fn clone_node(&self, node: &StepNode, regenerate: bool) -> StepNode {
        if !regenerate {
            return node.clone();
        }
        let mut copy = node.rebuild_with(|slot| match &slot.value {
            SlotValue::Single(child) => {
                SlotValue::Single(child.as_ref().map(|c| Box::new(self.clone_node(c, true))))
            }
            SlotValue::Many(items) => {
                SlotValue::Many(items.iter().map(|c| self.clone_node(c, true)).collect())
            }
        });
        copy.id = mint_identity(node.kind_name());
        copy
    }

    // --- slots ---

    fn build_slot(
        &self,
        parent: StepKind,
        descriptor: &ChildSlotDescriptor,
        raw: &Value,
        regenerate: bool,
    ) -> Result<SlotValue> {
        if descriptor.multiple {
            let items: Vec<&Value> = match raw {
                Value::Null => Vec::new(),
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            let nodes = items
                .into_iter()
                .map(|item| self.build_child(parent, descriptor, item, regenerate))
                .collect::<Result<Vec<_>>>()?;
            Ok(SlotValue::Many(nodes))
        } else if raw.is_null() {
            Ok(SlotValue::Single(None))
        } else {
            let child = self.build_child(parent, descriptor, raw, regenerate)?;
            Ok(SlotValue::Single(Some(Box::new(child))))
        }
    }

    fn build_child(
        &self,
        parent: StepKind,
        descriptor: &ChildSlotDescriptor,
        raw: &Value,
        regenerate: bool,
    ) -> Result<StepNode> {
        match descriptor.target {
            SlotTarget::Body(kind) => self.create_typed(kind, raw, regenerate),
            SlotTarget::Entry(_) | SlotTarget::AnyStep => {
                let (kind_name, body) =
                    single_entry(raw).ok_or_else(|| RouteweaveError::InvalidShape {
                        kind: parent.as_str().to_string(),
                        message: format!(
                            "'{}' expects single-key step entries, found {}",
                            descriptor.name,
                            describe(raw)
                        ),
                    })?;
                self.create_node_or_opaque(kind_name, body, regenerate)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Body helpers
// ---------------------------------------------------------------------------

/// Turn a raw body into a field map, expanding the per-kind shorthands.
fn coerce_body(kind: StepKind, raw: &Value) -> Result<Map<String, Value>> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::Array(_) => match kind.list_field() {
            Some(field) => Ok(single_field(field, raw.clone())),
            None => Err(body_shape_error(kind, raw)),
        },
        scalar => match kind.shorthand_field() {
            Some(field) => Ok(single_field(field, scalar.clone())),
            None => Err(body_shape_error(kind, raw)),
        },
    }
}

fn single_field(name: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::with_capacity(1);
    map.insert(name.to_string(), value);
    map
}

fn take_identity(fields: &mut Map<String, Value>, kind_name: &str, regenerate: bool) -> String {
    match fields.remove("id") {
        Some(Value::String(id)) if !regenerate && !id.trim().is_empty() => id,
        _ => mint_identity(kind_name),
    }
}

/// Pull the expression out of a step body: a nested `expression` key wins
/// over an inline language key.
fn take_expression(fields: &mut Map<String, Value>) -> ExpressionNode {
    if let Some(nested) = fields.remove("expression") {
        return match nested {
            Value::Null => ExpressionNode::empty(),
            Value::Object(mut map) => match first_language_key(&map) {
                Some((key, language)) => {
                    let body = map.remove(&key).unwrap_or(Value::Null);
                    language_body(Some(language), body, ExpressionPlacement::Nested)
                }
                None => ExpressionNode {
                    language: None,
                    fields: map,
                    placement: ExpressionPlacement::Nested,
                    compact: false,
                },
            },
            scalar => language_body(None, scalar, ExpressionPlacement::Nested),
        };
    }

    match first_language_key(fields) {
        Some((key, language)) => {
            let body = fields.remove(&key).unwrap_or(Value::Null);
            language_body(Some(language), body, ExpressionPlacement::Inline)
        }
        None => ExpressionNode::empty(),
    }
}

fn first_language_key(map: &Map<String, Value>) -> Option<(String, ExpressionLanguage)> {
    map.keys()
        .find_map(|key| ExpressionLanguage::from_name(key).map(|lang| (key.clone(), lang)))
}

fn language_body(
    language: Option<ExpressionLanguage>,
    body: Value,
    placement: ExpressionPlacement,
) -> ExpressionNode {
    let (fields, compact) = match body {
        Value::Object(map) => (map, false),
        Value::Null => (Map::new(), false),
        scalar => (single_field("expression", scalar), true),
    };
    ExpressionNode {
        language,
        fields,
        placement,
        compact,
    }
}

fn opaque_node(kind_name: &str, raw: &Value, regenerate: bool) -> StepNode {
    let mut body = raw.clone();
    let id = match body.as_object_mut().and_then(|map| map.remove("id")) {
        Some(Value::String(id)) if !regenerate && !id.trim().is_empty() => id,
        _ => mint_identity(kind_name),
    };
    StepNode {
        id,
        kind: StepKind::Opaque,
        fields: Map::new(),
        slots: Vec::new(),
        expression: None,
        opaque: Some(OpaqueData {
            kind_name: kind_name.to_string(),
            body,
        }),
        visible: true,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

fn body_shape_error(kind: StepKind, raw: &Value) -> RouteweaveError {
    RouteweaveError::InvalidShape {
        kind: kind.as_str().to_string(),
        message: format!("expected a map, found {}", describe(raw)),
    }
}

fn document_shape_error(message: String) -> RouteweaveError {
    RouteweaveError::InvalidShape {
        kind: "document".into(),
        message,
    }
}

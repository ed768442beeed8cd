//! Typed tree model: step nodes, their child slots, expressions, and the
//! document that holds the top-level flows.

use serde_json::{Map, Value};

use routeweave_types::{ExpressionLanguage, StepKind};

use crate::catalog::SlotTarget;

/// Name of the generic repeated slot holding a node's main step sequence.
pub const STEPS_SLOT: &str = "steps";

// ---------------------------------------------------------------------------
// StepNode
// ---------------------------------------------------------------------------

/// One typed element of a pipeline definition tree.
///
/// Nodes are plain owned values. Every edit goes through the mutator, which
/// builds new nodes instead of changing existing ones.
#[derive(Debug, Clone)]
pub struct StepNode {
    pub id: String,
    pub kind: StepKind,
    /// Scalar and non-step fields, camelCase keys, `id` excluded.
    pub fields: Map<String, Value>,
    /// Child slots in catalog declaration order.
    pub slots: Vec<ChildSlot>,
    /// Present on every expression-bearing kind, possibly as the empty variant.
    pub expression: Option<ExpressionNode>,
    /// Set only for `StepKind::Opaque`.
    pub opaque: Option<OpaqueData>,
    /// UI-only expanded/visible annotation. Ignored by equality and export.
    pub visible: bool,
}

impl PartialEq for StepNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.fields == other.fields
            && self.slots == other.slots
            && self.expression == other.expression
            && self.opaque == other.opaque
    }
}

/// The raw data of a node whose kind the engine does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueData {
    pub kind_name: String,
    pub body: Value,
}

impl StepNode {
    /// The wire name of this node's kind; opaque nodes report the name they
    /// were loaded with.
    pub fn kind_name(&self) -> &str {
        match &self.opaque {
            Some(opaque) => &opaque.kind_name,
            None => self.kind.as_str(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Return a copy with `name` set to `value`.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn slot(&self, name: &str) -> Option<&ChildSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// The `steps` sequence, or an empty slice for kinds without one.
    pub fn steps(&self) -> &[StepNode] {
        match self.slot(STEPS_SLOT).map(|s| &s.value) {
            Some(SlotValue::Many(items)) => items,
            _ => &[],
        }
    }

    /// Direct children in slot-declaration order, sequences in order.
    pub fn children(&self) -> impl Iterator<Item = &StepNode> + '_ {
        self.slots.iter().flat_map(|slot| slot.value.iter())
    }

    /// Every identity in this subtree, pre-order.
    pub fn identities(&self) -> Vec<&str> {
        let mut ids = vec![self.id.as_str()];
        for child in self.children() {
            ids.extend(child.identities());
        }
        ids
    }

    /// Build a new node that shares this node's scalar parts and takes its
    /// slot contents from `f`.
    pub(crate) fn rebuild_with(&self, mut f: impl FnMut(&ChildSlot) -> SlotValue) -> StepNode {
        StepNode {
            id: self.id.clone(),
            kind: self.kind,
            fields: self.fields.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| ChildSlot {
                    name: slot.name.clone(),
                    target: slot.target,
                    value: f(slot),
                })
                .collect(),
            expression: self.expression.clone(),
            opaque: self.opaque.clone(),
            visible: self.visible,
        }
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ChildSlot {
    pub name: String,
    pub target: SlotTarget,
    pub value: SlotValue,
}

impl ChildSlot {
    pub fn is_steps(&self) -> bool {
        self.name == STEPS_SLOT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// Holds at most one child.
    Single(Option<Box<StepNode>>),
    /// Holds an ordered sequence of children.
    Many(Vec<StepNode>),
}

impl SlotValue {
    pub fn is_multiple(&self) -> bool {
        matches!(self, SlotValue::Many(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SlotValue::Single(child) => child.is_none(),
            SlotValue::Many(items) => items.is_empty(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &StepNode> + '_> {
        match self {
            SlotValue::Single(child) => Box::new(child.iter().map(|c| c.as_ref())),
            SlotValue::Many(items) => Box::new(items.iter()),
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Where an expression sat in the raw step body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionPlacement {
    /// `filter: { simple: "..." }`
    Inline,
    /// `filter: { expression: { simple: "..." } }`
    Nested,
}

/// A one-of-many expression: at most one language is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    /// `None` is the empty variant.
    pub language: Option<ExpressionLanguage>,
    /// The language body (`expression`, `resultType`, `trim`, ...).
    pub fields: Map<String, Value>,
    pub placement: ExpressionPlacement,
    /// The body was a bare string in the raw input.
    pub compact: bool,
}

impl ExpressionNode {
    pub fn empty() -> Self {
        Self {
            language: None,
            fields: Map::new(),
            placement: ExpressionPlacement::Nested,
            compact: false,
        }
    }

    /// An inline expression with a plain text body, e.g. `simple: "${body}"`.
    pub fn text(language: ExpressionLanguage, expression: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("expression".into(), Value::String(expression.into()));
        Self {
            language: Some(language),
            fields,
            placement: ExpressionPlacement::Inline,
            compact: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.fields.is_empty()
    }

    pub fn expression_text(&self) -> Option<&str> {
        self.fields.get("expression").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The root aggregate: an ordered sequence of top-level flows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub flows: Vec<StepNode>,
}

impl Document {
    pub fn new(flows: Vec<StepNode>) -> Self {
        Self { flows }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Total number of nodes across all flows.
    pub fn node_count(&self) -> usize {
        fn count(node: &StepNode) -> usize {
            1 + node.children().map(count).sum::<usize>()
        }
        self.flows.iter().map(count).sum()
    }
}

/// Result of locating a node by identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementLookupResult<'a> {
    pub node: Option<&'a StepNode>,
    /// `None` for top-level flows.
    pub parent_id: Option<&'a str>,
    /// Index within the parent's slot; only set for repeated slots.
    pub position: Option<usize>,
    /// Name of the parent slot holding the node.
    pub slot: Option<&'a str>,
}

impl<'a> ElementLookupResult<'a> {
    pub fn not_found() -> Self {
        Self {
            node: None,
            parent_id: None,
            position: None,
            slot: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.node.is_some()
    }
}

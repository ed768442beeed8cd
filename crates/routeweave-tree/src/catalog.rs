//! Step metadata: per-kind child slots, required fields, and display titles.
//!
//! The factory, navigator and mutator read which kinds own which children from
//! a [`MetadataCatalog`]. Callers build one (usually
//! [`MetadataCatalog::builtin`], optionally overlaid from a JSON file) and pass
//! it by reference.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use routeweave_types::{Result, StepCategory, StepKind};

use crate::node::STEPS_SLOT;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// What a slot's raw elements look like and which kinds it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotTarget {
    /// Bare bodies of one kind: `when: [ { simple: ..., steps: [] } ]`.
    Body(StepKind),
    /// `{ kindName: body }` entries of one kind: `onException: [ { onException: {...} } ]`.
    Entry(StepKind),
    /// `{ kindName: body }` entries of any processing step.
    AnyStep,
}

impl SlotTarget {
    /// Whether a node of `kind` may be placed in a slot with this target.
    pub fn accepts(self, kind: StepKind) -> bool {
        match self {
            SlotTarget::Body(k) | SlotTarget::Entry(k) => k == kind,
            SlotTarget::AnyStep => matches!(
                kind.category(),
                StepCategory::Processor
                    | StepCategory::Endpoint
                    | StepCategory::Group
                    | StepCategory::Opaque
            ),
        }
    }

    /// The fixed kind of this target, if it has one.
    pub fn kind(self) -> Option<StepKind> {
        match self {
            SlotTarget::Body(k) | SlotTarget::Entry(k) => Some(k),
            SlotTarget::AnyStep => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSlotDescriptor {
    pub name: String,
    pub target: SlotTarget,
    #[serde(default)]
    pub multiple: bool,
}

impl ChildSlotDescriptor {
    /// The generic `steps` sequence.
    pub fn steps() -> Self {
        Self::many(STEPS_SLOT, SlotTarget::AnyStep)
    }

    pub fn single(name: impl Into<String>, target: SlotTarget) -> Self {
        Self {
            name: name.into(),
            target,
            multiple: false,
        }
    }

    pub fn many(name: impl Into<String>, target: SlotTarget) -> Self {
        Self {
            name: name.into(),
            target,
            multiple: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    #[default]
    Scalar,
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
        }
    }

    pub fn expression() -> Self {
        Self {
            name: "expression".into(),
            kind: FieldKind::Expression,
        }
    }
}

/// Everything the catalog knows about one kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slots: Vec<ChildSlotDescriptor>,
    #[serde(default)]
    pub required: Vec<FieldDescriptor>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    kinds: HashMap<String, KindMetadata>,
}

// ---------------------------------------------------------------------------
// MetadataCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    kinds: HashMap<StepKind, KindMetadata>,
}

impl MetadataCatalog {
    /// A catalog that knows nothing: every kind has no slots and no required fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the metadata of one kind.
    pub fn with_kind(mut self, kind: StepKind, metadata: KindMetadata) -> Self {
        self.kinds.insert(kind, metadata);
        self
    }

    pub fn child_slots(&self, kind: StepKind) -> &[ChildSlotDescriptor] {
        self.kinds.get(&kind).map(|m| m.slots.as_slice()).unwrap_or(&[])
    }

    pub fn required_fields(&self, kind: StepKind) -> &[FieldDescriptor] {
        self.kinds
            .get(&kind)
            .map(|m| m.required.as_slice())
            .unwrap_or(&[])
    }

    pub fn display_title(&self, kind: StepKind) -> String {
        if kind == StepKind::Opaque {
            return "Unknown step".to_string();
        }
        self.kinds
            .get(&kind)
            .and_then(|m| m.title.clone())
            .unwrap_or_else(|| humanize(kind.as_str()))
    }

    /// Overlay entries from a JSON catalog file body.
    ///
    /// The file maps kind names to metadata; each listed kind replaces the
    /// existing entry wholesale.
    ///
    /// ```json
    /// { "kinds": { "log": { "title": "Log", "required": [{ "name": "message" }] } } }
    /// ```
    pub fn merge_json(mut self, input: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(input)?;
        for (name, metadata) in file.kinds {
            let kind: StepKind = name.parse()?;
            self.kinds.insert(kind, metadata);
        }
        Ok(self)
    }

    /// The built-in catalog overlaid with a JSON catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let catalog = Self::builtin().merge_json(&source)?;
        tracing::debug!(path = %path.display(), kinds = catalog.kinds.len(), "Metadata catalog loaded");
        Ok(catalog)
    }

    /// The built-in catalog covering every known step kind.
    pub fn builtin() -> Self {
        use StepKind::*;

        let mut kinds: HashMap<StepKind, KindMetadata> = StepKind::ALL
            .iter()
            .filter(|k| **k != Opaque)
            .map(|k| (*k, KindMetadata::default()))
            .collect();

        let mut slot = |kind: StepKind, descriptor: ChildSlotDescriptor| {
            kinds.entry(kind).or_default().slots.push(descriptor);
        };

        // Flows
        slot(Route, ChildSlotDescriptor::single("from", SlotTarget::Body(From)));
        slot(RouteTemplate, ChildSlotDescriptor::single("route", SlotTarget::Body(Route)));
        slot(RouteTemplate, ChildSlotDescriptor::single("from", SlotTarget::Body(From)));
        for (name, kind) in [
            ("intercept", Intercept),
            ("interceptFrom", InterceptFrom),
            ("interceptSendToEndpoint", InterceptSendToEndpoint),
            ("onException", OnException),
            ("onCompletion", OnCompletion),
        ] {
            slot(RouteConfiguration, ChildSlotDescriptor::many(name, SlotTarget::Entry(kind)));
        }
        for verb in [Get, Post, Put, Delete, Patch, Head] {
            slot(Rest, ChildSlotDescriptor::many(verb.as_str(), SlotTarget::Body(verb)));
            slot(verb, ChildSlotDescriptor::single("to", SlotTarget::Body(To)));
        }

        // Sequences
        for kind in [
            From, Intercept, InterceptFrom, InterceptSendToEndpoint, OnCompletion, OnException,
            When, Otherwise, DoCatch, DoFinally, OnFallback, Step, Aggregate, CircuitBreaker,
            DoTry, Filter, IdempotentConsumer, LoadBalance, Loop, Multicast, Pipeline,
            Resequence, Saga, Split, Transacted,
        ] {
            slot(kind, ChildSlotDescriptor::steps());
        }

        // Branches
        slot(Choice, ChildSlotDescriptor::many("when", SlotTarget::Body(When)));
        slot(Choice, ChildSlotDescriptor::single("otherwise", SlotTarget::Body(Otherwise)));
        slot(DoTry, ChildSlotDescriptor::many("doCatch", SlotTarget::Body(DoCatch)));
        slot(DoTry, ChildSlotDescriptor::single("doFinally", SlotTarget::Body(DoFinally)));
        slot(
            CircuitBreaker,
            ChildSlotDescriptor::single("onFallback", SlotTarget::Body(OnFallback)),
        );

        let mut require = |kind: StepKind, field: FieldDescriptor| {
            kinds.entry(kind).or_default().required.push(field);
        };

        for kind in [From, To, ToD, WireTap, Enrich, PollEnrich, Poll] {
            require(kind, FieldDescriptor::scalar("uri"));
        }
        require(Log, FieldDescriptor::scalar("message"));
        require(ConvertBodyTo, FieldDescriptor::scalar("type"));
        for kind in [RemoveHeader, RemoveProperty, Kamelet, SetHeader, SetProperty] {
            require(kind, FieldDescriptor::scalar("name"));
        }
        for kind in [RemoveHeaders, RemoveProperties] {
            require(kind, FieldDescriptor::scalar("pattern"));
        }
        require(Process, FieldDescriptor::scalar("ref"));
        require(DoCatch, FieldDescriptor::scalar("exception"));
        require(IdempotentConsumer, FieldDescriptor::scalar("idempotentRepository"));
        for kind in StepKind::ALL.iter().copied().filter(|k| k.is_expression_bearing()) {
            require(kind, FieldDescriptor::expression());
        }

        kinds.entry(ToD).or_default().title = Some("Dynamic To".into());
        kinds.entry(WireTap).or_default().title = Some("Wire Tap".into());
        kinds.entry(From).or_default().title = Some("From".into());

        Self { kinds }
    }
}

/// `setHeader` → `Set Header`.
fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

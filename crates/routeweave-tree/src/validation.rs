//! Step validation: required fields, expressions, connector parameters, and
//! document lint rules.
//!
//! [`Validator::check_required`] inspects a single node the way a property
//! form does. [`Validator::validate_document`] runs it over every node and
//! adds the document-level [`LintRule`]s. Call
//! [`Validator::validate_or_raise`] to fail on the first `Error`-severity
//! issue.

use std::collections::HashMap;
use std::ops::ControlFlow;

use serde_json::Value;

use routeweave_types::{ExpressionLanguage, Result, RouteweaveError, StepKind};

use crate::catalog::{FieldKind, MetadataCatalog};
use crate::connectors::{parse_endpoint_uri, ConnectorCatalog, ConnectorDescriptor, EndpointUri};
use crate::navigator::{count_duplicate_identities, duplicate_identities, walk};
use crate::node::{Document, ExpressionNode, StepNode};
use crate::placeholders::placeholder_name;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
    pub field: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Outcome of checking one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// No `Error`-severity diagnostics.
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let is_valid = !diagnostics.iter().any(|d| d.severity == Severity::Error);
        Self {
            is_valid,
            diagnostics,
        }
    }

    /// Diagnostic messages in the order they were found.
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, document: &Document) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Helper predicates
// ---------------------------------------------------------------------------

/// Absent, null, whitespace-only, or an empty collection.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// The whole value is a single `{{name}}` reference.
fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("{{")
        && value.find("}}") == Some(value.len() - 2)
        && placeholder_name(value).is_some()
}

/// Fields of a language body that carry the expression itself.
fn expression_keys(language: ExpressionLanguage) -> &'static [&'static str] {
    match language {
        ExpressionLanguage::Tokenize => &["token"],
        ExpressionLanguage::Method => &["ref", "beanType", "method"],
        _ => &["expression"],
    }
}

fn is_expression_complete(expression: Option<&ExpressionNode>) -> bool {
    let Some(expression) = expression else {
        return false;
    };
    let Some(language) = expression.language else {
        return false;
    };
    expression_keys(language)
        .iter()
        .any(|key| !is_blank(expression.fields.get(*key)))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parameter values of an endpoint, from the URI path, the query string, and
/// the step's `parameters` map, later sources winning.
fn endpoint_values(
    descriptor: &ConnectorDescriptor,
    uri: &EndpointUri<'_>,
    parameters: Option<&Value>,
) -> HashMap<String, String> {
    let mut values = HashMap::new();

    let path_params: Vec<_> = descriptor.path_parameters().collect();
    if !uri.path.is_empty() {
        match path_params.as_slice() {
            [] => {}
            [only] => {
                values.insert(only.name.clone(), uri.path.to_string());
            }
            many => {
                for (param, part) in many.iter().zip(uri.path.splitn(many.len(), ':')) {
                    values.insert(param.name.clone(), part.to_string());
                }
            }
        }
    }

    for (name, value) in uri.query_pairs() {
        values.insert(name.to_string(), value.to_string());
    }

    if let Some(Value::Object(map)) = parameters {
        for (name, value) in map {
            if let Some(text) = value_text(value) {
                values.insert(name.clone(), text);
            }
        }
    }

    values
}

fn node_error(rule: &str, node: &StepNode, field: Option<&str>, message: String) -> Diagnostic {
    Diagnostic {
        rule: rule.into(),
        severity: Severity::Error,
        message,
        node_id: Some(node.id.clone()),
        field: field.map(str::to_string),
        fix: None,
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    catalog: &'a MetadataCatalog,
    connectors: &'a ConnectorCatalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a MetadataCatalog, connectors: &'a ConnectorCatalog) -> Self {
        Self {
            catalog,
            connectors,
        }
    }

    /// Check one node's required fields, expression, and connector parameters.
    /// Children are not visited.
    pub fn check_required(&self, node: &StepNode) -> ValidationReport {
        if node.kind == StepKind::Opaque {
            return ValidationReport::from_diagnostics(Vec::new());
        }

        let title = self.catalog.display_title(node.kind);
        let mut diagnostics = Vec::new();

        for field in self.catalog.required_fields(node.kind) {
            match field.kind {
                FieldKind::Scalar if is_blank(node.field(&field.name)) => {
                    let mut diagnostic = node_error(
                        "required_field",
                        node,
                        Some(&field.name),
                        format!("{title} requires '{}'", field.name),
                    );
                    diagnostic.fix = Some(format!("Set '{}' on step '{}'", field.name, node.id));
                    diagnostics.push(diagnostic);
                }
                FieldKind::Expression if !is_expression_complete(node.expression.as_ref()) => {
                    let mut diagnostic = node_error(
                        "required_expression",
                        node,
                        Some(&field.name),
                        format!("{title} requires an expression"),
                    );
                    diagnostic.fix =
                        Some("Pick an expression language and fill in the expression".into());
                    diagnostics.push(diagnostic);
                }
                _ => {}
            }
        }

        if node.kind.is_endpoint() {
            self.check_endpoint(node, &mut diagnostics);
        }

        ValidationReport::from_diagnostics(diagnostics)
    }

    fn check_endpoint(&self, node: &StepNode, diagnostics: &mut Vec<Diagnostic>) {
        let Some(uri) = node.field_str("uri").and_then(parse_endpoint_uri) else {
            return;
        };
        let Some(descriptor) = self.connectors.get(uri.scheme) else {
            tracing::trace!(node = %node.id, scheme = %uri.scheme, "No connector descriptor");
            return;
        };
        let values = endpoint_values(descriptor, &uri, node.field("parameters"));

        for param in &descriptor.parameters {
            let value = values
                .get(&param.name)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty());
            match value {
                None if param.required && param.default.is_none() => {
                    diagnostics.push(node_error(
                        "connector_parameter",
                        node,
                        Some(&param.name),
                        format!(
                            "Parameter '{}' is required by the '{}' connector",
                            param.name, descriptor.scheme
                        ),
                    ));
                }
                Some(value) if param.secret && !is_placeholder(value) => {
                    diagnostics.push(Diagnostic {
                        rule: "plaintext_secret".into(),
                        severity: Severity::Warning,
                        message: format!(
                            "Parameter '{}' holds a plain-text secret",
                            param.name
                        ),
                        node_id: Some(node.id.clone()),
                        field: Some(param.name.clone()),
                        fix: Some(format!(
                            "Replace the value with a placeholder such as {{{{{}}}}}",
                            param.name
                        )),
                    });
                }
                _ => {}
            }
        }
    }

    /// `check_required` over every node plus the document lint rules.
    pub fn validate_document(&self, document: &Document) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let _ = walk(document, |visit| {
            diagnostics.extend(self.check_required(visit.node).diagnostics);
            ControlFlow::<()>::Continue(())
        });
        for rule in lint_rules() {
            diagnostics.extend(rule.apply(document));
        }
        tracing::debug!(diagnostics = diagnostics.len(), "Document validated");
        diagnostics
    }

    /// Run every check; return `Err` if any `Error`-severity diagnostic is found.
    pub fn validate_or_raise(&self, document: &Document) -> Result<Vec<Diagnostic>> {
        let diagnostics = self.validate_document(document);
        let errors: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(RouteweaveError::ValidationError(errors.join("; ")));
        }
        Ok(diagnostics)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub fn lint_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(UniqueIdentityRule),
        Box::new(FlowHasEntryRule),
        Box::new(OpaqueKindRule),
        Box::new(ChoiceHasBranchRule),
    ]
}

/// Nodes of the document matching `predicate`, pre-order.
fn nodes_where(document: &Document, predicate: impl Fn(&StepNode) -> bool) -> Vec<&StepNode> {
    let mut nodes = Vec::new();
    let _ = walk(document, |visit| {
        if predicate(visit.node) {
            nodes.push(visit.node);
        }
        ControlFlow::<()>::Continue(())
    });
    nodes
}

struct UniqueIdentityRule;
impl LintRule for UniqueIdentityRule {
    fn name(&self) -> &str { "unique_identity" }
    fn apply(&self, document: &Document) -> Vec<Diagnostic> {
        duplicate_identities(document)
            .into_iter()
            .map(|id| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!(
                    "Identity '{id}' is used by {} nodes",
                    count_duplicate_identities(document, &id)
                ),
                node_id: Some(id.clone()),
                field: None,
                fix: Some(format!("Regenerate the identities of the copies of '{id}'")),
            })
            .collect()
    }
}

struct FlowHasEntryRule;
impl LintRule for FlowHasEntryRule {
    fn name(&self) -> &str { "flow_has_entry" }
    fn apply(&self, document: &Document) -> Vec<Diagnostic> {
        let empty = |node: &StepNode, slot: &str| {
            node.slot(slot).map_or(true, |s| s.value.is_empty())
        };
        nodes_where(document, |node| match node.kind {
            StepKind::Route => empty(node, "from"),
            StepKind::RouteTemplate => empty(node, "from") && empty(node, "route"),
            _ => false,
        })
        .into_iter()
        .map(|node| Diagnostic {
            rule: self.name().into(),
            severity: Severity::Error,
            message: format!("{} '{}' has no 'from' endpoint", node.kind, node.id),
            node_id: Some(node.id.clone()),
            field: Some("from".into()),
            fix: Some("Add a 'from' endpoint that starts the route".into()),
        })
        .collect()
    }
}

struct OpaqueKindRule;
impl LintRule for OpaqueKindRule {
    fn name(&self) -> &str { "opaque_kind" }
    fn apply(&self, document: &Document) -> Vec<Diagnostic> {
        nodes_where(document, |node| node.kind == StepKind::Opaque)
            .into_iter()
            .map(|node| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Unknown step kind '{}' on '{}' is kept as-is and not validated",
                    node.kind_name(),
                    node.id
                ),
                node_id: Some(node.id.clone()),
                field: None,
                fix: None,
            })
            .collect()
    }
}

struct ChoiceHasBranchRule;
impl LintRule for ChoiceHasBranchRule {
    fn name(&self) -> &str { "choice_has_branch" }
    fn apply(&self, document: &Document) -> Vec<Diagnostic> {
        nodes_where(document, |node| {
            node.kind == StepKind::Choice && node.slot("when").map_or(true, |s| s.value.is_empty())
        })
        .into_iter()
        .map(|node| Diagnostic {
            rule: self.name().into(),
            severity: Severity::Warning,
            message: format!("Choice '{}' has no 'when' branch", node.id),
            node_id: Some(node.id.clone()),
            field: Some("when".into()),
            fix: Some("Add a 'when' branch or replace the choice with its steps".into()),
        })
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

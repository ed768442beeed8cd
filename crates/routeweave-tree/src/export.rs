//! Typed tree back to the raw shape.
//!
//! The output is what the factory reads: `create_document(document_to_raw(d))`
//! yields a document equal to `d`.

use serde_json::{Map, Value};

use routeweave_dsl::wrap_entry;

use crate::catalog::SlotTarget;
use crate::node::{Document, ExpressionNode, ExpressionPlacement, SlotValue, StepNode};

/// The flow list as `[{ kindName: body }, ...]`.
pub fn document_to_raw(document: &Document) -> Value {
    Value::Array(document.flows.iter().map(entry_to_raw).collect())
}

/// A node as a single-key `{ kindName: body }` entry.
pub fn entry_to_raw(node: &StepNode) -> Value {
    wrap_entry(node.kind_name(), node_to_raw(node))
}

/// A node's bare body.
pub fn node_to_raw(node: &StepNode) -> Value {
    if let Some(opaque) = &node.opaque {
        return match &opaque.body {
            Value::Object(body) => {
                let mut map = Map::with_capacity(body.len() + 1);
                map.insert("id".into(), Value::String(node.id.clone()));
                map.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(map)
            }
            other => other.clone(),
        };
    }

    if let Some(field) = node.kind.list_field() {
        if node.fields.len() == 1 {
            if let Some(list @ Value::Array(_)) = node.fields.get(field) {
                return list.clone();
            }
        }
    }

    let mut map = Map::new();
    map.insert("id".into(), Value::String(node.id.clone()));
    map.extend(node.fields.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(expression) = &node.expression {
        write_expression(&mut map, expression);
    }

    for slot in &node.slots {
        match &slot.value {
            SlotValue::Single(Some(child)) => {
                map.insert(slot.name.clone(), child_to_raw(slot.target, child));
            }
            SlotValue::Single(None) => {}
            SlotValue::Many(items) if items.is_empty() && !slot.is_steps() => {}
            SlotValue::Many(items) => {
                let raw = items.iter().map(|c| child_to_raw(slot.target, c)).collect();
                map.insert(slot.name.clone(), Value::Array(raw));
            }
        }
    }

    Value::Object(map)
}

fn child_to_raw(target: SlotTarget, node: &StepNode) -> Value {
    match target {
        SlotTarget::Body(_) => node_to_raw(node),
        SlotTarget::Entry(_) | SlotTarget::AnyStep => entry_to_raw(node),
    }
}

fn write_expression(map: &mut Map<String, Value>, expression: &ExpressionNode) {
    if expression.is_empty() {
        return;
    }

    let body = match expression.fields.get("expression") {
        Some(text) if expression.compact && expression.fields.len() == 1 => text.clone(),
        _ => Value::Object(expression.fields.clone()),
    };

    match (expression.language, expression.placement) {
        (Some(language), ExpressionPlacement::Inline) => {
            map.insert(language.as_str().to_string(), body);
        }
        (Some(language), ExpressionPlacement::Nested) => {
            map.insert("expression".into(), wrap_entry(language.as_str(), body));
        }
        (None, _) => {
            map.insert("expression".into(), body);
        }
    }
}

//! Tree Navigator: read-only traversal of a [`Document`].
//!
//! Every search is depth-first over the flows in order, descending into slots
//! in declaration order and into sequences in element order. The first match
//! wins.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use routeweave_types::StepKind;

use crate::node::{Document, ElementLookupResult, SlotValue, StepNode};

/// One step of a [`walk`].
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: &'a StepNode,
    /// `None` for top-level flows.
    pub parent: Option<&'a StepNode>,
    /// Name of the parent slot holding `node`.
    pub slot: Option<&'a str>,
    /// Index within a repeated slot or within the flow list.
    pub position: Option<usize>,
    /// 0 for top-level flows.
    pub depth: usize,
}

/// Pre-order traversal. The visitor can stop the walk early by returning
/// `ControlFlow::Break`, whose value is handed back.
pub fn walk<'a, B>(
    document: &'a Document,
    mut visitor: impl FnMut(&Visit<'a>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    for (index, flow) in document.flows.iter().enumerate() {
        let visit = Visit {
            node: flow,
            parent: None,
            slot: None,
            position: Some(index),
            depth: 0,
        };
        walk_node(visit, &mut visitor)?;
    }
    ControlFlow::Continue(())
}

fn walk_node<'a, B>(
    visit: Visit<'a>,
    visitor: &mut impl FnMut(&Visit<'a>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    visitor(&visit)?;
    let node = visit.node;
    for slot in &node.slots {
        let child_visit = |child: &'a StepNode, position: Option<usize>| Visit {
            node: child,
            parent: Some(node),
            slot: Some(slot.name.as_str()),
            position,
            depth: visit.depth + 1,
        };
        match &slot.value {
            SlotValue::Single(Some(child)) => walk_node(child_visit(&**child, None), visitor)?,
            SlotValue::Single(None) => {}
            SlotValue::Many(items) => {
                for (index, child) in items.iter().enumerate() {
                    walk_node(child_visit(child, Some(index)), visitor)?;
                }
            }
        }
    }
    ControlFlow::Continue(())
}

/// Locate the first node with identity `id`.
pub fn find_by_identity<'a>(document: &'a Document, id: &str) -> ElementLookupResult<'a> {
    let found = walk(document, |visit| {
        if visit.node.id == id {
            ControlFlow::Break(ElementLookupResult {
                node: Some(visit.node),
                parent_id: visit.parent.map(|p| p.id.as_str()),
                position: visit.position,
                slot: visit.slot,
            })
        } else {
            ControlFlow::Continue(())
        }
    });
    match found {
        ControlFlow::Break(result) => result,
        ControlFlow::Continue(()) => ElementLookupResult::not_found(),
    }
}

pub fn find_node<'a>(document: &'a Document, id: &str) -> Option<&'a StepNode> {
    find_by_identity(document, id).node
}

/// The nodes from a top-level flow down to the first node with identity `id`,
/// both ends included.
fn path_to<'a>(document: &'a Document, id: &str) -> Option<Vec<&'a StepNode>> {
    fn descend<'a>(node: &'a StepNode, id: &str, path: &mut Vec<&'a StepNode>) -> bool {
        path.push(node);
        if node.id == id || node.children().any(|child| descend(child, id, path)) {
            return true;
        }
        path.pop();
        false
    }

    let mut path = Vec::new();
    document
        .flows
        .iter()
        .any(|flow| descend(flow, id, &mut path))
        .then_some(path)
}

/// Identities of the node's ancestors, innermost first.
///
/// The chain ends at the first `from` node met on the way up, or at the
/// top-level flow. The node itself is not included.
pub fn ancestor_chain(document: &Document, id: &str) -> Vec<String> {
    let Some(path) = path_to(document, id) else {
        return Vec::new();
    };
    let mut chain = Vec::new();
    for ancestor in path.iter().rev().skip(1) {
        chain.push(ancestor.id.clone());
        if ancestor.kind == StepKind::From {
            break;
        }
    }
    chain
}

/// Identity of the top-level flow that holds `id` (its own identity when `id`
/// is a flow).
pub fn find_topmost_flow_identity_for(document: &Document, id: &str) -> Option<String> {
    path_to(document, id).and_then(|path| path.first().map(|flow| flow.id.clone()))
}

/// Whether `candidate_id` sits strictly below the first node with `ancestor_id`.
pub fn is_descendant(document: &Document, ancestor_id: &str, candidate_id: &str) -> bool {
    fn contains(node: &StepNode, id: &str) -> bool {
        node.children().any(|child| child.id == id || contains(child, id))
    }
    find_node(document, ancestor_id).is_some_and(|ancestor| contains(ancestor, candidate_id))
}

/// Number of nodes carrying identity `id`.
pub fn count_duplicate_identities(document: &Document, id: &str) -> usize {
    let mut count = 0;
    let _ = walk(document, |visit| {
        if visit.node.id == id {
            count += 1;
        }
        ControlFlow::<()>::Continue(())
    });
    count
}

/// Every identity in the document, pre-order.
pub fn all_identities(document: &Document) -> Vec<&str> {
    let mut ids = Vec::with_capacity(document.node_count());
    let _ = walk(document, |visit| {
        ids.push(visit.node.id.as_str());
        ControlFlow::<()>::Continue(())
    });
    ids
}

/// Identities held by more than one node, in order of first appearance.
pub fn duplicate_identities(document: &Document) -> Vec<String> {
    let ids = all_identities(document);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in &ids {
        *counts.entry(*id).or_default() += 1;
    }
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| counts[id] > 1 && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MetadataCatalog;
    use crate::factory::NodeFactory;
    use serde_json::json;

    fn sample() -> Document {
        let catalog = MetadataCatalog::builtin();
        NodeFactory::new(&catalog)
            .create_document(&json!([
                { "route": { "id": "route-1", "from": { "id": "from-1", "uri": "timer:t", "steps": [
                    { "log": { "id": "log-1", "message": "a" } },
                    { "choice": { "id": "choice-1",
                        "when": [
                            { "id": "when-1", "simple": "${body}", "steps": [
                                { "to": { "id": "to-1", "uri": "direct:x" } }
                            ] }
                        ],
                        "otherwise": { "id": "otherwise-1", "steps": [] } } }
                ] } } },
                { "from": { "id": "from-2", "uri": "direct:x", "steps": [
                    { "step": { "id": "step-1", "steps": [{ "log": { "id": "log-2", "message": "b" } }] } }
                ] } }
            ]))
            .unwrap()
    }

    #[test]
    fn find_nested_node_with_parent_and_position() {
        let doc = sample();
        let found = find_by_identity(&doc, "to-1");
        assert_eq!(found.node.map(|n| n.kind), Some(StepKind::To));
        assert_eq!(found.parent_id, Some("when-1"));
        assert_eq!(found.position, Some(0));
        assert_eq!(found.slot, Some("steps"));
    }

    #[test]
    fn singular_slot_has_no_position() {
        let doc = sample();
        let found = find_by_identity(&doc, "otherwise-1");
        assert_eq!(found.parent_id, Some("choice-1"));
        assert_eq!(found.slot, Some("otherwise"));
        assert_eq!(found.position, None);

        let from = find_by_identity(&doc, "from-1");
        assert_eq!(from.parent_id, Some("route-1"));
        assert_eq!(from.position, None);
    }

    #[test]
    fn top_level_flow_has_no_parent() {
        let doc = sample();
        let found = find_by_identity(&doc, "from-2");
        assert!(found.is_found());
        assert_eq!(found.parent_id, None);
        assert_eq!(found.position, Some(1));
    }

    #[test]
    fn missing_identity_is_not_found() {
        let doc = sample();
        assert_eq!(find_by_identity(&doc, "nope"), ElementLookupResult::not_found());
    }

    #[test]
    fn ancestor_chain_stops_at_from() {
        let doc = sample();
        assert_eq!(
            ancestor_chain(&doc, "to-1"),
            vec!["when-1", "choice-1", "from-1"]
        );
        assert_eq!(ancestor_chain(&doc, "log-2"), vec!["step-1", "from-2"]);
        assert!(ancestor_chain(&doc, "route-1").is_empty());
        assert_eq!(ancestor_chain(&doc, "from-1"), vec!["route-1"]);
    }

    #[test]
    fn topmost_flow() {
        let doc = sample();
        assert_eq!(find_topmost_flow_identity_for(&doc, "to-1").as_deref(), Some("route-1"));
        assert_eq!(find_topmost_flow_identity_for(&doc, "from-2").as_deref(), Some("from-2"));
        assert_eq!(find_topmost_flow_identity_for(&doc, "nope"), None);
    }

    #[test]
    fn descendant_test_is_strict() {
        let doc = sample();
        assert!(is_descendant(&doc, "choice-1", "to-1"));
        assert!(is_descendant(&doc, "route-1", "otherwise-1"));
        assert!(!is_descendant(&doc, "to-1", "choice-1"));
        assert!(!is_descendant(&doc, "choice-1", "choice-1"));
        assert!(!is_descendant(&doc, "from-2", "to-1"));
    }

    #[test]
    fn walk_reports_depth_and_can_stop() {
        let doc = sample();
        let depth = walk(&doc, |visit| {
            if visit.node.id == "to-1" {
                ControlFlow::Break(visit.depth)
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(depth, ControlFlow::Break(4));
    }

    #[test]
    fn identities_and_duplicates() {
        let doc = sample();
        assert_eq!(all_identities(&doc).len(), doc.node_count());
        assert_eq!(count_duplicate_identities(&doc, "log-1"), 1);
        assert_eq!(count_duplicate_identities(&doc, "nope"), 0);
        assert!(duplicate_identities(&doc).is_empty());

        let mut doubled = doc.clone();
        doubled.flows.push(doc.flows[1].clone());
        assert_eq!(count_duplicate_identities(&doubled, "log-2"), 2);
        assert_eq!(duplicate_identities(&doubled), vec!["from-2", "step-1", "log-2"]);
    }
}

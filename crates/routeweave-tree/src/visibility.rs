//! Visibility Projector: marks which nodes a tree view should show.
//!
//! `step` groups are collapsed unless they lie on the selected node's
//! ancestor chain or are the selection itself. Nodes inside a collapsed group
//! are hidden; everything else is visible.

use std::collections::HashSet;

use crate::navigator::ancestor_chain;
use crate::node::{Document, SlotValue, StepNode};

/// A copy of `document` with every node's `visible` flag set for the given
/// selection.
pub fn project(document: &Document, selected_id: Option<&str>) -> Document {
    let mut expanded: HashSet<String> = HashSet::new();
    if let Some(selected) = selected_id {
        expanded.extend(ancestor_chain(document, selected));
        expanded.insert(selected.to_string());
    }
    Document::new(
        document
            .flows
            .iter()
            .map(|flow| annotate(flow, true, &expanded))
            .collect(),
    )
}

fn annotate(node: &StepNode, visible: bool, expanded: &HashSet<String>) -> StepNode {
    let children_visible =
        visible && (!node.kind.is_step_group() || expanded.contains(&node.id));
    let mut projected = node.rebuild_with(|slot| match &slot.value {
        SlotValue::Single(child) => SlotValue::Single(
            child
                .as_ref()
                .map(|c| Box::new(annotate(c, children_visible, expanded))),
        ),
        SlotValue::Many(items) => SlotValue::Many(
            items
                .iter()
                .map(|c| annotate(c, children_visible, expanded))
                .collect(),
        ),
    });
    projected.visible = visible;
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MetadataCatalog;
    use crate::factory::NodeFactory;
    use crate::navigator::find_node;
    use serde_json::json;

    fn sample() -> Document {
        let catalog = MetadataCatalog::builtin();
        NodeFactory::new(&catalog)
            .create_document(&json!([
                { "from": { "id": "from-1", "uri": "timer:t", "steps": [
                    { "step": { "id": "step-1", "steps": [
                        { "log": { "id": "log-1", "message": "a" } },
                        { "step": { "id": "step-2", "steps": [
                            { "log": { "id": "log-2", "message": "b" } }
                        ] } }
                    ] } },
                    { "filter": { "id": "filter-1", "simple": "x", "steps": [
                        { "log": { "id": "log-3", "message": "c" } }
                    ] } }
                ] } }
            ]))
            .unwrap()
    }

    fn visible(document: &Document, id: &str) -> bool {
        find_node(document, id).unwrap().visible
    }

    #[test]
    fn collapsed_groups_hide_their_children() {
        let projected = project(&sample(), None);
        assert!(visible(&projected, "from-1"));
        assert!(visible(&projected, "step-1"));
        assert!(!visible(&projected, "log-1"));
        assert!(!visible(&projected, "step-2"));
        assert!(!visible(&projected, "log-2"));
        // non-group containers stay open
        assert!(visible(&projected, "log-3"));
    }

    #[test]
    fn selection_expands_its_ancestors() {
        let projected = project(&sample(), Some("log-2"));
        assert!(visible(&projected, "log-1"));
        assert!(visible(&projected, "step-2"));
        assert!(visible(&projected, "log-2"));
    }

    #[test]
    fn selected_group_is_expanded() {
        let projected = project(&sample(), Some("step-1"));
        assert!(visible(&projected, "log-1"));
        assert!(visible(&projected, "step-2"));
        assert!(!visible(&projected, "log-2"));
    }

    #[test]
    fn projection_does_not_change_equality() {
        let doc = sample();
        assert_eq!(project(&doc, None), doc);
    }
}

//! Tree Mutator: copy-on-write edits.
//!
//! Every operation takes the current document by reference and returns a new
//! one. The path from each flow root down to an edit is rebuilt node by node;
//! the caller's document is never touched. An edit that cannot be applied
//! (unknown identity, rejected placement, cycle) returns an equal document and
//! logs why at `debug` level.

use std::collections::{HashMap, HashSet};

use crate::navigator::{
    all_identities, count_duplicate_identities, find_by_identity, find_node, is_descendant,
};
use crate::node::{Document, ElementLookupResult, SlotValue, StepNode};

/// Where a pending node may go once its parent is reached.
#[derive(Debug, Clone, Copy)]
enum Placement<'s> {
    /// A typed slot for the node's kind first, then `steps`.
    Auto,
    /// Exactly the named slot.
    Slot(&'s str),
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// Insert `node` under the node with identity `parent_id`.
///
/// Flow kinds with no parent, or whose parent is a top-level flow without an
/// open slot for them, go into the document's flow list. Everything else goes into
/// the first slot of the parent that accepts the node's kind: a typed slot
/// declared for that kind (a singular one only while empty), else `steps`.
/// `position` indexes into a repeated slot or the flow list; `None` appends.
///
/// A node whose subtree reuses an identity already present in `document` is
/// refused.
pub fn insert(
    document: &Document,
    node: StepNode,
    parent_id: Option<&str>,
    position: Option<usize>,
) -> Document {
    let existing: HashSet<&str> = all_identities(document).into_iter().collect();
    if let Some(duplicate) = node.identities().into_iter().find(|id| existing.contains(id)) {
        tracing::warn!(node = %node.id, duplicate = %duplicate, "Refusing insert that would duplicate an identity");
        return document.clone();
    }

    let node_id = node.id.clone();
    match try_insert(document, node, parent_id, position) {
        Some(updated) => updated,
        None => {
            tracing::debug!(node = %node_id, parent = ?parent_id, "No insertion point, document unchanged");
            document.clone()
        }
    }
}

fn try_insert(
    document: &Document,
    node: StepNode,
    parent_id: Option<&str>,
    position: Option<usize>,
) -> Option<Document> {
    if node.kind.is_flow() {
        match parent_id {
            None => return Some(insert_flow(document, node, position)),
            Some(parent_id) => {
                let parent = find_by_identity(document, parent_id);
                let top_level = parent.is_found() && parent.parent_id.is_none();
                let has_open_slot = parent.node.is_some_and(|p| {
                    p.slots.iter().any(|s| {
                        s.target.accepts(node.kind) && (s.value.is_multiple() || s.value.is_empty())
                    })
                });
                if top_level && !has_open_slot {
                    return Some(insert_flow(document, node, position));
                }
            }
        }
    }
    insert_under(document, node, parent_id?, Placement::Auto, position)
}

fn insert_flow(document: &Document, node: StepNode, position: Option<usize>) -> Document {
    let mut flows = document.flows.clone();
    let at = position.map_or(flows.len(), |p| p.min(flows.len()));
    flows.insert(at, node);
    Document::new(flows)
}

/// Rebuild every flow, placing `node` under the first node with `parent_id`
/// that accepts it. `None` when nothing did.
fn insert_under(
    document: &Document,
    node: StepNode,
    parent_id: &str,
    placement: Placement<'_>,
    position: Option<usize>,
) -> Option<Document> {
    let mut pending = Some(node);
    let flows = document
        .flows
        .iter()
        .map(|flow| insert_into(flow, parent_id, &mut pending, placement, position))
        .collect();
    pending.is_none().then(|| Document::new(flows))
}

fn insert_into(
    node: &StepNode,
    parent_id: &str,
    pending: &mut Option<StepNode>,
    placement: Placement<'_>,
    position: Option<usize>,
) -> StepNode {
    if node.id == parent_id {
        if let Some(updated) = place_child(node, pending, placement, position) {
            return updated;
        }
    }
    node.rebuild_with(|slot| match &slot.value {
        SlotValue::Single(child) => SlotValue::Single(
            child
                .as_ref()
                .map(|c| Box::new(insert_into(c, parent_id, pending, placement, position))),
        ),
        SlotValue::Many(items) => SlotValue::Many(
            items
                .iter()
                .map(|c| insert_into(c, parent_id, pending, placement, position))
                .collect(),
        ),
    })
}

/// Put the pending node into one of `parent`'s slots, consuming it.
fn place_child(
    parent: &StepNode,
    pending: &mut Option<StepNode>,
    placement: Placement<'_>,
    position: Option<usize>,
) -> Option<StepNode> {
    let kind = pending.as_ref()?.kind;
    let open = |value: &SlotValue| value.is_multiple() || value.is_empty();

    let index = match placement {
        Placement::Auto => parent
            .slots
            .iter()
            .position(|s| !s.is_steps() && s.target.kind() == Some(kind) && open(&s.value))
            .or_else(|| {
                parent
                    .slots
                    .iter()
                    .position(|s| s.is_steps() && s.target.accepts(kind))
            }),
        Placement::Slot(name) => parent
            .slots
            .iter()
            .position(|s| s.name == name && s.target.accepts(kind) && open(&s.value)),
    }?;

    let child = pending.take()?;
    let mut updated = parent.clone();
    match &mut updated.slots[index].value {
        SlotValue::Single(value) => *value = Some(Box::new(child)),
        SlotValue::Many(items) => {
            let at = position.map_or(items.len(), |p| p.min(items.len()));
            items.insert(at, child);
        }
    }
    Some(updated)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Remove every node with identity `id`, top-level flows included.
pub fn delete(document: &Document, id: &str) -> Document {
    if count_duplicate_identities(document, id) == 0 {
        tracing::debug!(node = %id, "Delete of unknown identity, document unchanged");
        return document.clone();
    }
    Document::new(
        document
            .flows
            .iter()
            .filter(|flow| flow.id != id)
            .map(|flow| remove_from(flow, id))
            .collect(),
    )
}

fn remove_from(node: &StepNode, id: &str) -> StepNode {
    node.rebuild_with(|slot| match &slot.value {
        SlotValue::Single(child) => SlotValue::Single(
            child
                .as_ref()
                .filter(|c| c.id != id)
                .map(|c| Box::new(remove_from(c, id))),
        ),
        SlotValue::Many(items) => SlotValue::Many(
            items
                .iter()
                .filter(|c| c.id != id)
                .map(|c| remove_from(c, id))
                .collect(),
        ),
    })
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Move the node `source_id` next to or into `target_id`.
///
/// With `as_child` the source is inserted under the target. Otherwise it
/// becomes a sibling, taking the target's index in the target's slot. A `when`
/// or `otherwise` target always receives a non-branch source as a child.
pub fn move_node(
    document: &Document,
    source_id: &str,
    target_id: &str,
    as_child: bool,
) -> Document {
    if source_id == target_id {
        tracing::debug!(node = %source_id, "Move onto itself, document unchanged");
        return document.clone();
    }
    let source = find_node(document, source_id);
    let target = find_by_identity(document, target_id);
    let (Some(source), Some(target_node)) = (source, target.node) else {
        tracing::debug!(source = %source_id, target = %target_id, "Move with unknown identity, document unchanged");
        return document.clone();
    };
    if is_descendant(document, source_id, target_id) {
        tracing::debug!(source = %source_id, target = %target_id, "Move into own subtree rejected");
        return document.clone();
    }

    let moving = source.clone();
    let into_target = as_child
        || (target_node.kind.is_conditional_branch() && !moving.kind.is_conditional_branch());

    let pruned = delete(document, source_id);
    let moved = if into_target {
        try_insert(&pruned, moving, Some(target_id), None)
    } else {
        insert_sibling(&pruned, moving, &target)
    };

    moved.unwrap_or_else(|| {
        tracing::debug!(source = %source_id, target = %target_id, "Target cannot hold the moved node, document unchanged");
        document.clone()
    })
}

fn insert_sibling(
    document: &Document,
    node: StepNode,
    target: &ElementLookupResult<'_>,
) -> Option<Document> {
    match (target.parent_id, target.slot) {
        (None, _) => node
            .kind
            .is_flow()
            .then(|| insert_flow(document, node, target.position)),
        (Some(parent_id), Some(slot)) => {
            insert_under(document, node, parent_id, Placement::Slot(slot), target.position)
        }
        (Some(_), None) => None,
    }
}

// ---------------------------------------------------------------------------
// Replace
// ---------------------------------------------------------------------------

/// Substitute `replacement` for the node `id` inside the first top-level flow
/// that holds it. Used for in-place updates, where `replacement` carries the
/// same identity.
///
/// A replacement that would give an identity to more nodes than before, when
/// that leaves it on more than one node, is refused.
pub fn replace(document: &Document, id: &str, replacement: &StepNode) -> Document {
    let Some(index) = document
        .flows
        .iter()
        .position(|flow| flow.id == id || flow.identities().contains(&id))
    else {
        tracing::debug!(node = %id, "Replace of unknown identity, document unchanged");
        return document.clone();
    };
    if !placement_accepts(document, id, replacement) {
        tracing::warn!(node = %id, kind = %replacement.kind, "Replacement kind does not fit the node's slot");
        return document.clone();
    }

    let mut flows = document.flows.clone();
    flows[index] = replace_in_node(&document.flows[index], id, replacement);
    refuse_new_duplicates(document, Document::new(flows), id)
}

/// Substitute `replacement` for every node `id` in the whole document.
///
/// Refused on the same terms as [`replace`].
pub fn update_all_occurrences(document: &Document, id: &str, replacement: &StepNode) -> Document {
    if count_duplicate_identities(document, id) == 0 {
        tracing::debug!(node = %id, "Update of unknown identity, document unchanged");
        return document.clone();
    }
    if !placement_accepts(document, id, replacement) {
        tracing::warn!(node = %id, kind = %replacement.kind, "Replacement kind does not fit the node's slot");
        return document.clone();
    }
    let updated = Document::new(
        document
            .flows
            .iter()
            .map(|flow| replace_in_node(flow, id, replacement))
            .collect(),
    );
    refuse_new_duplicates(document, updated, id)
}

/// `updated`, unless it shares an identity across more nodes than `original`
/// did; then `original` again.
fn refuse_new_duplicates(original: &Document, updated: Document, id: &str) -> Document {
    let before = identity_counts(original);
    let duplicate = identity_counts(&updated)
        .into_iter()
        .find(|(identity, count)| *count > 1 && *count > before.get(identity).copied().unwrap_or(0))
        .map(|(identity, _)| identity.to_string());
    match duplicate {
        Some(duplicate) => {
            tracing::warn!(node = %id, duplicate = %duplicate, "Refusing replacement that would duplicate an identity");
            original.clone()
        }
        None => updated,
    }
}

fn identity_counts(document: &Document) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for identity in all_identities(document) {
        *counts.entry(identity).or_default() += 1;
    }
    counts
}

/// Substitute `replacement` for every node `id` within one subtree.
pub fn replace_in_node(node: &StepNode, id: &str, replacement: &StepNode) -> StepNode {
    if node.id == id {
        return replacement.clone();
    }
    node.rebuild_with(|slot| match &slot.value {
        SlotValue::Single(child) => SlotValue::Single(
            child
                .as_ref()
                .map(|c| Box::new(replace_in_node(c, id, replacement))),
        ),
        SlotValue::Many(items) => SlotValue::Many(
            items
                .iter()
                .map(|c| replace_in_node(c, id, replacement))
                .collect(),
        ),
    })
}

/// Whether `replacement` may sit where the first node `id` sits.
fn placement_accepts(document: &Document, id: &str, replacement: &StepNode) -> bool {
    let found = find_by_identity(document, id);
    let (Some(parent_id), Some(slot)) = (found.parent_id, found.slot) else {
        return replacement.kind.is_flow();
    };
    find_node(document, parent_id)
        .and_then(|parent| parent.slot(slot))
        .is_some_and(|s| s.target.accepts(replacement.kind))
}

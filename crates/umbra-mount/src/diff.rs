#![forbid(unsafe_code)]

//! Change detection between two tree revisions, by family identity.
//!
//! The differ never compares content structurally. Two sibling lists that
//! are the same `Arc` are unchanged by construction (copy-on-write cloning
//! guarantees an untouched subtree keeps its handles), and two nodes with
//! the same tag are the same logical element regardless of how their
//! content diverged.
//!
//! # Emission rules
//!
//! Per sibling list, in this order:
//!
//! 1. A [`Mutation::Delete`] for every family present in old but not new —
//!    one per subtree root; the platform tears the subtree down with it.
//! 2. In new-list order: a [`Mutation::Move`] when a surviving family
//!    changed position, a [`Mutation::Update`] when its payload changed
//!    (recursing into children either way), and a [`Mutation::Insert`] for
//!    every new family, followed by inserts for its entire subtree.
//!
//! Deletes preceding inserts is the load-bearing guarantee: the mounting
//! layer must never see two views claiming the same slot. The root node
//! itself is not a mounted view and is never the subject of an update.

use std::sync::Arc;

use ahash::AHashMap;
use umbra_core::{RootShadowNode, SharedChildren, SharedShadowNode, Tag};

use crate::mutation::{Mutation, MutationList};

/// Diff two root revisions into an ordered mutation list.
pub fn compute_mutations(old_root: &RootShadowNode, new_root: &RootShadowNode) -> MutationList {
    let mut out = MutationList::new();
    diff_children(
        new_root.tag(),
        old_root.children(),
        new_root.children(),
        &mut out,
    );
    #[cfg(feature = "tracing")]
    tracing::trace!(mutations = out.len(), "diff complete");
    out
}

fn diff_children(
    parent: Tag,
    old: &SharedChildren,
    new: &SharedChildren,
    out: &mut MutationList,
) {
    // Untouched subtree: copy-on-write cloning preserved the handle.
    if Arc::ptr_eq(old, new) {
        return;
    }

    let mut old_index: AHashMap<Tag, usize> = AHashMap::with_capacity(old.len());
    for (i, child) in old.iter().enumerate() {
        let previous = old_index.insert(child.tag(), i);
        debug_assert!(
            previous.is_none(),
            "duplicate tag {} in sibling list",
            child.tag()
        );
    }
    let mut survives = vec![false; old.len()];
    for child in new.iter() {
        if let Some(&i) = old_index.get(&child.tag()) {
            survives[i] = true;
        }
    }

    // Deletes first, at their old positions.
    for (i, child) in old.iter().enumerate() {
        if !survives[i] {
            out.push(Mutation::Delete {
                parent,
                child: Arc::clone(child),
                index: i,
            });
        }
    }

    for (j, new_child) in new.iter().enumerate() {
        match old_index.get(&new_child.tag()) {
            Some(&i) => {
                let old_child = &old[i];
                debug_assert!(
                    Arc::ptr_eq(old_child.family(), new_child.family()),
                    "tag {} maps to two families",
                    new_child.tag()
                );
                if i != j {
                    out.push(Mutation::Move {
                        parent,
                        child: Arc::clone(new_child),
                        from: i,
                        to: j,
                    });
                }
                if !Arc::ptr_eq(old_child, new_child) {
                    if payload_changed(old_child, new_child) {
                        out.push(Mutation::Update {
                            old: Arc::clone(old_child),
                            new: Arc::clone(new_child),
                        });
                    }
                    diff_children(
                        new_child.tag(),
                        old_child.children(),
                        new_child.children(),
                        out,
                    );
                }
            }
            None => insert_subtree(parent, new_child, j, out),
        }
    }
}

/// The whole subtree is new: inserts only, no further diffing.
fn insert_subtree(parent: Tag, node: &SharedShadowNode, index: usize, out: &mut MutationList) {
    out.push(Mutation::Insert {
        parent,
        child: Arc::clone(node),
        index,
    });
    for (k, child) in node.children().iter().enumerate() {
        insert_subtree(node.tag(), child, k, out);
    }
}

/// Whether the element's mounted payload changed between revisions.
///
/// An ancestor cloned only to re-point a child list keeps its props and
/// state handles; the platform has nothing to apply for it.
fn payload_changed(old: &SharedShadowNode, new: &SharedShadowNode) -> bool {
    if !Arc::ptr_eq(old.props(), new.props()) {
        return true;
    }
    match (old.state(), new.state()) {
        (None, None) => false,
        (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
        _ => true,
    }
}

#![forbid(unsafe_code)]

//! Mutation instructions for the platform mounting layer.
//!
//! A mutation references the shadow nodes it concerns; the platform reads
//! tags, component names, and props off them to drive its own view
//! objects. Indices are positions in the parent's old (for deletes) or new
//! (for inserts/moves) sibling list.

use smallvec::SmallVec;
use umbra_core::{SharedShadowNode, Tag};

/// The ordered mutation sequence produced by one diff.
pub type MutationList = SmallVec<[Mutation; 8]>;

/// One mounting instruction.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Mount a new child (and, in subsequent mutations, its subtree) under
    /// `parent` at `index` in the new sibling list.
    Insert {
        /// Tag of the parent node.
        parent: Tag,
        /// The newly mounted node.
        child: SharedShadowNode,
        /// Position in the new sibling list.
        index: usize,
    },
    /// Unmount `child` (with its whole subtree) from `parent`.
    Delete {
        /// Tag of the parent node.
        parent: Tag,
        /// The node leaving the tree.
        child: SharedShadowNode,
        /// Position in the old sibling list.
        index: usize,
    },
    /// The same element changed payload: apply `new`'s props/state to the
    /// already-mounted view.
    Update {
        /// The previously mounted revision.
        old: SharedShadowNode,
        /// The revision to mount.
        new: SharedShadowNode,
    },
    /// The same element changed sibling position; reuse the mounted view.
    Move {
        /// Tag of the parent node.
        parent: Tag,
        /// The node that moved.
        child: SharedShadowNode,
        /// Position in the old sibling list.
        from: usize,
        /// Position in the new sibling list.
        to: usize,
    },
}

impl Mutation {
    /// Short kind name for logs and diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
            Self::Move { .. } => "move",
        }
    }

    /// Tag of the affected element.
    pub fn tag(&self) -> Tag {
        match self {
            Self::Insert { child, .. } | Self::Delete { child, .. } | Self::Move { child, .. } => {
                child.tag()
            }
            Self::Update { new, .. } => new.tag(),
        }
    }

    /// Tag of the parent sibling list this mutation applies to, if it is a
    /// sibling-list operation.
    pub fn parent(&self) -> Option<Tag> {
        match self {
            Self::Insert { parent, .. }
            | Self::Delete { parent, .. }
            | Self::Move { parent, .. } => Some(*parent),
            Self::Update { .. } => None,
        }
    }
}

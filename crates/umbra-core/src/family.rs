#![forbid(unsafe_code)]

//! Stable identity for a node across its cloned revisions.
//!
//! A [`ShadowNodeFamily`] outlives every individual [`ShadowNode`] revision
//! of the element it identifies. It carries two back references — the most
//! recently shared node revision, and the family of the parent that last
//! adopted it. Both are weak: ownership flows strictly root → children →
//! family, and the lookups here must never keep a retired revision alive.
//!
//! The weak pointers live in [`arc_swap::ArcSwapWeak`] stores so readers on
//! the diff/commit paths never take a lock.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapWeak;

use crate::ids::{SurfaceId, Tag};
use crate::node::ShadowNode;

/// Identity of one logical UI element for the lifetime of that element.
///
/// Exactly one family exists per logical element; every cloned revision of
/// the element's node shares the same `Arc<ShadowNodeFamily>`.
pub struct ShadowNodeFamily {
    tag: Tag,
    surface_id: SurfaceId,
    component_name: &'static str,
    /// Most recently shared node revision. Lookup only, never ownership.
    latest: ArcSwapWeak<ShadowNode>,
    /// Family of the parent node that last adopted this one.
    parent: ArcSwapWeak<ShadowNodeFamily>,
}

impl ShadowNodeFamily {
    /// Create a family for a new logical element.
    pub fn new(tag: Tag, surface_id: SurfaceId, component_name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            tag,
            surface_id,
            component_name,
            latest: ArcSwapWeak::new(Weak::new()),
            parent: ArcSwapWeak::new(Weak::new()),
        })
    }

    /// The element's tag, unique within its surface.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The surface this element belongs to.
    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The component type identifier.
    #[inline]
    pub fn component_name(&self) -> &'static str {
        self.component_name
    }

    /// The most recently shared node revision for this family, if any
    /// revision is still alive.
    ///
    /// Lets callers resolve "the current node for this element" without
    /// walking a tree from the root.
    pub fn latest_node(&self) -> Option<Arc<ShadowNode>> {
        self.latest.load().upgrade()
    }

    /// The family of the parent that last adopted a node of this family.
    ///
    /// `None` for roots and for families whose parent revisions have all
    /// been dropped.
    pub fn parent(&self) -> Option<Arc<ShadowNodeFamily>> {
        self.parent.load().upgrade()
    }

    /// The chain of families from just below `root` down to `self`,
    /// resolved through parent back references.
    ///
    /// Returns `None` when `self` is not (or no longer) reachable from
    /// `root` in the latest revision. The chain reflects the most recent
    /// adoption of each family; it is only meaningful against the newest
    /// tree revision.
    pub fn ancestor_chain(
        self: &Arc<Self>,
        root: &Arc<ShadowNodeFamily>,
    ) -> Option<Vec<Arc<ShadowNodeFamily>>> {
        let mut chain = vec![Arc::clone(self)];
        let mut cursor = Arc::clone(self);
        loop {
            let parent = cursor.parent()?;
            if Arc::ptr_eq(&parent, root) {
                break;
            }
            cursor = Arc::clone(&parent);
            chain.push(parent);
        }
        chain.reverse();
        Some(chain)
    }

    pub(crate) fn set_latest(&self, node: &Arc<ShadowNode>) {
        self.latest.store(Arc::downgrade(node));
    }

    pub(crate) fn set_parent(&self, parent: &Arc<ShadowNodeFamily>) {
        self.parent.store(Arc::downgrade(parent));
    }
}

impl std::fmt::Debug for ShadowNodeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowNodeFamily")
            .field("tag", &self.tag)
            .field("surface_id", &self.surface_id)
            .field("component_name", &self.component_name)
            .finish_non_exhaustive()
    }
}

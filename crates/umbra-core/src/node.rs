#![forbid(unsafe_code)]

//! Immutable, versioned shadow nodes with copy-on-write cloning.
//!
//! A [`ShadowNode`] is one revision of one element in a surface's tree. It
//! is built unsealed, mutated in place by exactly one owner, then shared
//! via [`ShadowNode::into_shared`] and sealed by the commit that publishes
//! it. After sealing, any in-place mutation is a programming error — the
//! only way to change a sealed subtree is to clone new revisions along the
//! path to the change and share everything else.
//!
//! # Sealing discipline
//!
//! - Cloning is always permitted, sealed or not.
//! - In-place mutators trap on sealed nodes with a debug assertion: a
//!   sealed mutation means the immutability contract was already broken
//!   upstream, and continuing would corrupt committed revisions.
//! - [`ShadowNode::seal_subtree`] stops at already-sealed nodes: commits
//!   seal top-down, so a sealed node's descendants are sealed too.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::family::ShadowNodeFamily;
use crate::ids::Tag;
use crate::props::{RawProps, SharedProps};

/// A shared handle to one node revision.
pub type SharedShadowNode = Arc<ShadowNode>;

/// A shared, immutable child list.
pub type SharedChildren = Arc<Vec<SharedShadowNode>>;

/// Opaque per-node local state. Compared by handle identity, never by value.
pub type SharedState = Arc<dyn Any + Send + Sync>;

/// The inputs for creating or cloning a node.
///
/// Absent fields keep the source node's values (or the empty defaults when
/// creating a fresh node).
#[derive(Clone, Default)]
pub struct ShadowNodeFragment {
    /// Replacement props, wholesale.
    pub props: Option<SharedProps>,
    /// Replacement child list, wholesale.
    pub children: Option<SharedChildren>,
    /// Replacement local state.
    pub state: Option<SharedState>,
}

impl ShadowNodeFragment {
    /// A fragment that only replaces props.
    pub fn with_props(props: SharedProps) -> Self {
        Self {
            props: Some(props),
            ..Self::default()
        }
    }

    /// A fragment that only replaces the child list.
    pub fn with_children(children: SharedChildren) -> Self {
        Self {
            children: Some(children),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ShadowNodeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNodeFragment")
            .field("props", &self.props.is_some())
            .field("children", &self.children.as_ref().map(|c| c.len()))
            .field("state", &self.state.is_some())
            .finish()
    }
}

/// One immutable revision of one element in the shadow tree.
pub struct ShadowNode {
    family: Arc<ShadowNodeFamily>,
    props: SharedProps,
    children: SharedChildren,
    state: Option<SharedState>,
    revision: u64,
    sealed: AtomicBool,
}

impl ShadowNode {
    /// Create the first revision for a family. The node starts unsealed.
    pub fn new(family: Arc<ShadowNodeFamily>, fragment: ShadowNodeFragment) -> Self {
        let node = Self {
            props: fragment.props.unwrap_or_else(RawProps::empty),
            children: fragment.children.unwrap_or_default(),
            state: fragment.state,
            revision: 1,
            sealed: AtomicBool::new(false),
            family,
        };
        node.adopt_children();
        node
    }

    /// Clone a new, unsealed revision sharing this node's family.
    ///
    /// Always permitted — only in-place mutation is forbidden after
    /// sealing. Fields absent from the fragment keep this node's values.
    pub fn clone_with(&self, fragment: ShadowNodeFragment) -> Self {
        let adopt = fragment.children.is_some();
        let node = Self {
            family: Arc::clone(&self.family),
            props: fragment.props.unwrap_or_else(|| Arc::clone(&self.props)),
            children: fragment.children.unwrap_or_else(|| Arc::clone(&self.children)),
            state: fragment.state.or_else(|| self.state.clone()),
            revision: self.revision + 1,
            sealed: AtomicBool::new(false),
        };
        if adopt {
            node.adopt_children();
        }
        node
    }

    /// Share this node and register it as its family's latest revision.
    pub fn into_shared(self) -> SharedShadowNode {
        let shared = Arc::new(self);
        shared.family.set_latest(&shared);
        shared
    }

    /// The family this node is a revision of.
    #[inline]
    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.family
    }

    /// The element's tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.family.tag()
    }

    /// The component type identifier.
    #[inline]
    pub fn component_name(&self) -> &'static str {
        self.family.component_name()
    }

    /// The immutable prop payload.
    #[inline]
    pub fn props(&self) -> &SharedProps {
        &self.props
    }

    /// The immutable child list.
    #[inline]
    pub fn children(&self) -> &SharedChildren {
        &self.children
    }

    /// The opaque local state, if any.
    #[inline]
    pub fn state(&self) -> Option<&SharedState> {
        self.state.as_ref()
    }

    /// This revision's number within its family's clone chain.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether in-place mutation is still permitted.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Forbid further in-place mutation. Idempotent.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Seal this node and every unsealed descendant.
    ///
    /// Stops recursing at sealed nodes: commits seal top-down, so a sealed
    /// node's subtree is already sealed.
    pub fn seal_subtree(&self) {
        if self.is_sealed() {
            return;
        }
        self.seal();
        for child in self.children.iter() {
            child.seal_subtree();
        }
    }

    /// Replace the prop payload in place. Unsealed nodes only.
    pub fn set_props(&mut self, props: SharedProps) {
        self.ensure_unsealed();
        self.props = props;
    }

    /// Replace the local state in place. Unsealed nodes only.
    pub fn set_state(&mut self, state: SharedState) {
        self.ensure_unsealed();
        self.state = Some(state);
    }

    /// Append a child in place. Unsealed nodes only.
    pub fn append_child(&mut self, child: SharedShadowNode) {
        self.ensure_unsealed();
        child.family().set_parent(&self.family);
        Arc::make_mut(&mut self.children).push(child);
    }

    /// Replace the child at `index` in place. Unsealed nodes only.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn replace_child_at(&mut self, index: usize, child: SharedShadowNode) {
        self.ensure_unsealed();
        child.family().set_parent(&self.family);
        Arc::make_mut(&mut self.children)[index] = child;
    }

    fn adopt_children(&self) {
        for child in self.children.iter() {
            child.family().set_parent(&self.family);
        }
    }

    fn ensure_unsealed(&self) {
        debug_assert!(
            !self.is_sealed(),
            "in-place mutation of sealed shadow node (tag {})",
            self.tag()
        );
    }
}

impl fmt::Debug for ShadowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNode")
            .field("tag", &self.tag())
            .field("component_name", &self.component_name())
            .field("revision", &self.revision)
            .field("children", &self.children.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

/// Clone the path from `root` down to `family`'s node, applying `f` to
/// produce the new target revision.
///
/// Every node off the path is shared with the source tree. Returns `None`
/// when the family is not reachable from `root` in the latest revision —
/// a transform working from a stale base observes that as "element gone"
/// and must re-resolve, not guess.
pub fn clone_tree(
    root: &SharedShadowNode,
    family: &Arc<ShadowNodeFamily>,
    f: impl FnOnce(&ShadowNode) -> ShadowNode,
) -> Option<SharedShadowNode> {
    if Arc::ptr_eq(family, root.family()) {
        return Some(f(root).into_shared());
    }

    let chain = family.ancestor_chain(root.family())?;

    // Descend from the root, recording (node, child index) at each level.
    let mut path: Vec<(SharedShadowNode, usize)> = Vec::with_capacity(chain.len());
    let mut cursor = Arc::clone(root);
    for step in &chain {
        let index = cursor
            .children()
            .iter()
            .position(|child| Arc::ptr_eq(child.family(), step))?;
        let next = Arc::clone(&cursor.children()[index]);
        path.push((cursor, index));
        cursor = next;
    }

    // Rebuild bottom-up: new target first, then one cloned ancestor per
    // level with the single changed child slot.
    let mut replacement = f(&cursor).into_shared();
    for (node, index) in path.into_iter().rev() {
        let mut children = node.children().as_ref().clone();
        children[index] = replacement;
        replacement = node
            .clone_with(ShadowNodeFragment::with_children(Arc::new(children)))
            .into_shared();
    }
    Some(replacement)
}

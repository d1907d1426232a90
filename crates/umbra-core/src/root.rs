#![forbid(unsafe_code)]

//! The root of one surface's shadow tree, plus the layout seam.
//!
//! A [`RootShadowNode`] wraps the root [`ShadowNode`] together with the
//! surface's [`LayoutConstraints`] and [`LayoutContext`]. Layout itself is
//! a black box behind [`LayoutEngine`] — potentially expensive, always
//! synchronous, pure with respect to anything outside the given root. This
//! crate only tracks whether a revision's layout is clean so repeated
//! passes are no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::family::ShadowNodeFamily;
use crate::geometry::{Point, Size};
use crate::ids::{SurfaceId, Tag};
use crate::node::{SharedChildren, SharedShadowNode, ShadowNode, ShadowNodeFragment, clone_tree};

/// A shared handle to one root revision.
pub type SharedRootShadowNode = Arc<RootShadowNode>;

/// The component name carried by every root family.
pub const ROOT_COMPONENT_NAME: &str = "RootView";

/// Sizing constraints for a surface's layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConstraints {
    /// Smallest acceptable size.
    pub minimum: Size,
    /// Largest acceptable size.
    pub maximum: Size,
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        Self {
            minimum: Size::ZERO,
            maximum: Size::new(f32::INFINITY, f32::INFINITY),
        }
    }
}

impl LayoutConstraints {
    /// Exact constraints: minimum == maximum == `size`.
    pub const fn tight(size: Size) -> Self {
        Self {
            minimum: size,
            maximum: size,
        }
    }
}

/// Ambient layout inputs that are not sizing constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    /// Offset of the viewport within the surface.
    pub viewport_offset: Point,
    /// Density of the output (device pixels per point).
    pub point_scale_factor: f32,
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self {
            viewport_offset: Point::ZERO,
            point_scale_factor: 1.0,
        }
    }
}

/// Failure from the layout engine.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The engine could not produce a laid-out tree.
    #[error("layout engine failed: {reason}")]
    Engine {
        /// Engine-reported description.
        reason: String,
    },
}

impl LayoutError {
    /// Construct an engine failure.
    pub fn engine(reason: impl Into<String>) -> Self {
        Self::Engine {
            reason: reason.into(),
        }
    }
}

/// The black-box layout capability invoked during commit.
///
/// An engine receives a layout-dirty root and returns a new root revision
/// with layout applied. It must not touch anything outside the given root.
pub trait LayoutEngine: Send + Sync {
    /// Produce a laid-out revision of `root`.
    fn layout(&self, root: &RootShadowNode) -> Result<SharedRootShadowNode, LayoutError>;
}

/// An engine that performs no layout. For tests and headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLayoutEngine;

impl LayoutEngine for NoopLayoutEngine {
    fn layout(&self, root: &RootShadowNode) -> Result<SharedRootShadowNode, LayoutError> {
        Ok(Arc::new(root.clone_with(ShadowNodeFragment::default())))
    }
}

/// The root of one surface's tree revision.
#[derive(Debug)]
pub struct RootShadowNode {
    node: SharedShadowNode,
    constraints: LayoutConstraints,
    context: LayoutContext,
    layout_clean: AtomicBool,
}

impl RootShadowNode {
    /// Create an empty root for a surface. Starts layout-dirty.
    pub fn new(surface_id: SurfaceId, constraints: LayoutConstraints, context: LayoutContext) -> Self {
        let family = ShadowNodeFamily::new(Tag::root_of(surface_id), surface_id, ROOT_COMPONENT_NAME);
        Self {
            node: ShadowNode::new(family, ShadowNodeFragment::default()).into_shared(),
            constraints,
            context,
            layout_clean: AtomicBool::new(false),
        }
    }

    /// The underlying root node.
    #[inline]
    pub fn node(&self) -> &SharedShadowNode {
        &self.node
    }

    /// The root node's child list.
    #[inline]
    pub fn children(&self) -> &SharedChildren {
        self.node.children()
    }

    /// The root family's tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.node.tag()
    }

    /// The surface this root belongs to.
    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.node.family().surface_id()
    }

    /// Current layout constraints.
    #[inline]
    pub fn constraints(&self) -> LayoutConstraints {
        self.constraints
    }

    /// Current layout context.
    #[inline]
    pub fn context(&self) -> LayoutContext {
        self.context
    }

    /// Clone a new root revision with a changed root node. Layout-dirty.
    pub fn clone_with(&self, fragment: ShadowNodeFragment) -> Self {
        Self {
            node: self.node.clone_with(fragment).into_shared(),
            constraints: self.constraints,
            context: self.context,
            layout_clean: AtomicBool::new(false),
        }
    }

    /// Clone a new root revision with changed constraints. Layout-dirty.
    pub fn clone_with_constraints(
        &self,
        constraints: LayoutConstraints,
        context: LayoutContext,
    ) -> Self {
        Self {
            node: self.node.clone_with(ShadowNodeFragment::default()).into_shared(),
            constraints,
            context,
            layout_clean: AtomicBool::new(false),
        }
    }

    /// Clone the path to `family`'s node, applying `f` to produce the new
    /// target revision. Everything off the path is shared. Layout-dirty.
    ///
    /// Returns `None` when the family is not reachable from this root.
    pub fn clone_tree(
        &self,
        family: &Arc<ShadowNodeFamily>,
        f: impl FnOnce(&ShadowNode) -> ShadowNode,
    ) -> Option<Self> {
        let node = clone_tree(&self.node, family, f)?;
        Some(Self {
            node,
            constraints: self.constraints,
            context: self.context,
            layout_clean: AtomicBool::new(false),
        })
    }

    /// Whether this revision's layout is up to date.
    #[inline]
    pub fn is_layout_clean(&self) -> bool {
        self.layout_clean.load(Ordering::Acquire)
    }

    /// Run the engine if this revision is layout-dirty.
    ///
    /// Idempotent: a clean root returns `Ok(None)` without invoking the
    /// engine. On success the returned revision is marked clean.
    pub fn layout_if_needed(
        &self,
        engine: &dyn LayoutEngine,
    ) -> Result<Option<SharedRootShadowNode>, LayoutError> {
        if self.is_layout_clean() {
            return Ok(None);
        }
        let laid_out = engine.layout(self)?;
        laid_out.layout_clean.store(true, Ordering::Release);
        Ok(Some(laid_out))
    }

    /// Seal this revision's whole subtree.
    pub fn seal_subtree(&self) {
        self.node.seal_subtree();
    }
}

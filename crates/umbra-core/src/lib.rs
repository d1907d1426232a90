#![forbid(unsafe_code)]

//! Shadow-node tree model.
//!
//! # Role in umbra
//! `umbra-core` defines the immutable, versioned component tree that one
//! surface renders from: [`ShadowNode`], its stable identity
//! [`ShadowNodeFamily`], and the [`RootShadowNode`] that carries layout
//! constraints for a whole surface.
//!
//! # Primary responsibilities
//! - **Node/Family**: copy-on-write cloning, sealing, and family-indexed
//!   lookup of the latest revision of any logical element.
//! - **Props**: a closed [`PropValue`] sum type with typed accessors,
//!   validated at the accessor seam instead of stringly-typed lookup.
//! - **Layout seam**: [`LayoutEngine`] is the black-box layout capability
//!   invoked during commit; this crate only tracks layout cleanliness.
//! - **Descriptors**: the factory seam that turns a component name plus a
//!   [`ShadowNodeFragment`] into an initial node.
//!
//! # How it fits in the system
//! `umbra-mount` diffs two revisions of this tree into mutation lists;
//! `umbra-runtime` owns the commit lifecycle that produces those revisions.
//! This crate knows nothing about either — ownership flows strictly from a
//! root down through children, and every back reference is weak.

pub mod descriptor;
pub mod family;
pub mod geometry;
pub mod ids;
pub mod node;
pub mod props;
pub mod root;

pub use descriptor::{
    ComponentDescriptor, ComponentDescriptorRegistry, DescriptorError, ViewComponentDescriptor,
};
pub use family::ShadowNodeFamily;
pub use geometry::{Point, Rect, Size};
pub use ids::{SurfaceId, Tag};
pub use node::{
    SharedChildren, SharedShadowNode, SharedState, ShadowNode, ShadowNodeFragment, clone_tree,
};
pub use props::{PropValue, PropsError, RawProps, SharedProps};
pub use root::{
    LayoutConstraints, LayoutContext, LayoutEngine, LayoutError, NoopLayoutEngine, RootShadowNode,
    SharedRootShadowNode,
};

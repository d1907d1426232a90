#![forbid(unsafe_code)]

//! Component descriptors: the node-creation factory seam.
//!
//! A [`ComponentDescriptor`] knows how to turn a [`ShadowNodeFragment`]
//! into the initial node for one component type. The registry is consulted
//! at node-creation time only — never during diffing, which works purely
//! on family identity.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use thiserror::Error;

use crate::family::ShadowNodeFamily;
use crate::ids::{SurfaceId, Tag};
use crate::node::{SharedShadowNode, ShadowNode, ShadowNodeFragment};

/// Errors from descriptor registration and lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// A descriptor with this component name already exists.
    #[error("component `{0}` is already registered")]
    AlreadyRegistered(&'static str),

    /// No descriptor is registered for this component name.
    #[error("component `{0}` is not registered")]
    Unknown(String),
}

/// Factory for one component type's shadow nodes.
pub trait ComponentDescriptor: Send + Sync {
    /// The component type identifier this descriptor produces.
    fn component_name(&self) -> &'static str;

    /// Create the initial node for a family from a fragment.
    fn create(
        &self,
        family: Arc<ShadowNodeFamily>,
        fragment: ShadowNodeFragment,
    ) -> SharedShadowNode;
}

/// The plain descriptor: a node with no component-specific behavior.
#[derive(Debug, Clone, Copy)]
pub struct ViewComponentDescriptor {
    name: &'static str,
}

impl ViewComponentDescriptor {
    /// Create a descriptor for `name`.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl ComponentDescriptor for ViewComponentDescriptor {
    fn component_name(&self) -> &'static str {
        self.name
    }

    fn create(
        &self,
        family: Arc<ShadowNodeFamily>,
        fragment: ShadowNodeFragment,
    ) -> SharedShadowNode {
        ShadowNode::new(family, fragment).into_shared()
    }
}

/// Registry of descriptors by component name.
#[derive(Default)]
pub struct ComponentDescriptorRegistry {
    descriptors: RwLock<AHashMap<&'static str, Arc<dyn ComponentDescriptor>>>,
}

impl ComponentDescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; at most one per component name.
    pub fn register(&self, descriptor: Arc<dyn ComponentDescriptor>) -> Result<(), DescriptorError> {
        let name = descriptor.component_name();
        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if descriptors.contains_key(name) {
            return Err(DescriptorError::AlreadyRegistered(name));
        }
        descriptors.insert(name, descriptor);
        Ok(())
    }

    /// Look up the descriptor for a component name.
    pub fn descriptor_for(&self, name: &str) -> Option<Arc<dyn ComponentDescriptor>> {
        self.descriptors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Create a fresh element: a new family plus its initial node.
    pub fn create_node(
        &self,
        name: &str,
        tag: Tag,
        surface_id: SurfaceId,
        fragment: ShadowNodeFragment,
    ) -> Result<SharedShadowNode, DescriptorError> {
        let descriptor = self
            .descriptor_for(name)
            .ok_or_else(|| DescriptorError::Unknown(name.to_owned()))?;
        let family = ShadowNodeFamily::new(tag, surface_id, descriptor.component_name());
        Ok(descriptor.create(family, fragment))
    }
}

impl std::fmt::Debug for ComponentDescriptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .descriptors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        f.debug_struct("ComponentDescriptorRegistry")
            .field("components", &names)
            .finish()
    }
}

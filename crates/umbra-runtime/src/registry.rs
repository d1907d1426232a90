#![forbid(unsafe_code)]

//! Concurrent map from surface id to shadow tree.
//!
//! A readers-writer lock guards the map: `add`/`remove` are exclusive,
//! `visit`/`enumerate` are shared and run concurrently with each other.
//! Callbacks run under the shared lock — they must not re-enter `add` or
//! `remove`, which would deadlock; keeping them re-entrancy-free is the
//! caller's responsibility.
//!
//! The registry is an explicit, constructed object handed to whoever
//! needs it (the [`Scheduler`](crate::Scheduler) takes one at
//! construction) — never a process-wide singleton, so tests get isolated
//! instances for free.

use std::ops::ControlFlow;
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use thiserror::Error;

use umbra_core::SurfaceId;

use crate::shadow_tree::ShadowTree;

/// Errors from registry mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A tree for this surface id is already registered.
    #[error("surface {0} is already registered")]
    SurfaceAlreadyRegistered(SurfaceId),
}

/// Concurrent surface-id → tree map guarding tree lifetime.
#[derive(Debug, Default)]
pub struct ShadowTreeRegistry {
    trees: RwLock<AHashMap<SurfaceId, Arc<ShadowTree>>>,
}

impl ShadowTreeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree under its surface id.
    pub fn add(&self, tree: Arc<ShadowTree>) -> Result<(), RegistryError> {
        let surface_id = tree.surface_id();
        let mut trees = self.trees.write().unwrap_or_else(|e| e.into_inner());
        if trees.contains_key(&surface_id) {
            return Err(RegistryError::SurfaceAlreadyRegistered(surface_id));
        }
        trees.insert(surface_id, tree);
        tracing::debug!(surface = %surface_id, "shadow tree registered");
        Ok(())
    }

    /// Unregister and return the tree for teardown, or `None` if absent.
    ///
    /// Does not block concurrent `visit`/`enumerate` on other surfaces
    /// beyond the lock hand-off itself.
    pub fn remove(&self, surface_id: SurfaceId) -> Option<Arc<ShadowTree>> {
        let removed = self
            .trees
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&surface_id);
        if removed.is_some() {
            tracing::debug!(surface = %surface_id, "shadow tree unregistered");
        }
        removed
    }

    /// Run `f` against the tree for `surface_id` under the shared lock.
    ///
    /// Returns `None` when the surface is not registered.
    pub fn visit<R>(&self, surface_id: SurfaceId, f: impl FnOnce(&ShadowTree) -> R) -> Option<R> {
        let trees = self.trees.read().unwrap_or_else(|e| e.into_inner());
        trees.get(&surface_id).map(|tree| f(tree))
    }

    /// Iterate all registered trees under the shared lock; the callback
    /// may stop early.
    pub fn enumerate(&self, mut f: impl FnMut(&ShadowTree) -> ControlFlow<()>) {
        let trees = self.trees.read().unwrap_or_else(|e| e.into_inner());
        for tree in trees.values() {
            if f(tree).is_break() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::{LayoutConstraints, LayoutContext};

    fn tree(surface: u32) -> Arc<ShadowTree> {
        Arc::new(ShadowTree::new(
            SurfaceId::new(surface),
            LayoutConstraints::default(),
            LayoutContext::default(),
        ))
    }

    #[test]
    fn add_then_visit_then_remove() {
        let registry = ShadowTreeRegistry::new();
        registry.add(tree(1)).expect("fresh id registers");

        let seen = registry.visit(SurfaceId::new(1), |t| t.surface_id());
        assert_eq!(seen, Some(SurfaceId::new(1)));

        let removed = registry.remove(SurfaceId::new(1)).expect("was registered");
        assert_eq!(removed.surface_id(), SurfaceId::new(1));
        assert!(registry.visit(SurfaceId::new(1), |_| ()).is_none());
    }

    #[test]
    fn double_add_is_a_precondition_failure() {
        let registry = ShadowTreeRegistry::new();
        registry.add(tree(1)).expect("fresh id registers");
        assert_eq!(
            registry.add(tree(1)).unwrap_err(),
            RegistryError::SurfaceAlreadyRegistered(SurfaceId::new(1))
        );
    }

    #[test]
    fn remove_of_missing_surface_is_none_not_an_error() {
        let registry = ShadowTreeRegistry::new();
        assert!(registry.remove(SurfaceId::new(42)).is_none());
    }

    #[test]
    fn enumerate_supports_early_stop() {
        let registry = ShadowTreeRegistry::new();
        for surface in 1..=3 {
            registry.add(tree(surface)).expect("fresh id registers");
        }

        let mut visited = 0;
        registry.enumerate(|_| {
            visited += 1;
            if visited == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(visited, 2);
    }
}

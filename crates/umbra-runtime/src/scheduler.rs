#![forbid(unsafe_code)]

//! The façade upper layers drive with "please recompute" requests.
//!
//! A [`Scheduler`] wires together the three seams it is constructed with:
//! the surface registry, the component-descriptor registry (node creation
//! only), and the layout engine (invoked inside commits). It adds no
//! policy of its own — coalescing rapid-fire requests before calling in
//! is the caller's business, because there is no mid-commit cancellation.

use std::sync::Arc;

use thiserror::Error;

use umbra_core::{
    ComponentDescriptorRegistry, LayoutConstraints, LayoutContext, LayoutEngine,
    SharedRootShadowNode, SurfaceId,
};
use umbra_mount::TelemetryController;

use crate::registry::{RegistryError, ShadowTreeRegistry};
use crate::shadow_tree::{CommitError, CommitOptions, CommitStatus, ShadowTree};

/// Errors surfaced by scheduler entry points.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No tree is registered for the surface.
    #[error("surface {0} is not registered")]
    SurfaceNotFound(SurfaceId),

    /// The commit itself failed.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Surface registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Entry point for everything above the shadow-tree pipeline.
pub struct Scheduler {
    registry: Arc<ShadowTreeRegistry>,
    descriptors: Arc<ComponentDescriptorRegistry>,
    layout_engine: Arc<dyn LayoutEngine>,
}

impl Scheduler {
    /// Build a scheduler over explicit, injected collaborators.
    pub fn new(
        registry: Arc<ShadowTreeRegistry>,
        descriptors: Arc<ComponentDescriptorRegistry>,
        layout_engine: Arc<dyn LayoutEngine>,
    ) -> Self {
        Self {
            registry,
            descriptors,
            layout_engine,
        }
    }

    /// The component-descriptor registry, for node creation.
    pub fn descriptors(&self) -> &Arc<ComponentDescriptorRegistry> {
        &self.descriptors
    }

    /// Create and register an empty tree for a new surface.
    pub fn start_surface(
        &self,
        surface_id: SurfaceId,
        constraints: LayoutConstraints,
        context: LayoutContext,
    ) -> Result<(), SchedulerError> {
        let tree = Arc::new(ShadowTree::new(surface_id, constraints, context));
        self.registry.add(tree)?;
        tracing::info!(surface = %surface_id, "surface started");
        Ok(())
    }

    /// Unmount a surface's content, then unregister and return its tree.
    pub fn stop_surface(&self, surface_id: SurfaceId) -> Result<Arc<ShadowTree>, SchedulerError> {
        let status = self
            .registry
            .visit(surface_id, |tree| tree.commit_empty(CommitOptions::default()))
            .ok_or(SchedulerError::SurfaceNotFound(surface_id))?;
        status?;
        let tree = self
            .registry
            .remove(surface_id)
            .ok_or(SchedulerError::SurfaceNotFound(surface_id))?;
        tracing::info!(surface = %surface_id, "surface stopped");
        Ok(tree)
    }

    /// Commit a new revision on a surface.
    pub fn commit<F>(
        &self,
        surface_id: SurfaceId,
        options: CommitOptions,
        transform: F,
    ) -> Result<CommitStatus, SchedulerError>
    where
        F: FnOnce(&SharedRootShadowNode) -> Result<Option<SharedRootShadowNode>, CommitError>,
    {
        let status = self
            .registry
            .visit(surface_id, |tree| tree.commit(options, transform))
            .ok_or(SchedulerError::SurfaceNotFound(surface_id))?;
        Ok(status?)
    }

    /// Commit a new revision, then run the layout engine on it if dirty.
    pub fn commit_with_layout<F>(
        &self,
        surface_id: SurfaceId,
        options: CommitOptions,
        transform: F,
    ) -> Result<CommitStatus, SchedulerError>
    where
        F: FnOnce(&SharedRootShadowNode) -> Result<Option<SharedRootShadowNode>, CommitError>,
    {
        let engine = Arc::clone(&self.layout_engine);
        let status = self
            .registry
            .visit(surface_id, |tree| {
                tree.commit_with(options, |root, telemetry| {
                    let Some(next) = transform(root)? else {
                        return Ok(None);
                    };
                    // An unchanged root aborts; don't spend a layout pass
                    // on a commit that publishes nothing.
                    if Arc::ptr_eq(&next, root) {
                        return Ok(Some(next));
                    }
                    telemetry.will_layout();
                    let laid_out = next.layout_if_needed(engine.as_ref())?;
                    telemetry.did_layout();
                    Ok(Some(laid_out.unwrap_or(next)))
                })
            })
            .ok_or(SchedulerError::SurfaceNotFound(surface_id))?;
        Ok(status?)
    }

    /// Re-constrain a surface (viewport resize, density change) and
    /// relayout.
    pub fn constraints_changed(
        &self,
        surface_id: SurfaceId,
        constraints: LayoutConstraints,
        context: LayoutContext,
    ) -> Result<CommitStatus, SchedulerError> {
        self.commit_with_layout(surface_id, CommitOptions::default(), move |root| {
            Ok(Some(Arc::new(
                root.clone_with_constraints(constraints, context),
            )))
        })
    }

    /// The committed root of a surface, if registered.
    pub fn root(&self, surface_id: SurfaceId) -> Option<SharedRootShadowNode> {
        self.registry.visit(surface_id, ShadowTree::root)
    }

    /// The latest commit number of a surface, if registered.
    pub fn commit_number(&self, surface_id: SurfaceId) -> Option<u64> {
        self.registry.visit(surface_id, ShadowTree::commit_number)
    }

    /// The mounting layer's pull entry point for a surface, if registered.
    pub fn telemetry_controller(&self, surface_id: SurfaceId) -> Option<Arc<TelemetryController>> {
        self.registry
            .visit(surface_id, |tree| Arc::clone(tree.telemetry_controller()))
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::NoopLayoutEngine;

    fn scheduler() -> Scheduler {
        Scheduler::new(
            Arc::new(ShadowTreeRegistry::new()),
            Arc::new(ComponentDescriptorRegistry::new()),
            Arc::new(NoopLayoutEngine),
        )
    }

    #[test]
    fn commit_on_an_unknown_surface_is_reported() {
        let scheduler = scheduler();
        let result = scheduler.commit(SurfaceId::new(7), CommitOptions::default(), |root| {
            Ok(Some(Arc::clone(root)))
        });
        assert!(matches!(
            result,
            Err(SchedulerError::SurfaceNotFound(id)) if id == SurfaceId::new(7)
        ));
    }

    #[test]
    fn start_commit_stop_round_trip() {
        let scheduler = scheduler();
        let surface = SurfaceId::new(1);
        scheduler
            .start_surface(surface, LayoutConstraints::default(), LayoutContext::default())
            .expect("fresh surface starts");
        assert_eq!(scheduler.commit_number(surface), Some(0));

        let status = scheduler
            .commit_with_layout(surface, CommitOptions::default(), |root| {
                Ok(Some(Arc::clone(root)))
            })
            .expect("identity commit is an abort, not an error");
        assert_eq!(status, CommitStatus::Aborted);

        let tree = scheduler.stop_surface(surface).expect("surface stops");
        assert_eq!(tree.surface_id(), surface);
        assert!(scheduler.root(surface).is_none());
    }

    #[test]
    fn double_start_is_a_registry_error() {
        let scheduler = scheduler();
        let surface = SurfaceId::new(1);
        scheduler
            .start_surface(surface, LayoutConstraints::default(), LayoutContext::default())
            .expect("fresh surface starts");
        assert!(matches!(
            scheduler.start_surface(
                surface,
                LayoutConstraints::default(),
                LayoutContext::default()
            ),
            Err(SchedulerError::Registry(
                RegistryError::SurfaceAlreadyRegistered(_)
            ))
        ));
    }

    #[test]
    fn constraints_changed_commits_and_relayouts() {
        let scheduler = scheduler();
        let surface = SurfaceId::new(1);
        scheduler
            .start_surface(surface, LayoutConstraints::default(), LayoutContext::default())
            .expect("fresh surface starts");

        let status = scheduler
            .constraints_changed(
                surface,
                LayoutConstraints::default(),
                LayoutContext {
                    point_scale_factor: 2.0,
                    ..LayoutContext::default()
                },
            )
            .expect("constraint commit succeeds");
        assert!(matches!(status, CommitStatus::Committed { number: 1, .. }));

        let root = scheduler.root(surface).expect("registered");
        assert_eq!(root.context().point_scale_factor, 2.0);
        assert!(root.is_layout_clean());
    }
}

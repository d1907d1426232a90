#![forbid(unsafe_code)]

//! The commit lifecycle for one surface's shadow tree.
//!
//! Commits are serialized per surface by a mutex and always start from
//! the tree's *latest* committed root — the committed pointer is re-read
//! after the lock is acquired, never snapshotted before. If two commits
//! race, the second one's transform runs against the result of the first.
//! A transform computed speculatively against an older revision must
//! therefore be valid when applied to whatever root it receives; family
//! lookups make re-resolving cheap. There is no automatic rebase.
//!
//! Reads of the committed root are wait-free (`arc-swap`); the mutex only
//! serializes the transform/seal/diff/publish sequence.
//!
//! # Failure semantics
//! A transform error abandons the commit: the old root stays
//! authoritative, nothing is published or enqueued, and the error
//! propagates to the caller. There is no mid-commit cancellation — a
//! commit either publishes completely or leaves no trace.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use thiserror::Error;

use umbra_core::{
    LayoutConstraints, LayoutContext, LayoutError, RootShadowNode, SharedRootShadowNode,
    ShadowNodeFragment, SurfaceId,
};
use umbra_mount::{
    MountingCoordinator, MountingTransaction, TelemetryController, TransactionTelemetry,
    compute_mutations,
};

/// Relative urgency of a commit, recorded for diagnostics.
///
/// Priority never reorders or coalesces commits — total per-surface
/// commit order is the stronger guarantee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPriority {
    /// Regular update.
    #[default]
    Normal,
    /// Urgent update (e.g. driven by user input).
    High,
}

/// Options for one commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Urgency, threaded into trace output.
    pub priority: CommitPriority,
}

/// Outcome of a commit attempt that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// A new revision was published and a transaction enqueued.
    Committed {
        /// The new commit number.
        number: u64,
        /// Mutations in the enqueued transaction.
        mutation_count: usize,
    },
    /// The transform declined to produce a new revision; nothing
    /// observable happened.
    Aborted,
}

/// Errors surfaced by a commit.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The caller-supplied transform failed.
    #[error("commit transform failed: {0}")]
    Transform(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The layout engine failed inside the commit.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl CommitError {
    /// Wrap a transform failure.
    pub fn transform(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transform(error.into())
    }
}

/// Owns the commit lifecycle for one surface.
pub struct ShadowTree {
    surface_id: SurfaceId,
    commit_lock: Mutex<()>,
    root: ArcSwap<RootShadowNode>,
    commit_number: AtomicU64,
    coordinator: Arc<MountingCoordinator>,
    telemetry_controller: Arc<TelemetryController>,
}

impl ShadowTree {
    /// Create a tree with an empty, sealed root at commit number 0.
    pub fn new(
        surface_id: SurfaceId,
        constraints: LayoutConstraints,
        context: LayoutContext,
    ) -> Self {
        let root = RootShadowNode::new(surface_id, constraints, context);
        root.seal_subtree();
        let coordinator = Arc::new(MountingCoordinator::new(surface_id));
        let telemetry_controller = Arc::new(TelemetryController::new(Arc::clone(&coordinator)));
        Self {
            surface_id,
            commit_lock: Mutex::new(()),
            root: ArcSwap::from_pointee(root),
            commit_number: AtomicU64::new(0),
            coordinator,
            telemetry_controller,
        }
    }

    /// The surface this tree renders.
    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The currently committed root. Wait-free.
    pub fn root(&self) -> SharedRootShadowNode {
        self.root.load_full()
    }

    /// The latest successful commit number. Aborted commits do not
    /// advance it.
    pub fn commit_number(&self) -> u64 {
        self.commit_number.load(Ordering::Acquire)
    }

    /// The pull queue for this surface's transactions.
    pub fn mounting_coordinator(&self) -> &Arc<MountingCoordinator> {
        &self.coordinator
    }

    /// The telemetry-aggregating pull entry point for the mounting layer.
    pub fn telemetry_controller(&self) -> &Arc<TelemetryController> {
        &self.telemetry_controller
    }

    /// Commit a new revision produced by `transform`.
    ///
    /// The transform receives the committed root as it stands *after* the
    /// commit lock is acquired. Returning `Ok(None)` (or the same root)
    /// aborts with no observable effect.
    pub fn commit<F>(&self, options: CommitOptions, transform: F) -> Result<CommitStatus, CommitError>
    where
        F: FnOnce(&SharedRootShadowNode) -> Result<Option<SharedRootShadowNode>, CommitError>,
    {
        self.commit_with(options, |root, _telemetry| transform(root))
    }

    /// [`commit`](Self::commit), with access to the transaction telemetry
    /// so the transform can mark phases it runs (e.g. layout).
    pub fn commit_with<F>(
        &self,
        options: CommitOptions,
        transform: F,
    ) -> Result<CommitStatus, CommitError>
    where
        F: FnOnce(
            &SharedRootShadowNode,
            &mut TransactionTelemetry,
        ) -> Result<Option<SharedRootShadowNode>, CommitError>,
    {
        let _guard = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();

        // Re-read under the lock: a racing commit may have published since
        // the caller decided to commit.
        let old_root = self.root.load_full();
        let Some(new_root) = transform(&old_root, &mut telemetry)? else {
            tracing::trace!(surface = %self.surface_id, "commit aborted by transform");
            return Ok(CommitStatus::Aborted);
        };
        if Arc::ptr_eq(&new_root, &old_root) {
            tracing::trace!(surface = %self.surface_id, "commit aborted, root unchanged");
            return Ok(CommitStatus::Aborted);
        }

        new_root.seal_subtree();

        telemetry.will_diff();
        let mutations = compute_mutations(&old_root, &new_root);
        telemetry.did_diff();
        telemetry.did_commit();

        let number = self.commit_number.load(Ordering::Acquire) + 1;
        let mutation_count = mutations.len();
        let transaction =
            MountingTransaction::new(self.surface_id, number, mutations, telemetry);

        self.root.store(new_root);
        self.commit_number.store(number, Ordering::Release);
        self.coordinator.push(transaction);

        tracing::debug!(
            surface = %self.surface_id,
            commit = number,
            mutations = mutation_count,
            priority = ?options.priority,
            "commit published"
        );
        Ok(CommitStatus::Committed {
            number,
            mutation_count,
        })
    }

    /// Commit an empty child list, unmounting everything on the surface.
    ///
    /// Aborts (no-op) when the tree is already empty.
    pub fn commit_empty(&self, options: CommitOptions) -> Result<CommitStatus, CommitError> {
        self.commit(options, |root| {
            if root.children().is_empty() {
                return Ok(None);
            }
            Ok(Some(Arc::new(root.clone_with(
                ShadowNodeFragment::with_children(Arc::new(Vec::new())),
            ))))
        })
    }
}

impl std::fmt::Debug for ShadowTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowTree")
            .field("surface_id", &self.surface_id)
            .field("commit_number", &self.commit_number())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::{
        ShadowNode, ShadowNodeFamily, ShadowNodeFragment, SharedShadowNode, Tag,
    };

    fn tree() -> ShadowTree {
        ShadowTree::new(
            SurfaceId::new(1),
            LayoutConstraints::default(),
            LayoutContext::default(),
        )
    }

    fn leaf(tag: u64) -> SharedShadowNode {
        let family = ShadowNodeFamily::new(Tag::new(tag), SurfaceId::new(1), "View");
        ShadowNode::new(family, ShadowNodeFragment::default()).into_shared()
    }

    fn append_leaf(
        root: &SharedRootShadowNode,
        tag: u64,
    ) -> Result<Option<SharedRootShadowNode>, CommitError> {
        let mut children = root.children().as_ref().clone();
        children.push(leaf(tag));
        Ok(Some(Arc::new(root.clone_with(
            ShadowNodeFragment::with_children(Arc::new(children)),
        ))))
    }

    #[test]
    fn successful_commits_advance_the_number_by_one() {
        let tree = tree();
        assert_eq!(tree.commit_number(), 0);

        let status = tree
            .commit(CommitOptions::default(), |root| append_leaf(root, 1))
            .expect("commit succeeds");
        assert_eq!(
            status,
            CommitStatus::Committed {
                number: 1,
                mutation_count: 1
            }
        );
        assert_eq!(tree.commit_number(), 1);
    }

    #[test]
    fn identity_transform_aborts_without_a_trace() {
        let tree = tree();
        let status = tree
            .commit(CommitOptions::default(), |root| Ok(Some(Arc::clone(root))))
            .expect("abort is not an error");
        assert_eq!(status, CommitStatus::Aborted);
        assert_eq!(tree.commit_number(), 0);
        assert!(!tree.mounting_coordinator().has_pending_transactions());
    }

    #[test]
    fn declining_transform_aborts_without_a_trace() {
        let tree = tree();
        let status = tree
            .commit(CommitOptions::default(), |_root| Ok(None))
            .expect("abort is not an error");
        assert_eq!(status, CommitStatus::Aborted);
        assert!(!tree.mounting_coordinator().has_pending_transactions());
    }

    #[test]
    fn failed_transform_leaves_the_old_root_authoritative() {
        let tree = tree();
        tree.commit(CommitOptions::default(), |root| append_leaf(root, 1))
            .expect("setup commit succeeds");
        let before = tree.root();

        let result = tree.commit(CommitOptions::default(), |_root| {
            Err(CommitError::transform("descriptor rejected props"))
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&tree.root(), &before));
        assert_eq!(tree.commit_number(), 1);
    }

    #[test]
    fn published_roots_are_sealed() {
        let tree = tree();
        tree.commit(CommitOptions::default(), |root| append_leaf(root, 1))
            .expect("commit succeeds");
        let root = tree.root();
        assert!(root.node().is_sealed());
        assert!(root.children()[0].is_sealed());
    }

    #[test]
    fn commit_empty_unmounts_and_then_noops() {
        let tree = tree();
        tree.commit(CommitOptions::default(), |root| append_leaf(root, 1))
            .expect("commit succeeds");

        let status = tree
            .commit_empty(CommitOptions::default())
            .expect("commit succeeds");
        assert!(matches!(status, CommitStatus::Committed { mutation_count: 1, .. }));
        assert_eq!(
            tree.commit_empty(CommitOptions::default()).expect("no-op"),
            CommitStatus::Aborted
        );
    }
}

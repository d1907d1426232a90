#![forbid(unsafe_code)]

//! Per-commit and per-surface telemetry.
//!
//! [`TransactionTelemetry`] records instant marks along one commit's path
//! (commit, layout, diff, mount); [`SurfaceTelemetry`] accumulates across
//! commits. [`TelemetryController`] wraps the coordinator's pull with the
//! will-mount / do-mount / did-mount callback sequence the platform layer
//! drives once per frame tick.
//!
//! All clocks are `web_time::Instant`; durations for mark pairs that were
//! never recorded read as `None` rather than zero.

use std::sync::Arc;

use umbra_core::SurfaceId;
use web_time::{Duration, Instant};

use crate::coordinator::MountingCoordinator;
use crate::mutation::Mutation;

/// Timing marks for one commit/mount cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionTelemetry {
    will_commit_at: Option<Instant>,
    did_commit_at: Option<Instant>,
    will_layout_at: Option<Instant>,
    did_layout_at: Option<Instant>,
    will_diff_at: Option<Instant>,
    did_diff_at: Option<Instant>,
    will_mount_at: Option<Instant>,
    did_mount_at: Option<Instant>,
}

impl TransactionTelemetry {
    /// Fresh telemetry with no marks recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of the commit critical section.
    pub fn will_commit(&mut self) {
        self.will_commit_at = Some(Instant::now());
    }

    /// Mark the end of the commit critical section.
    pub fn did_commit(&mut self) {
        self.did_commit_at = Some(Instant::now());
    }

    /// Mark the start of the layout pass.
    pub fn will_layout(&mut self) {
        self.will_layout_at = Some(Instant::now());
    }

    /// Mark the end of the layout pass.
    pub fn did_layout(&mut self) {
        self.did_layout_at = Some(Instant::now());
    }

    /// Mark the start of diffing.
    pub fn will_diff(&mut self) {
        self.will_diff_at = Some(Instant::now());
    }

    /// Mark the end of diffing.
    pub fn did_diff(&mut self) {
        self.did_diff_at = Some(Instant::now());
    }

    /// Mark the start of platform mounting.
    pub fn will_mount(&mut self) {
        self.will_mount_at = Some(Instant::now());
    }

    /// Mark the end of platform mounting.
    pub fn did_mount(&mut self) {
        self.did_mount_at = Some(Instant::now());
    }

    /// Wall time of the commit critical section, if both marks exist.
    pub fn commit_duration(&self) -> Option<Duration> {
        span(self.will_commit_at, self.did_commit_at)
    }

    /// Wall time of the layout pass, if both marks exist.
    pub fn layout_duration(&self) -> Option<Duration> {
        span(self.will_layout_at, self.did_layout_at)
    }

    /// Wall time of diffing, if both marks exist.
    pub fn diff_duration(&self) -> Option<Duration> {
        span(self.will_diff_at, self.did_diff_at)
    }

    /// Wall time of platform mounting, if both marks exist.
    pub fn mount_duration(&self) -> Option<Duration> {
        span(self.will_mount_at, self.did_mount_at)
    }
}

fn span(start: Option<Instant>, end: Option<Instant>) -> Option<Duration> {
    end?.checked_duration_since(start?)
}

/// Cumulative telemetry for one surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceTelemetry {
    /// Successful commits mounted so far.
    pub commit_count: u64,
    /// Total mutations across all mounted transactions.
    pub mutation_count: u64,
    /// Commit duration of the most recent transaction.
    pub last_commit_duration: Option<Duration>,
    /// Sum of all commit durations.
    pub total_commit_duration: Duration,
    /// Mount duration of the most recent transaction.
    pub last_mount_duration: Option<Duration>,
}

impl SurfaceTelemetry {
    /// Fold one mounted transaction into the accumulator.
    pub fn incorporate(&mut self, telemetry: &TransactionTelemetry, mutation_count: usize) {
        self.commit_count += 1;
        self.mutation_count += mutation_count as u64;
        if let Some(duration) = telemetry.commit_duration() {
            self.last_commit_duration = Some(duration);
            self.total_commit_duration += duration;
        }
        if let Some(duration) = telemetry.mount_duration() {
            self.last_mount_duration = Some(duration);
        }
    }
}

/// What the mount callbacks get to see about a transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactionMetadata {
    /// The surface being mounted.
    pub surface_id: SurfaceId,
    /// The transaction's commit number.
    pub number: u64,
    /// This transaction's timing marks.
    pub telemetry: TransactionTelemetry,
    /// Cumulative surface telemetry — the pre-mount snapshot in
    /// `will_mount`, the updated one in `did_mount`.
    pub surface_telemetry: SurfaceTelemetry,
}

/// Wraps the coordinator's pull with telemetry aggregation and the
/// platform's mount callbacks.
///
/// Intended to be driven repeatedly (once per frame tick) from a single
/// mounting thread while commits land concurrently from others; telemetry
/// access is lock-protected and the transaction hand-off is queue-based.
#[derive(Debug)]
pub struct TelemetryController {
    coordinator: Arc<MountingCoordinator>,
}

impl TelemetryController {
    /// Create a controller over one surface's coordinator.
    pub fn new(coordinator: Arc<MountingCoordinator>) -> Self {
        Self { coordinator }
    }

    /// The underlying coordinator.
    pub fn coordinator(&self) -> &Arc<MountingCoordinator> {
        &self.coordinator
    }

    /// Pull and mount the oldest pending transaction, if any.
    ///
    /// Returns `false` without invoking any callback when nothing is
    /// pending. Otherwise: `will_mount` sees the pre-mount cumulative
    /// snapshot, `do_mount` applies the mutations (the actual platform
    /// work), and `did_mount` sees the accumulator with this transaction
    /// folded in. Returns `true`.
    pub fn pull_transaction(
        &self,
        will_mount: impl FnOnce(&TransactionMetadata),
        do_mount: impl FnOnce(&[Mutation]),
        did_mount: impl FnOnce(&TransactionMetadata),
    ) -> bool {
        let Some(transaction) = self.coordinator.pull_transaction() else {
            return false;
        };

        let mut telemetry = *transaction.telemetry();
        will_mount(&TransactionMetadata {
            surface_id: transaction.surface_id(),
            number: transaction.number(),
            telemetry,
            surface_telemetry: self.coordinator.surface_telemetry(),
        });

        telemetry.will_mount();
        do_mount(transaction.mutations());
        telemetry.did_mount();

        let updated = self
            .coordinator
            .incorporate(&telemetry, transaction.mutations().len());
        did_mount(&TransactionMetadata {
            surface_id: transaction.surface_id(),
            number: transaction.number(),
            telemetry,
            surface_telemetry: updated,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecorded_spans_read_as_none() {
        let telemetry = TransactionTelemetry::new();
        assert!(telemetry.commit_duration().is_none());
        assert!(telemetry.mount_duration().is_none());
    }

    #[test]
    fn recorded_spans_are_measurable() {
        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();
        telemetry.did_commit();
        assert!(telemetry.commit_duration().is_some());
        // Diff marks were never set; its span stays empty.
        assert!(telemetry.diff_duration().is_none());
    }

    #[test]
    fn incorporate_accumulates_counts_and_durations() {
        let mut cumulative = SurfaceTelemetry::default();
        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();
        telemetry.did_commit();

        cumulative.incorporate(&telemetry, 3);
        cumulative.incorporate(&telemetry, 2);

        assert_eq!(cumulative.commit_count, 2);
        assert_eq!(cumulative.mutation_count, 5);
        assert!(cumulative.last_commit_duration.is_some());
    }
}

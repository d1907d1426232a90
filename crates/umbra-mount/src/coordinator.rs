#![forbid(unsafe_code)]

//! Per-surface pull queue of pending mounting transactions.
//!
//! The producer side is the commit critical section, so transactions
//! arrive in commit order; the consumer side is the platform's mounting
//! loop, which pulls when it is ready. Back-pressure is the queue simply
//! growing — a transaction is never dropped, coalesced, or reordered,
//! because every mutation list is a delta against the previous one.

use std::collections::VecDeque;
use std::sync::Mutex;

use umbra_core::SurfaceId;

use crate::telemetry::{SurfaceTelemetry, TransactionTelemetry};
use crate::transaction::MountingTransaction;

/// FIFO hand-off point between commits and the mounting layer for one
/// surface, plus that surface's cumulative telemetry.
#[derive(Debug)]
pub struct MountingCoordinator {
    surface_id: SurfaceId,
    queue: Mutex<VecDeque<MountingTransaction>>,
    telemetry: Mutex<SurfaceTelemetry>,
}

impl MountingCoordinator {
    /// Create an empty coordinator for a surface.
    pub fn new(surface_id: SurfaceId) -> Self {
        Self {
            surface_id,
            queue: Mutex::new(VecDeque::new()),
            telemetry: Mutex::new(SurfaceTelemetry::default()),
        }
    }

    /// The surface this coordinator serves.
    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Enqueue a freshly committed transaction.
    ///
    /// Called under the commit lock, so arrival order is commit order.
    pub fn push(&self, transaction: MountingTransaction) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            surface = self.surface_id.value(),
            number = transaction.number(),
            mutations = transaction.mutations().len(),
            "transaction queued"
        );
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(transaction);
    }

    /// Dequeue the oldest pending transaction, or `None`.
    ///
    /// An empty queue is the expected, frequent, silent outcome — not an
    /// error.
    pub fn pull_transaction(&self) -> Option<MountingTransaction> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Whether a pull would currently yield a transaction.
    pub fn has_pending_transactions(&self) -> bool {
        !self.queue.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    /// Snapshot of the cumulative surface telemetry.
    pub fn surface_telemetry(&self) -> SurfaceTelemetry {
        *self.telemetry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fold one mounted transaction into the cumulative telemetry and
    /// return the updated snapshot.
    pub fn incorporate(
        &self,
        telemetry: &TransactionTelemetry,
        mutation_count: usize,
    ) -> SurfaceTelemetry {
        let mut cumulative = self.telemetry.lock().unwrap_or_else(|e| e.into_inner());
        cumulative.incorporate(telemetry, mutation_count);
        *cumulative
    }
}

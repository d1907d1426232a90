#![forbid(unsafe_code)]

//! The immutable product of one successful commit.

use umbra_core::SurfaceId;

use crate::mutation::{Mutation, MutationList};
use crate::telemetry::TransactionTelemetry;

/// One commit's ordered mutations plus its telemetry snapshot.
///
/// Created once per successful commit, immutable afterwards, and consumed
/// exactly once by the mounting layer via
/// [`MountingCoordinator::pull_transaction`](crate::MountingCoordinator::pull_transaction).
#[derive(Debug)]
pub struct MountingTransaction {
    surface_id: SurfaceId,
    number: u64,
    mutations: MutationList,
    telemetry: TransactionTelemetry,
}

impl MountingTransaction {
    /// Package a commit's output.
    pub fn new(
        surface_id: SurfaceId,
        number: u64,
        mutations: MutationList,
        telemetry: TransactionTelemetry,
    ) -> Self {
        Self {
            surface_id,
            number,
            mutations,
            telemetry,
        }
    }

    /// The surface this transaction belongs to.
    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The commit number that produced this transaction.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// The ordered mutation list.
    #[inline]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// This commit's timing marks.
    #[inline]
    pub fn telemetry(&self) -> &TransactionTelemetry {
        &self.telemetry
    }

    /// Take ownership of the mutation list.
    pub fn into_mutations(self) -> MutationList {
        self.mutations
    }
}

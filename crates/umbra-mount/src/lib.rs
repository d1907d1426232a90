#![forbid(unsafe_code)]

//! Mount kernel: diffs, transactions, and telemetry.
//!
//! # Role in umbra
//! `umbra-mount` turns two consecutive shadow-tree revisions into an
//! ordered [`Mutation`] list, packages each commit's mutations into an
//! immutable [`MountingTransaction`], and hands transactions to the
//! platform through the pull-based [`MountingCoordinator`].
//!
//! # Primary responsibilities
//! - **Diff**: change detection by family identity, never by structural
//!   equality — reorders become moves, untouched subtrees cost one pointer
//!   comparison.
//! - **Transaction/Coordinator**: per-surface FIFO hand-off; transactions
//!   are pulled when the platform is ready, never pushed, never dropped.
//! - **Telemetry**: per-commit timing marks plus the cumulative
//!   per-surface accumulator, exposed through [`TelemetryController`].
//!
//! # How it fits in the system
//! `umbra-runtime` calls [`compute_mutations`] inside its commit critical
//! section and pushes the resulting transaction here. The platform's
//! mounting loop pulls on its own tick via
//! [`TelemetryController::pull_transaction`].

pub mod coordinator;
pub mod diff;
pub mod mutation;
pub mod telemetry;
pub mod transaction;

pub use coordinator::MountingCoordinator;
pub use diff::compute_mutations;
pub use mutation::{Mutation, MutationList};
pub use telemetry::{
    SurfaceTelemetry, TelemetryController, TransactionMetadata, TransactionTelemetry,
};
pub use transaction::MountingTransaction;

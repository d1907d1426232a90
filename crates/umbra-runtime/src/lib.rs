#![forbid(unsafe_code)]

//! Commit orchestration for shadow-tree surfaces.
//!
//! # Role in umbra
//! `umbra-runtime` is the orchestrator. It owns the commit lifecycle of
//! each surface's tree ([`ShadowTree`]), the concurrent surface registry
//! ([`ShadowTreeRegistry`]), and the [`Scheduler`] façade that upper
//! layers drive with "please recompute" requests.
//!
//! # Key components
//! - [`ShadowTree`] — serialized, atomic commits: transform the latest
//!   root, seal, diff, publish, enqueue. A failed or no-op commit has no
//!   observable effect.
//! - [`ShadowTreeRegistry`] — shared/exclusive surface map; commits on
//!   different surfaces proceed fully in parallel.
//! - [`Scheduler`] — wires the registry, the component descriptors, and
//!   the layout engine together behind one entry point.
//!
//! # How it fits in the system
//! Tree data structures come from `umbra-core`; diffing, transactions,
//! and telemetry from `umbra-mount`. The platform mounting layer never
//! talks to this crate directly — it pulls from the per-surface
//! [`TelemetryController`](umbra_mount::TelemetryController) on its own
//! tick.

pub mod registry;
pub mod scheduler;
pub mod shadow_tree;

pub use registry::{RegistryError, ShadowTreeRegistry};
pub use scheduler::{Scheduler, SchedulerError};
pub use shadow_tree::{CommitError, CommitOptions, CommitPriority, CommitStatus, ShadowTree};

//! Delta synchronization between peers.
//!
//! [`diff`] and [`apply_ops`] compute and replay change-sets, [`DeltaSync`] decides when a
//! local transition is broadcast and keeps remote applies from echoing, and
//! [`Reconciler`] gates the periodic full-snapshot backstop.

mod delta;
mod engine;
mod reconcile;

pub use delta::{ChangeSet, Operation, apply_ops, build_change_set, diff, is_reordered};
pub use engine::{DeltaSync, SyncState};
pub use reconcile::{ReconcileDecision, Reconciler};

//! # poolsync
//!
//! Converges a load balancer's node pool onto the set of compute instances
//! selected by tags.
//!
//! A run is an ordered pipeline:
//!
//! 1. **Desired state** ([`desired`]): private addresses of `ACTIVE`
//!    instances matching the selection predicate.
//! 2. **Actual state** ([`actual`]): addresses of `ENABLED`/`DISABLED` nodes
//!    on the load balancer.
//! 3. **Diff**: a [`ReconciliationPlan`] of addresses to add and remove.
//! 4. **Apply** ([`apply`]): additions first, then removals, waiting for the
//!    load balancer to settle ([`poller`]) after every mutation.
//!
//! The run is stateless: both sides are re-read from the live backends every
//! time, so it is safe to invoke repeatedly ([`daemon`]).

pub mod actual;
pub mod apply;
pub mod cli;
pub mod context;
pub mod cycle;
pub mod daemon;
pub mod desired;
pub mod driver;
pub mod error;
pub mod logging;
pub mod poller;

pub use actual::ActualState;
pub use apply::{ApplyReport, Reconciler};
pub use context::SyncContext;
pub use cycle::{CycleReport, SyncCycle};
pub use error::{Backend, Mutation, SyncError};
pub use poller::ConvergencePoller;

pub use poolsync_reconcile::{AddressSet, PollPolicy, ReconciliationPlan, SelectionPredicate};

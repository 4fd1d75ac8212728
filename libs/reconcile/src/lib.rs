//! Reconciliation primitives for load balancer pools.
//!
//! This library holds the pure parts of a pool sync run:
//!
//! - **Desired state**: addresses of instances whose tags satisfy a
//!   [`SelectionPredicate`].
//! - **Actual state**: addresses currently attached to the load balancer.
//! - **Plan**: the [`ReconciliationPlan`] that converges actual to desired.
//!
//! # Invariants
//!
//! - [`AddressSet`] never holds duplicates; equality ignores order
//! - [`ReconciliationPlan::diff`] is deterministic and side-effect free
//! - `to_add` and `to_remove` are always disjoint

use std::time::Duration;

mod address;
mod digest;
mod plan;
mod predicate;

pub use address::AddressSet;
pub use digest::StateDigest;
pub use plan::ReconciliationPlan;
pub use predicate::{PredicateError, SelectionPredicate};

/// Status value a load balancer reports once it has settled.
pub const STABLE_STATUS: &str = "ACTIVE";

/// Default delay between convergence polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of status observations before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Default delay between daemon sync cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Bounded polling policy used after every mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two observations.
    pub interval: Duration,

    /// Maximum number of observations (at least one).
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Upper bound on the time spent sleeping between observations.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_ATTEMPTS)
    }
}

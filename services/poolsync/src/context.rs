//! Per-run settings handed to every pipeline stage.

use poolsync_cloud::{LoadBalancerId, Region};
use poolsync_reconcile::PollPolicy;

/// Settings for one sync run, built by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    /// Region hosting the instances and the load balancer.
    pub region: Region,

    /// Load balancer whose pool is reconciled.
    pub load_balancer_id: LoadBalancerId,

    /// Polling applied after each mutation.
    pub poll: PollPolicy,

    /// Compute and log the plan without mutating anything.
    pub dry_run: bool,
}

impl SyncContext {
    pub fn new(region: Region, load_balancer_id: LoadBalancerId) -> Self {
        Self {
            region,
            load_balancer_id,
            poll: PollPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

//! Applies a reconciliation plan to the load balancer.

use poolsync_cloud::{LoadBalancer, LoadBalancerService, NewNode};
use poolsync_reconcile::ReconciliationPlan;
use tracing::{error, info, warn};

use crate::actual::ActualState;
use crate::error::{Mutation, SyncError};
use crate::poller::ConvergencePoller;

/// Outcome of applying one plan.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Addresses attached.
    pub added: Vec<String>,

    /// Addresses detached.
    pub removed: Vec<String>,

    /// Rejected mutations (`SyncError::MutationFailed`).
    pub failures: Vec<SyncError>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Mutations attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.added.len() + self.removed.len() + self.failures.len()
    }
}

/// Drives node additions and removals, one settle-wait per mutation.
pub struct Reconciler<'a> {
    service: &'a dyn LoadBalancerService,
    poller: ConvergencePoller,
}

impl<'a> Reconciler<'a> {
    pub fn new(service: &'a dyn LoadBalancerService, poller: ConvergencePoller) -> Self {
        Self { service, poller }
    }

    /// Wait for the load balancer to settle. A timeout carries the number of
    /// mutations that had already failed so the caller still sees them.
    async fn settle(&self, lb: &LoadBalancer, failed_so_far: usize) -> Result<(), SyncError> {
        self.poller
            .wait_until_active(self.service, lb)
            .await
            .map(|_| ())
            .map_err(|e| e.with_prior_failures(failed_so_far))
    }

    /// Apply `plan` against the load balancer in `actual`.
    ///
    /// All additions are issued before any removal. A rejected mutation is
    /// recorded and the remaining addresses are still attempted; a
    /// convergence timeout stops the run immediately.
    pub async fn apply(
        &self,
        plan: &ReconciliationPlan,
        actual: &ActualState,
    ) -> Result<ApplyReport, SyncError> {
        let lb = &actual.load_balancer;
        let mut report = ApplyReport::default();

        if plan.is_empty() {
            return Ok(report);
        }

        if !plan.to_add.is_empty() {
            warn!(lb_id = %lb.id, addresses = %plan.to_add, "New nodes to add to load balancer");
        }

        for address in plan.to_add.iter() {
            let node = NewNode::enabled(address, lb.port);

            match self.service.add_node(lb, &node).await {
                Ok(created) => {
                    info!(lb_id = %lb.id, node_id = %created.id, address, port = lb.port, "Node added");
                    self.settle(lb, report.failures.len()).await?;
                    report.added.push(address.to_string());
                }
                Err(source) => {
                    error!(lb_id = %lb.id, address, error = %source, "Failed to add node");
                    report.failures.push(SyncError::MutationFailed {
                        operation: Mutation::Add,
                        id: lb.id,
                        address: address.to_string(),
                        source,
                    });
                }
            }
        }

        if !plan.to_remove.is_empty() {
            warn!(lb_id = %lb.id, addresses = %plan.to_remove, "Old nodes to remove from load balancer");
        }

        for address in plan.to_remove.iter() {
            let mut removed_all = true;
            let mut matched = false;

            for node in actual.settled_nodes_at(address) {
                matched = true;

                match self.service.remove_node(lb, node.id).await {
                    Ok(()) => {
                        info!(lb_id = %lb.id, node_id = %node.id, address, "Node removed");
                        self.settle(lb, report.failures.len()).await?;
                    }
                    Err(source) => {
                        removed_all = false;
                        error!(lb_id = %lb.id, node_id = %node.id, address, error = %source, "Failed to remove node");
                        report.failures.push(SyncError::MutationFailed {
                            operation: Mutation::Remove,
                            id: lb.id,
                            address: address.to_string(),
                            source,
                        });
                    }
                }
            }

            if !matched {
                warn!(lb_id = %lb.id, address, "No node found for address scheduled for removal");
            } else if removed_all {
                report.removed.push(address.to_string());
            }
        }

        Ok(report)
    }
}

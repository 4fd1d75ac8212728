//! One full desired → actual → diff → apply pass.

use std::sync::Arc;

use poolsync_cloud::{ComputeDirectory, LoadBalancerService};
use poolsync_reconcile::{AddressSet, ReconciliationPlan, SelectionPredicate};
use tracing::{info, instrument, warn};

use crate::actual::{self, ActualState};
use crate::apply::{ApplyReport, Reconciler};
use crate::context::SyncContext;
use crate::desired;
use crate::error::SyncError;
use crate::poller::ConvergencePoller;

/// Result of a completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub desired: AddressSet,
    pub actual: ActualState,
    pub plan: ReconciliationPlan,
    pub applied: ApplyReport,
}

impl CycleReport {
    /// True when no change was needed.
    pub fn was_converged(&self) -> bool {
        self.plan.is_empty()
    }

    /// False if any mutation was rejected.
    pub fn is_success(&self) -> bool {
        self.applied.is_success()
    }
}

/// Reconciliation pipeline bound to a pair of backends.
#[derive(Clone)]
pub struct SyncCycle {
    directory: Arc<dyn ComputeDirectory>,
    load_balancers: Arc<dyn LoadBalancerService>,
    ctx: SyncContext,
}

impl SyncCycle {
    pub fn new(
        directory: Arc<dyn ComputeDirectory>,
        load_balancers: Arc<dyn LoadBalancerService>,
        ctx: SyncContext,
    ) -> Self {
        Self {
            directory,
            load_balancers,
            ctx,
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Run one cycle.
    ///
    /// Desired state is resolved first so an empty selection fails before
    /// the load balancer is touched.
    #[instrument(
        skip_all,
        fields(region = %self.ctx.region, lb_id = %self.ctx.load_balancer_id, selector = %predicate)
    )]
    pub async fn run(&self, predicate: &SelectionPredicate) -> Result<CycleReport, SyncError> {
        let desired = desired::resolve(self.directory.as_ref(), &self.ctx, predicate).await?;
        let actual = actual::resolve(self.load_balancers.as_ref(), &self.ctx).await?;
        let plan = ReconciliationPlan::diff(&desired, &actual.comparable);

        if plan.is_empty() {
            info!("No update required");
            return Ok(CycleReport {
                desired,
                actual,
                plan,
                applied: ApplyReport::default(),
            });
        }

        if self.ctx.dry_run {
            warn!(
                to_add = %plan.to_add,
                to_remove = %plan.to_remove,
                "Dry run: load balancer left unchanged"
            );
            return Ok(CycleReport {
                desired,
                actual,
                plan,
                applied: ApplyReport::default(),
            });
        }

        let reconciler = Reconciler::new(
            self.load_balancers.as_ref(),
            ConvergencePoller::new(self.ctx.poll),
        );
        let applied = reconciler.apply(&plan, &actual).await?;

        info!(
            added = applied.added.len(),
            removed = applied.removed.len(),
            failed = applied.failures.len(),
            "Reconciliation applied"
        );

        Ok(CycleReport {
            desired,
            actual,
            plan,
            applied,
        })
    }
}

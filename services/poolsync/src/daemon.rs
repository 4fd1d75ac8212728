//! Periodic sync loop for `clb-syncd`.
//!
//! Cycles run back to back on a fixed timer and never overlap: a tick that
//! arrives while a cycle is still running is delayed, not queued.

use std::time::Duration;

use chrono::Utc;
use poolsync_reconcile::{SelectionPredicate, StateDigest};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::cycle::{CycleReport, SyncCycle};
use crate::error::SyncError;

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub cycles: u64,
    pub failed_cycles: u64,
}

/// Last digests seen, to log membership changes only once.
#[derive(Debug, Default)]
struct DigestTracker {
    desired: Option<StateDigest>,
    actual: Option<StateDigest>,
}

impl DigestTracker {
    fn observe(&mut self, report: &CycleReport) {
        let desired = StateDigest::of(&report.desired);
        let actual = StateDigest::of(&report.actual.comparable);

        if self.desired.as_ref() != Some(&desired) {
            info!(digest = %desired, addresses = %report.desired, "Desired membership changed");
        }
        if self.actual.as_ref() != Some(&actual) {
            info!(digest = %actual, addresses = %report.actual.comparable, "Pool membership changed");
        }

        self.desired = Some(desired);
        self.actual = Some(actual);
    }
}

fn log_report(report: &CycleReport) {
    info!(
        at = %Utc::now().to_rfc3339(),
        enabled = %report.actual.enabled,
        disabled = %report.actual.disabled,
        draining = %report.actual.draining,
        desired = %report.desired,
        "Cycle complete"
    );

    if !report.is_success() {
        for failure in &report.applied.failures {
            warn!(error = %failure, "Mutation failed during cycle");
        }
    }
}

/// Run sync cycles every `every` until `shutdown` flips to true.
///
/// A missing load balancer stops the loop with an error; every other
/// failure is logged and retried on the next tick.
pub async fn run_daemon(
    cycle: &SyncCycle,
    predicate: &SelectionPredicate,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<DaemonStats, SyncError> {
    let ctx = cycle.context();
    info!(
        region = %ctx.region,
        lb_id = %ctx.load_balancer_id,
        selector = %predicate,
        interval_secs = every.as_secs(),
        "Starting sync loop"
    );

    let mut stats = DaemonStats::default();
    let mut digests = DigestTracker::default();
    let mut timer = tokio::time::interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(cycles = stats.cycles, "Sync loop shutting down");
                    break;
                }
            }
            _ = timer.tick() => {
                stats.cycles += 1;
                match cycle.run(predicate).await {
                    Ok(report) => {
                        digests.observe(&report);
                        log_report(&report);
                        if !report.is_success() {
                            stats.failed_cycles += 1;
                        }
                    }
                    Err(e @ SyncError::LoadBalancerNotFound { .. }) => {
                        error!(error = %e, "Load balancer gone, stopping");
                        return Err(e);
                    }
                    Err(e) => {
                        stats.failed_cycles += 1;
                        error!(error = %e, cycle = stats.cycles, "Sync cycle failed, retrying next tick");
                    }
                }
            }
        }
    }

    Ok(stats)
}

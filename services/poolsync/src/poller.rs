//! Waits for a load balancer to settle after a mutation.

use poolsync_cloud::{LoadBalancer, LoadBalancerService};
use poolsync_reconcile::{PollPolicy, STABLE_STATUS};
use tracing::{debug, warn};

use crate::error::SyncError;

/// Status reported when a status read itself failed.
const UNKNOWN_STATUS: &str = "unknown";

/// Bounded-retry wait for `ACTIVE`.
#[derive(Debug, Clone, Copy)]
pub struct ConvergencePoller {
    policy: PollPolicy,
}

impl ConvergencePoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll until the status reads `ACTIVE`.
    ///
    /// Makes at most `max_attempts` observations, sleeping `interval` between
    /// two of them. A failed status read counts as an observation. Returns
    /// the number of observations made.
    pub async fn wait_until_active(
        &self,
        service: &dyn LoadBalancerService,
        lb: &LoadBalancer,
    ) -> Result<u32, SyncError> {
        let mut last_status = UNKNOWN_STATUS.to_string();

        for attempt in 1..=self.policy.max_attempts {
            match service.status(lb).await {
                Ok(status) if status == STABLE_STATUS => {
                    debug!(lb_id = %lb.id, attempt, "Load balancer is ACTIVE");
                    return Ok(attempt);
                }
                Ok(status) => {
                    debug!(lb_id = %lb.id, attempt, status = %status, "Waiting for load balancer");
                    last_status = status;
                }
                Err(e) => {
                    warn!(lb_id = %lb.id, attempt, error = %e, "Failed to read load balancer status");
                    last_status = UNKNOWN_STATUS.to_string();
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(SyncError::ConvergenceTimeout {
            id: lb.id,
            last_status,
            attempts: self.policy.max_attempts,
            prior_failures: 0,
        })
    }
}

impl Default for ConvergencePoller {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use poolsync_cloud::{Call, InMemoryCloud};

    fn status_reads(cloud: &InMemoryCloud) -> usize {
        cloud
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Status(_)))
            .count()
    }

    async fn setup() -> (InMemoryCloud, LoadBalancer) {
        let cloud = InMemoryCloud::new();
        let id = cloud.add_load_balancer(42, 80);
        let lb = cloud.find(id).await.unwrap().unwrap();
        cloud.clear_calls();
        (cloud, lb)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_once_active() {
        let (cloud, lb) = setup().await;
        cloud.script_statuses(lb.id, ["PENDING_UPDATE", "PENDING_UPDATE"]);

        let poller = ConvergencePoller::default();
        let observations = poller.wait_until_active(&cloud, &lb).await.unwrap();

        assert_eq!(observations, 3);
        assert_eq!(status_reads(&cloud), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_exact_attempts() {
        let (cloud, lb) = setup().await;
        cloud.set_status(lb.id, "PENDING_UPDATE");

        let poller = ConvergencePoller::new(PollPolicy::new(Duration::from_secs(1), 3));
        let started = tokio::time::Instant::now();
        let err = poller.wait_until_active(&cloud, &lb).await.unwrap_err();

        match err {
            SyncError::ConvergenceTimeout {
                last_status,
                attempts,
                ..
            } => {
                assert_eq!(last_status, "PENDING_UPDATE");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(status_reads(&cloud), 3);
        // Two sleeps between three observations.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_read_errors_are_retried() {
        let (cloud, lb) = setup().await;
        cloud.fail_status_reads(2);

        let poller = ConvergencePoller::new(PollPolicy::new(Duration::from_secs(1), 5));
        assert_eq!(poller.wait_until_active(&cloud, &lb).await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_status_times_out_as_unknown() {
        let (cloud, lb) = setup().await;
        cloud.fail_status_reads(10);

        let poller = ConvergencePoller::new(PollPolicy::new(Duration::from_secs(1), 2));
        let err = poller.wait_until_active(&cloud, &lb).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::ConvergenceTimeout { ref last_status, .. } if last_status == "unknown"
        ));
    }
}

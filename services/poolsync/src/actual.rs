//! Actual-state resolution from the load balancer.

use poolsync_cloud::{LoadBalancer, LoadBalancerService, Node, NodeCondition};
use poolsync_reconcile::AddressSet;
use tracing::info;

use crate::context::SyncContext;
use crate::error::{Backend, SyncError};

/// Snapshot of a load balancer's node pool.
#[derive(Debug, Clone)]
pub struct ActualState {
    pub load_balancer: LoadBalancer,

    /// Every node, including draining ones.
    pub nodes: Vec<Node>,

    /// Addresses compared against desired state: `ENABLED` and `DISABLED`.
    pub comparable: AddressSet,

    pub enabled: AddressSet,
    pub disabled: AddressSet,

    /// Mid-transition; neither kept nor removed by a run.
    pub draining: AddressSet,
}

impl ActualState {
    pub fn from_nodes(load_balancer: LoadBalancer, nodes: Vec<Node>) -> Self {
        let mut enabled = AddressSet::new();
        let mut disabled = AddressSet::new();
        let mut draining = AddressSet::new();

        for node in &nodes {
            match node.condition {
                NodeCondition::Enabled => enabled.insert(&node.address),
                NodeCondition::Disabled => disabled.insert(&node.address),
                NodeCondition::Draining => draining.insert(&node.address),
            };
        }

        Self {
            comparable: enabled.union(&disabled),
            load_balancer,
            nodes,
            enabled,
            disabled,
            draining,
        }
    }

    /// `ENABLED`/`DISABLED` nodes bound to `address`.
    pub fn settled_nodes_at<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.condition.is_settled() && node.address == address)
    }
}

/// Look up the target load balancer and snapshot its nodes.
pub async fn resolve(
    service: &dyn LoadBalancerService,
    ctx: &SyncContext,
) -> Result<ActualState, SyncError> {
    let unavailable = |source| SyncError::BackendUnavailable {
        backend: Backend::LoadBalancer,
        region: ctx.region,
        source,
    };

    let load_balancer = service
        .find(ctx.load_balancer_id)
        .await
        .map_err(unavailable)?
        .ok_or(SyncError::LoadBalancerNotFound {
            id: ctx.load_balancer_id,
            region: ctx.region,
        })?;

    info!(
        lb_id = %load_balancer.id,
        name = %load_balancer.name,
        status = %load_balancer.status,
        port = load_balancer.port,
        "Found load balancer"
    );

    let nodes = service
        .list_nodes(&load_balancer)
        .await
        .map_err(unavailable)?;
    let state = ActualState::from_nodes(load_balancer, nodes);

    info!(
        lb_id = %state.load_balancer.id,
        enabled = %state.enabled,
        disabled = %state.disabled,
        draining = %state.draining,
        "Current load balancer nodes"
    );

    Ok(state)
}

//! Backend interfaces consumed by the sync engine.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{Instance, LoadBalancer, LoadBalancerId, NewNode, Node, NodeId, Region};

/// Lists compute instances with their tags and private addresses.
#[async_trait]
pub trait ComputeDirectory: Send + Sync {
    /// List every instance in `region`.
    async fn list_instances(&self, region: Region) -> Result<Vec<Instance>, BackendError>;
}

/// Owns load balancer node membership.
#[async_trait]
pub trait LoadBalancerService: Send + Sync {
    /// Look up a load balancer. Returns `Ok(None)` if it does not exist.
    async fn find(&self, id: LoadBalancerId) -> Result<Option<LoadBalancer>, BackendError>;

    /// List the nodes currently attached.
    async fn list_nodes(&self, lb: &LoadBalancer) -> Result<Vec<Node>, BackendError>;

    /// Attach a node.
    async fn add_node(&self, lb: &LoadBalancer, node: &NewNode) -> Result<Node, BackendError>;

    /// Detach a node.
    async fn remove_node(&self, lb: &LoadBalancer, node_id: NodeId) -> Result<(), BackendError>;

    /// Read the current status (`ACTIVE` once settled).
    async fn status(&self, lb: &LoadBalancer) -> Result<String, BackendError>;
}

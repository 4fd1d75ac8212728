//! In-memory backend for testing and development.
//!
//! Implements both [`ComputeDirectory`] and [`LoadBalancerService`] over a
//! mutex-guarded state. Every call is recorded so tests can assert on the
//! exact sequence of mutations and status reads.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{ComputeDirectory, LoadBalancerService};
use crate::error::BackendError;
use crate::model::{
    Instance, InstanceStatus, LoadBalancer, LoadBalancerId, NewNode, Node, NodeCondition, NodeId,
    Region,
};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListInstances(Region),
    Find(LoadBalancerId),
    ListNodes(LoadBalancerId),
    AddNode {
        lb: LoadBalancerId,
        address: String,
        port: u16,
    },
    RemoveNode {
        lb: LoadBalancerId,
        node: NodeId,
        address: String,
    },
    Status(LoadBalancerId),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::AddNode { .. } | Self::RemoveNode { .. })
    }
}

#[derive(Debug)]
struct LbState {
    lb: LoadBalancer,
    nodes: Vec<Node>,
    scripted_statuses: VecDeque<String>,
}

#[derive(Debug, Default)]
struct State {
    instances: BTreeMap<Region, Vec<Instance>>,
    load_balancers: BTreeMap<LoadBalancerId, LbState>,
    next_node_id: u64,
    failing_adds: BTreeSet<String>,
    failing_removes: BTreeSet<String>,
    compute_unavailable: bool,
    load_balancers_unavailable: bool,
    status_errors: u32,
    calls: Vec<Call>,
}

/// In-memory compute directory and load balancer service.
#[derive(Debug, Default)]
pub struct InMemoryCloud {
    state: Mutex<State>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an instance with a single private address.
    pub fn add_instance(
        &self,
        region: Region,
        id: &str,
        status: impl Into<InstanceStatus>,
        tags: &[(&str, &str)],
        private_address: &str,
    ) {
        self.insert_instance(
            region,
            Instance {
                id: id.to_string(),
                name: id.to_string(),
                status: status.into(),
                metadata: tags
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                private_addresses: vec![private_address.to_string()],
            },
        );
    }

    pub fn insert_instance(&self, region: Region, instance: Instance) {
        self.state()
            .instances
            .entry(region)
            .or_default()
            .push(instance);
    }

    /// Create a load balancer with status `ACTIVE`.
    pub fn add_load_balancer(&self, id: u64, port: u16) -> LoadBalancerId {
        let id = LoadBalancerId(id);
        self.state().load_balancers.insert(
            id,
            LbState {
                lb: LoadBalancer {
                    id,
                    name: format!("lb-{id}"),
                    port,
                    status: poolsync_reconcile::STABLE_STATUS.to_string(),
                },
                nodes: Vec::new(),
                scripted_statuses: VecDeque::new(),
            },
        );
        id
    }

    /// Attach a node directly, without recording a call.
    pub fn attach_node(&self, lb: LoadBalancerId, address: &str, condition: NodeCondition) -> NodeId {
        let mut state = self.state();
        state.next_node_id += 1;
        let id = NodeId(state.next_node_id);
        if let Some(entry) = state.load_balancers.get_mut(&lb) {
            let port = entry.lb.port;
            entry.nodes.push(Node {
                id,
                address: address.to_string(),
                port,
                condition,
            });
        }
        id
    }

    /// Statuses returned by the next status reads, in order. Once drained,
    /// the load balancer's own status is reported.
    pub fn script_statuses<I, S>(&self, lb: LoadBalancerId, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(entry) = self.state().load_balancers.get_mut(&lb) {
            entry
                .scripted_statuses
                .extend(statuses.into_iter().map(Into::into));
        }
    }

    /// Set the status reported once any scripted statuses are drained.
    pub fn set_status(&self, lb: LoadBalancerId, status: &str) {
        if let Some(entry) = self.state().load_balancers.get_mut(&lb) {
            entry.lb.status = status.to_string();
        }
    }

    /// Make adding a node with this address fail.
    pub fn fail_add(&self, address: &str) {
        self.state().failing_adds.insert(address.to_string());
    }

    /// Make removing nodes with this address fail.
    pub fn fail_remove(&self, address: &str) {
        self.state().failing_removes.insert(address.to_string());
    }

    /// Make the next `count` status reads fail with a transport error.
    pub fn fail_status_reads(&self, count: u32) {
        self.state().status_errors = count;
    }

    pub fn set_compute_unavailable(&self, unavailable: bool) {
        self.state().compute_unavailable = unavailable;
    }

    pub fn set_load_balancers_unavailable(&self, unavailable: bool) {
        self.state().load_balancers_unavailable = unavailable;
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Mutating calls made so far.
    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Nodes currently attached to `lb`.
    pub fn nodes(&self, lb: LoadBalancerId) -> Vec<Node> {
        self.state()
            .load_balancers
            .get(&lb)
            .map(|entry| entry.nodes.clone())
            .unwrap_or_default()
    }

    fn check_lb_available(state: &State) -> Result<(), BackendError> {
        if state.load_balancers_unavailable {
            return Err(BackendError::Transport(
                "load balancer service unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeDirectory for InMemoryCloud {
    async fn list_instances(&self, region: Region) -> Result<Vec<Instance>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::ListInstances(region));

        if state.compute_unavailable {
            return Err(BackendError::Transport(
                "compute directory unavailable".to_string(),
            ));
        }

        Ok(state.instances.get(&region).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LoadBalancerService for InMemoryCloud {
    async fn find(&self, id: LoadBalancerId) -> Result<Option<LoadBalancer>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::Find(id));
        Self::check_lb_available(&state)?;

        Ok(state.load_balancers.get(&id).map(|entry| entry.lb.clone()))
    }

    async fn list_nodes(&self, lb: &LoadBalancer) -> Result<Vec<Node>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::ListNodes(lb.id));
        Self::check_lb_available(&state)?;

        state
            .load_balancers
            .get(&lb.id)
            .map(|entry| entry.nodes.clone())
            .ok_or_else(|| BackendError::NotFound(format!("load balancer {}", lb.id)))
    }

    async fn add_node(&self, lb: &LoadBalancer, node: &NewNode) -> Result<Node, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::AddNode {
            lb: lb.id,
            address: node.address.clone(),
            port: node.port,
        });
        Self::check_lb_available(&state)?;

        if state.failing_adds.contains(&node.address) {
            return Err(BackendError::Rejected {
                status: 422,
                message: format!("node {} rejected", node.address),
            });
        }

        state.next_node_id += 1;
        let created = Node {
            id: NodeId(state.next_node_id),
            address: node.address.clone(),
            port: node.port,
            condition: node.condition,
        };

        let entry = state
            .load_balancers
            .get_mut(&lb.id)
            .ok_or_else(|| BackendError::NotFound(format!("load balancer {}", lb.id)))?;
        entry.nodes.push(created.clone());
        debug!(lb_id = %lb.id, node_id = %created.id, address = %created.address, "[MEMORY] Node added");

        Ok(created)
    }

    async fn remove_node(&self, lb: &LoadBalancer, node_id: NodeId) -> Result<(), BackendError> {
        let mut state = self.state();
        let address = state
            .load_balancers
            .get(&lb.id)
            .and_then(|entry| entry.nodes.iter().find(|n| n.id == node_id))
            .map(|n| n.address.clone())
            .unwrap_or_default();
        state.calls.push(Call::RemoveNode {
            lb: lb.id,
            node: node_id,
            address: address.clone(),
        });
        Self::check_lb_available(&state)?;

        if state.failing_removes.contains(&address) {
            return Err(BackendError::Rejected {
                status: 422,
                message: format!("node {node_id} could not be removed"),
            });
        }

        let entry = state
            .load_balancers
            .get_mut(&lb.id)
            .ok_or_else(|| BackendError::NotFound(format!("load balancer {}", lb.id)))?;
        let before = entry.nodes.len();
        entry.nodes.retain(|n| n.id != node_id);
        if entry.nodes.len() == before {
            return Err(BackendError::NotFound(format!("node {node_id}")));
        }
        debug!(lb_id = %lb.id, node_id = %node_id, "[MEMORY] Node removed");

        Ok(())
    }

    async fn status(&self, lb: &LoadBalancer) -> Result<String, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::Status(lb.id));
        Self::check_lb_available(&state)?;

        if state.status_errors > 0 {
            state.status_errors -= 1;
            return Err(BackendError::Transport("status read timed out".to_string()));
        }

        let entry = state
            .load_balancers
            .get_mut(&lb.id)
            .ok_or_else(|| BackendError::NotFound(format!("load balancer {}", lb.id)))?;

        Ok(entry
            .scripted_statuses
            .pop_front()
            .unwrap_or_else(|| entry.lb.status.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_remove_nodes() {
        let cloud = InMemoryCloud::new();
        let id = cloud.add_load_balancer(42, 80);
        let lb = cloud.find(id).await.unwrap().unwrap();

        let node = cloud
            .add_node(&lb, &NewNode::enabled("10.0.0.1", lb.port))
            .await
            .unwrap();
        assert_eq!(node.port, 80);
        assert_eq!(cloud.nodes(id).len(), 1);

        cloud.remove_node(&lb, node.id).await.unwrap();
        assert!(cloud.nodes(id).is_empty());
        assert_eq!(cloud.mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_statuses_then_default() {
        let cloud = InMemoryCloud::new();
        let id = cloud.add_load_balancer(42, 80);
        cloud.script_statuses(id, ["PENDING_UPDATE"]);
        let lb = cloud.find(id).await.unwrap().unwrap();

        assert_eq!(cloud.status(&lb).await.unwrap(), "PENDING_UPDATE");
        assert_eq!(cloud.status(&lb).await.unwrap(), "ACTIVE");
    }

    #[tokio::test]
    async fn test_unknown_load_balancer() {
        let cloud = InMemoryCloud::new();
        assert_eq!(cloud.find(LoadBalancerId(7)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let cloud = InMemoryCloud::new();
        let id = cloud.add_load_balancer(42, 80);
        let lb = cloud.find(id).await.unwrap().unwrap();
        cloud.fail_add("10.0.0.9");
        cloud.set_compute_unavailable(true);

        assert!(cloud
            .add_node(&lb, &NewNode::enabled("10.0.0.9", 80))
            .await
            .is_err());
        assert!(cloud.list_instances(Region::Lon).await.is_err());
    }
}

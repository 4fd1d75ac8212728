//! Load balancer service backed by the cloud load balancers API.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_for_response, token_headers};
use crate::backend::LoadBalancerService;
use crate::error::BackendError;
use crate::model::{LoadBalancer, LoadBalancerId, NewNode, Node, NodeCondition, NodeId};

#[derive(Debug, Deserialize)]
struct LoadBalancerEnvelope {
    #[serde(rename = "loadBalancer")]
    load_balancer: LoadBalancerDetail,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerDetail {
    id: u64,
    #[serde(default)]
    name: String,
    port: u16,
    status: String,
}

impl From<LoadBalancerDetail> for LoadBalancer {
    fn from(detail: LoadBalancerDetail) -> Self {
        Self {
            id: LoadBalancerId(detail.id),
            name: detail.name,
            port: detail.port,
            status: detail.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodesEnvelope {
    #[serde(default)]
    nodes: Vec<NodeDetail>,
}

#[derive(Debug, Deserialize)]
struct NodeDetail {
    id: u64,
    address: String,
    port: u16,
    condition: NodeCondition,
}

impl From<NodeDetail> for Node {
    fn from(detail: NodeDetail) -> Self {
        Self {
            id: NodeId(detail.id),
            address: detail.address,
            port: detail.port,
            condition: detail.condition,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddNodesRequest<'a> {
    nodes: [NodeSpec<'a>; 1],
}

#[derive(Debug, Serialize)]
struct NodeSpec<'a> {
    address: &'a str,
    port: u16,
    condition: NodeCondition,
    #[serde(rename = "type")]
    node_type: &'static str,
}

/// Cloud load balancers API client for one region.
#[derive(Debug, Clone)]
pub struct LoadBalancersClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
}

impl LoadBalancersClient {
    pub fn new(
        http: reqwest::Client,
        token: &str,
        base_url: &str,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            http,
            headers: token_headers(token)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn lb_url(&self, id: LoadBalancerId) -> String {
        format!("{}/loadbalancers/{}", self.base_url, id)
    }

    async fn fetch(&self, id: LoadBalancerId) -> Result<LoadBalancerDetail, BackendError> {
        let resp = self
            .http
            .get(self.lb_url(id))
            .headers(self.headers.clone())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for_response(resp, &format!("load balancer {id}")).await);
        }

        Ok(resp.json::<LoadBalancerEnvelope>().await?.load_balancer)
    }
}

#[async_trait]
impl LoadBalancerService for LoadBalancersClient {
    async fn find(&self, id: LoadBalancerId) -> Result<Option<LoadBalancer>, BackendError> {
        match self.fetch(id).await {
            Ok(detail) => Ok(Some(detail.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_nodes(&self, lb: &LoadBalancer) -> Result<Vec<Node>, BackendError> {
        let resp = self
            .http
            .get(format!("{}/nodes", self.lb_url(lb.id)))
            .headers(self.headers.clone())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for_response(resp, &format!("nodes of load balancer {}", lb.id)).await);
        }

        let nodes = resp.json::<NodesEnvelope>().await?.nodes;
        debug!(lb_id = %lb.id, node_count = nodes.len(), "Listed nodes");
        Ok(nodes.into_iter().map(Node::from).collect())
    }

    async fn add_node(&self, lb: &LoadBalancer, node: &NewNode) -> Result<Node, BackendError> {
        let body = AddNodesRequest {
            nodes: [NodeSpec {
                address: &node.address,
                port: node.port,
                condition: node.condition,
                node_type: "PRIMARY",
            }],
        };

        let resp = self
            .http
            .post(format!("{}/nodes", self.lb_url(lb.id)))
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for_response(resp, &format!("add node {}", node.address)).await);
        }

        resp.json::<NodesEnvelope>()
            .await?
            .nodes
            .into_iter()
            .next()
            .map(Node::from)
            .ok_or_else(|| BackendError::Decode("add node response listed no nodes".to_string()))
    }

    async fn remove_node(&self, lb: &LoadBalancer, node_id: NodeId) -> Result<(), BackendError> {
        let resp = self
            .http
            .delete(format!("{}/nodes/{}", self.lb_url(lb.id), node_id))
            .headers(self.headers.clone())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for_response(resp, &format!("remove node {node_id}")).await);
        }

        Ok(())
    }

    async fn status(&self, lb: &LoadBalancer) -> Result<String, BackendError> {
        Ok(self.fetch(lb.id).await?.status)
    }
}

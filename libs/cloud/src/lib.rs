//! # poolsync-cloud
//!
//! The two backends a pool sync run talks to:
//!
//! - A **compute directory** listing instances with their tags and private
//!   addresses ([`ComputeDirectory`]).
//! - A **load balancer** service owning the node pool ([`LoadBalancerService`]).
//!
//! Two implementations are provided: a REST client for Rackspace-style
//! clouds ([`rackspace`]) and an in-memory backend ([`InMemoryCloud`]) for
//! tests and local experiments.

mod backend;
mod credentials;
mod error;
mod memory;
mod model;
pub mod rackspace;

pub use backend::{ComputeDirectory, LoadBalancerService};
pub use credentials::{expand_home, ApiKey, Credentials, CredentialsError};
pub use error::BackendError;
pub use memory::{Call, InMemoryCloud};
pub use model::{
    Instance, InstanceStatus, LoadBalancer, LoadBalancerId, NewNode, Node, NodeCondition, NodeId,
    Region, UnknownRegion,
};

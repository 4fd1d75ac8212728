//! Instances, nodes and load balancers as seen by a sync run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cloud region hosting the instances and the load balancer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Ord,
    Dfw,
    #[default]
    Lon,
    Iad,
    Syd,
    Hkg,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Ord,
        Region::Dfw,
        Region::Lon,
        Region::Iad,
        Region::Syd,
        Region::Hkg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Ord => "ORD",
            Region::Dfw => "DFW",
            Region::Lon => "LON",
            Region::Iad => "IAD",
            Region::Syd => "SYD",
            Region::Hkg => "HKG",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`Region`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown region '{0}' (expected one of ORD, DFW, LON, IAD, SYD, HKG)")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == wanted)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

/// Lifecycle status of a compute instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Active,
    Other(String),
}

impl InstanceStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for InstanceStatus {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case("ACTIVE") {
            Self::Active
        } else {
            Self::Other(raw)
        }
    }
}

impl From<&str> for InstanceStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A compute instance, read-only to the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,

    /// Tag key to tag value.
    pub metadata: BTreeMap<String, String>,

    /// Private addresses in the order the directory reported them.
    pub private_addresses: Vec<String>,
}

impl Instance {
    /// The address used for pool membership: the first private address.
    pub fn primary_private_address(&self) -> Option<&str> {
        self.private_addresses.first().map(String::as_str)
    }
}

/// Traffic condition of a load balancer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeCondition {
    Enabled,
    Disabled,
    Draining,
}

impl NodeCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Draining => "DRAINING",
        }
    }

    /// Nodes that take part in the desired/actual comparison.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Enabled | Self::Disabled)
    }
}

impl fmt::Display for NodeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load balancer node identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node attached to a load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
}

/// Node creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
}

impl NewNode {
    /// An enabled node on `port`.
    pub fn enabled(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            condition: NodeCondition::Enabled,
        }
    }
}

/// Load balancer identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoadBalancerId(pub u64);

impl fmt::Display for LoadBalancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LoadBalancerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Handle to a load balancer found by [`crate::LoadBalancerService::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub id: LoadBalancerId,
    pub name: String,

    /// Port applied to every node created by a sync run.
    pub port: u16,

    /// Status at lookup time.
    pub status: String,
}

impl LoadBalancer {
    pub fn is_active(&self) -> bool {
        self.status == poolsync_reconcile::STABLE_STATUS
    }
}

//! Sync run error taxonomy.

use std::fmt;

use poolsync_cloud::{BackendError, LoadBalancerId, Region};
use thiserror::Error;

/// Backend a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Identity,
    ComputeDirectory,
    LoadBalancer,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Identity => "identity service",
            Backend::ComputeDirectory => "compute directory",
            Backend::LoadBalancer => "load balancer service",
        })
    }
}

/// Kind of node mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Remove,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mutation::Add => "add",
            Mutation::Remove => "remove",
        })
    }
}

/// Errors raised by a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A backend could not be reached or refused a read.
    #[error("{backend} unavailable (region={region}): {source}")]
    BackendUnavailable {
        backend: Backend,
        region: Region,
        #[source]
        source: BackendError,
    },

    /// Desired state came out empty.
    #[error("{}", no_instances_message(.region, .scanned, .selector))]
    NoInstancesFound {
        region: Region,

        /// Instances listed in the region before filtering.
        scanned: usize,

        /// Rendered selection predicate.
        selector: String,
    },

    /// The target load balancer does not exist.
    #[error("no load balancer with id {id} found in region {region}")]
    LoadBalancerNotFound { id: LoadBalancerId, region: Region },

    /// The load balancer did not settle after a mutation.
    #[error("{}", timeout_message(.id, .attempts, .last_status, .prior_failures))]
    ConvergenceTimeout {
        id: LoadBalancerId,
        last_status: String,
        attempts: u32,

        /// Mutations already rejected earlier in the same run.
        prior_failures: usize,
    },

    /// A single add or remove was rejected.
    #[error("failed to {operation} node {address} on load balancer {id}: {source}")]
    MutationFailed {
        operation: Mutation,
        id: LoadBalancerId,
        address: String,
        #[source]
        source: BackendError,
    },
}

fn no_instances_message(region: &Region, scanned: &usize, selector: &str) -> String {
    if *scanned == 0 {
        format!("no servers found in region {region}")
    } else {
        format!(
            "none of the {scanned} servers in region {region} are ACTIVE with a private address and match {selector}"
        )
    }
}

fn timeout_message(
    id: &LoadBalancerId,
    attempts: &u32,
    last_status: &str,
    prior_failures: &usize,
) -> String {
    let message = format!(
        "load balancer {id} did not reach ACTIVE after {attempts} status checks (last status: {last_status})"
    );
    match *prior_failures {
        0 => message,
        1 => format!("{message}; 1 earlier node change had already failed"),
        n => format!("{message}; {n} earlier node changes had already failed"),
    }
}

impl SyncError {
    /// Record how many mutations failed before a convergence timeout.
    pub fn with_prior_failures(self, failures: usize) -> Self {
        match self {
            Self::ConvergenceTimeout {
                id,
                last_status,
                attempts,
                ..
            } => Self::ConvergenceTimeout {
                id,
                last_status,
                attempts,
                prior_failures: failures,
            },
            other => other,
        }
    }

    /// Errors after which the rest of the run must not continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MutationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_instances_message() {
        let empty = SyncError::NoInstancesFound {
            region: Region::Lon,
            scanned: 0,
            selector: "MyGroup0=clb0".to_string(),
        };
        assert_eq!(empty.to_string(), "no servers found in region LON");

        let unmatched = SyncError::NoInstancesFound {
            region: Region::Ord,
            scanned: 4,
            selector: "MyGroup0=clb0".to_string(),
        };
        assert!(unmatched.to_string().contains("4 servers in region ORD"));
        assert!(unmatched.to_string().contains("MyGroup0=clb0"));
    }

    #[test]
    fn test_mutation_failure_is_not_fatal() {
        let err = SyncError::MutationFailed {
            operation: Mutation::Add,
            id: LoadBalancerId(42),
            address: "10.0.0.1".to_string(),
            source: BackendError::Rejected {
                status: 422,
                message: "immutable".to_string(),
            },
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("10.0.0.1"));

        let timeout = SyncError::ConvergenceTimeout {
            id: LoadBalancerId(42),
            last_status: "PENDING_UPDATE".to_string(),
            attempts: 3,
            prior_failures: 0,
        };
        assert!(timeout.is_fatal());
        assert!(!timeout.to_string().contains("earlier"));

        let after_failures = timeout.with_prior_failures(2);
        assert!(after_failures
            .to_string()
            .ends_with("2 earlier node changes had already failed"));
    }
}

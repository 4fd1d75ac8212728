//! Desired-state resolution from the compute directory.

use poolsync_cloud::ComputeDirectory;
use poolsync_reconcile::{AddressSet, SelectionPredicate};
use tracing::{debug, info, warn};

use crate::context::SyncContext;
use crate::error::{Backend, SyncError};

/// Private addresses of `ACTIVE` instances matching `predicate`.
///
/// An instance with several private addresses contributes the first one the
/// directory reports. An empty result is an error: an empty region or a
/// selector that matches nothing must never drain the pool.
pub async fn resolve(
    directory: &dyn ComputeDirectory,
    ctx: &SyncContext,
    predicate: &SelectionPredicate,
) -> Result<AddressSet, SyncError> {
    let instances =
        directory
            .list_instances(ctx.region)
            .await
            .map_err(|source| SyncError::BackendUnavailable {
                backend: Backend::ComputeDirectory,
                region: ctx.region,
                source,
            })?;

    let scanned = instances.len();
    let no_instances = || SyncError::NoInstancesFound {
        region: ctx.region,
        scanned,
        selector: predicate.to_string(),
    };

    if instances.is_empty() {
        return Err(no_instances());
    }

    let mut desired = AddressSet::new();
    for instance in &instances {
        if !instance.status.is_active() {
            debug!(instance_id = %instance.id, status = %instance.status, "Skipping instance that is not ACTIVE");
            continue;
        }

        if !predicate.matches(&instance.metadata) {
            continue;
        }

        match instance.primary_private_address() {
            Some(address) => {
                desired.insert(address);
            }
            None => {
                warn!(
                    instance_id = %instance.id,
                    name = %instance.name,
                    "Matching instance has no private address"
                );
            }
        }
    }

    info!(
        region = %ctx.region,
        selector = %predicate,
        scanned,
        addresses = %desired,
        "Cloud servers matching metadata"
    );

    if desired.is_empty() {
        return Err(no_instances());
    }

    Ok(desired)
}

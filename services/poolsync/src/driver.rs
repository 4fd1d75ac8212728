//! Top-level driver shared by both binaries: credentials, authentication,
//! per-run logging and the mapping from failures to process exit codes.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use poolsync_cloud::rackspace::Session;
use poolsync_cloud::{
    expand_home, ComputeDirectory, Credentials, CredentialsError, LoadBalancerId,
    LoadBalancerService,
};
use poolsync_reconcile::{PredicateError, SelectionPredicate};
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info};

use crate::cli::{CommonArgs, DaemonCli, SyncCli};
use crate::cycle::{CycleReport, SyncCycle};
use crate::daemon::{self, DaemonStats};
use crate::error::{Backend, SyncError};
use crate::logging::{build_dispatch, LogSetupError};

/// Exit code for failures without a more specific code.
pub const EXIT_FAILURE: i32 = 1;

/// Failures reported to the operator.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    LogSetup(#[from] LogSetupError),

    #[error("credentials file '{}' not found", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid selection: {0}")]
    Selection(#[from] PredicateError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{failed} of {attempted} node changes failed on load balancer {id}")]
    MutationsFailed {
        id: LoadBalancerId,
        failed: usize,
        attempted: usize,
    },
}

impl DriverError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CredentialsNotFound(_) => 2,
            Self::Sync(err) => sync_exit_code(err),
            Self::LogSetup(_)
            | Self::Authentication(_)
            | Self::Selection(_)
            | Self::MutationsFailed { .. } => EXIT_FAILURE,
        }
    }
}

fn sync_exit_code(err: &SyncError) -> i32 {
    match err {
        SyncError::NoInstancesFound { .. } => 3,
        SyncError::LoadBalancerNotFound { .. } => 4,
        _ => EXIT_FAILURE,
    }
}

/// Exit code for an error returned by [`run_sync`] or [`run_daemon`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(driver) = err.downcast_ref::<DriverError>() {
        return driver.exit_code();
    }
    err.downcast_ref::<SyncError>()
        .map(sync_exit_code)
        .unwrap_or(EXIT_FAILURE)
}

/// Backends a sync cycle talks to.
#[derive(Clone)]
pub struct Backends {
    pub directory: Arc<dyn ComputeDirectory>,
    pub load_balancers: Arc<dyn LoadBalancerService>,
}

/// Load credentials and open authenticated clients for the chosen region.
pub async fn connect(args: &CommonArgs) -> Result<Backends, DriverError> {
    let path = expand_home(&args.credfile);
    let credentials = Credentials::load(&path).map_err(|e| match e {
        CredentialsError::NotFound(path) => DriverError::CredentialsNotFound(path),
        CredentialsError::Invalid { .. } => DriverError::Authentication(e.to_string()),
    })?;

    if let Some(file_region) = credentials.region.filter(|r| *r != args.region) {
        debug!(
            file_region = %file_region,
            region = %args.region,
            "Ignoring credentials file region in favour of the command line"
        );
    }

    let session = Session::authenticate(&args.identity_url, &credentials, args.internal_endpoints)
        .await
        .map_err(|source| {
            if source.is_auth() {
                DriverError::Authentication(source.to_string())
            } else {
                SyncError::BackendUnavailable {
                    backend: Backend::Identity,
                    region: args.region,
                    source,
                }
                .into()
            }
        })?;

    let servers = session.servers().map_err(|source| SyncError::BackendUnavailable {
        backend: Backend::ComputeDirectory,
        region: args.region,
        source,
    })?;
    let load_balancers =
        session
            .load_balancers(args.region)
            .map_err(|source| SyncError::BackendUnavailable {
                backend: Backend::LoadBalancer,
                region: args.region,
                source,
            })?;

    Ok(Backends {
        directory: Arc::new(servers),
        load_balancers: Arc::new(load_balancers),
    })
}

async fn sync_once(
    args: &CommonArgs,
    predicate: &SelectionPredicate,
) -> Result<CycleReport, DriverError> {
    let backends = connect(args).await?;
    let cycle = SyncCycle::new(backends.directory, backends.load_balancers, args.context());
    let report = cycle.run(predicate).await?;

    if !report.is_success() {
        return Err(DriverError::MutationsFailed {
            id: args.load_balancer_id(),
            failed: report.applied.failures.len(),
            attempted: report.applied.attempted(),
        });
    }

    Ok(report)
}

fn log_failure(err: &DriverError) {
    error!(error = %err, exit_code = err.exit_code(), "Sync failed");
}

/// Run one sync cycle for `clb-sync`.
pub async fn run_sync(cli: &SyncCli) -> anyhow::Result<CycleReport> {
    let predicate = cli.predicate().map_err(DriverError::from)?;
    let dispatch = build_dispatch(&cli.log_config()).map_err(DriverError::from)?;

    let outcome = async {
        let result = sync_once(&cli.common, &predicate).await;
        if let Err(e) = &result {
            log_failure(e);
        }
        result
    }
    .with_subscriber(dispatch)
    .await;

    Ok(outcome?)
}

/// Run `clb-syncd` until `shutdown` flips, or a single cycle with `--once`.
pub async fn run_daemon(
    cli: &DaemonCli,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<DaemonStats> {
    let dispatch = build_dispatch(&cli.log_config()).map_err(DriverError::from)?;

    let outcome = async {
        if cli.once {
            let result = sync_once(&cli.common, &cli.meta).await.map(|_| DaemonStats {
                cycles: 1,
                failed_cycles: 0,
            });
            if let Err(e) = &result {
                log_failure(e);
            }
            return result;
        }

        // TODO: re-authenticate when the identity token expires instead of
        // relying on the service restarting the daemon.
        let backends = connect(&cli.common).await.inspect_err(log_failure)?;
        let cycle = SyncCycle::new(
            backends.directory,
            backends.load_balancers,
            cli.common.context(),
        );
        let stats = daemon::run_daemon(&cycle, &cli.meta, cli.interval(), shutdown).await?;
        info!(
            cycles = stats.cycles,
            failed_cycles = stats.failed_cycles,
            "Sync loop stopped"
        );
        Ok(stats)
    }
    .with_subscriber(dispatch)
    .await;

    Ok(outcome?)
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let Some(driver) = err.downcast_ref::<DriverError>() else {
        return;
    };

    let hint = match driver {
        DriverError::CredentialsNotFound(_) => Some(
            "Hint: The credentials file should look like:\n\n\
             [rackspace_cloud]\n\
             username = myusername\n\
             api_key = 01234567890abcdef",
        ),
        DriverError::Authentication(_) => {
            Some("Hint: Check the username and api_key in your credentials file.")
        }
        DriverError::LogSetup(_) => {
            Some("Hint: Pass a writable directory with -p/--logpath.")
        }
        DriverError::Sync(SyncError::LoadBalancerNotFound { .. }) => {
            Some("Hint: Check the load balancer ID and the -r/--region flag.")
        }
        DriverError::Sync(SyncError::BackendUnavailable { .. }) => {
            Some("Hint: Check your network connection and the identity endpoint.")
        }
        _ => None,
    };

    if let Some(hint) = hint {
        eprintln!("\n{}", hint.yellow());
    }
}

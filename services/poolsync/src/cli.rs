//! Command-line arguments for `clb-sync` and `clb-syncd`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use poolsync_cloud::rackspace::DEFAULT_IDENTITY_URL;
use poolsync_cloud::{LoadBalancerId, Region};
use poolsync_reconcile::{
    PollPolicy, PredicateError, SelectionPredicate, DEFAULT_POLL_ATTEMPTS,
};

use crate::context::SyncContext;
use crate::logging::LogConfig;

/// Flags shared by both binaries.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Region hosting the servers and the load balancer.
    #[arg(short = 'r', long, env = "POOLSYNC_REGION", default_value = "LON", value_name = "REGION")]
    pub region: Region,

    /// Cloud load balancer ID.
    #[arg(short = 'i', long = "clbid", env = "POOLSYNC_CLB_ID", value_name = "CLB_ID")]
    pub clb_id: u64,

    /// Location of the API credentials file.
    #[arg(
        short = 'c',
        long = "credfile",
        env = "POOLSYNC_CREDENTIALS_FILE",
        default_value = "~/.rackspace_cloud_credentials",
        value_name = "CREDENTIALS_FILE"
    )]
    pub credfile: String,

    /// Turn on debug verbosity.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Identity endpoint used to exchange credentials for a token.
    #[arg(long, env = "POOLSYNC_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL)]
    pub identity_url: String,

    /// Prefer service-net endpoints from the service catalog.
    #[arg(long, env = "POOLSYNC_INTERNAL_ENDPOINTS")]
    pub internal_endpoints: bool,

    /// Seconds between load balancer status checks after a change.
    #[arg(long, default_value_t = 1, value_name = "SECONDS")]
    pub poll_interval: u64,

    /// Status checks before giving up on the load balancer settling.
    #[arg(
        long,
        default_value_t = DEFAULT_POLL_ATTEMPTS,
        value_name = "COUNT",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub poll_attempts: u32,

    /// Log the planned changes without applying them.
    #[arg(long)]
    pub dry_run: bool,
}

impl CommonArgs {
    pub fn load_balancer_id(&self) -> LoadBalancerId {
        LoadBalancerId(self.clb_id)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval), self.poll_attempts)
    }

    pub fn context(&self) -> SyncContext {
        SyncContext::new(self.region, self.load_balancer_id())
            .with_poll(self.poll_policy())
            .with_dry_run(self.dry_run)
    }
}

/// Automatically update load balancer nodes.
#[derive(Debug, Clone, Parser)]
#[command(name = "clb-sync", author, version, about, long_about = None)]
pub struct SyncCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Metadata key the desired servers carry.
    #[arg(long = "metakey", visible_alias = "meta-key", default_value = "MyGroup0", value_name = "META_KEY")]
    pub metakey: String,

    /// Metadata value the desired servers carry.
    #[arg(long = "metavalue", visible_alias = "meta-value", default_value = "clb0", value_name = "META_VALUE")]
    pub metavalue: String,

    /// Directory to create log files in.
    #[arg(short = 'p', long = "logpath", env = "POOLSYNC_LOG_DIR", default_value = "/var/log/", value_name = "LOG_DIRECTORY")]
    pub logpath: PathBuf,
}

impl SyncCli {
    pub fn predicate(&self) -> Result<SelectionPredicate, PredicateError> {
        SelectionPredicate::single(&self.metakey, &self.metavalue)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(&self.logpath, "clb-sync", self.common.verbose)
    }
}

/// Keep load balancer nodes in sync with tagged servers.
#[derive(Debug, Clone, Parser)]
#[command(name = "clb-syncd", author, version, about, long_about = None)]
pub struct DaemonCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Metadata identifying pool members, as {"key": "value", ...}.
    #[arg(
        short = 'm',
        long = "meta",
        env = "POOLSYNC_META",
        default_value = r#"{"MyGroup0":"clb0"}"#,
        value_name = "METADATA_DICTIONARY"
    )]
    pub meta: SelectionPredicate,

    /// Directory to create log files in.
    #[arg(short = 'p', long = "logpath", env = "POOLSYNC_LOG_DIR", default_value = "/var/log/lsyncd/", value_name = "LOG_DIRECTORY")]
    pub logpath: PathBuf,

    /// Seconds between sync cycles.
    #[arg(long, default_value_t = 30, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,
}

impl DaemonCli {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(&self.logpath, "clb-syncd", self.common.verbose)
    }
}

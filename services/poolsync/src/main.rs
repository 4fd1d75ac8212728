//! clb-sync - one-shot load balancer pool sync
//!
//! Adds ACTIVE servers tagged with the given metadata to a cloud load
//! balancer and removes nodes whose servers are gone or no longer tagged.

use clap::Parser;

use poolsync::cli::SyncCli;
use poolsync::driver;

#[tokio::main]
async fn main() {
    let cli = SyncCli::parse();

    if let Err(e) = driver::run_sync(&cli).await {
        driver::print_error(&e);
        std::process::exit(driver::exit_code(&e));
    }
}

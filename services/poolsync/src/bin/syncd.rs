//! clb-syncd - keeps a cloud load balancer's pool in sync on a timer.

use clap::Parser;
use tokio::sync::watch;

use poolsync::cli::DaemonCli;
use poolsync::driver;

#[tokio::main]
async fn main() {
    let cli = DaemonCli::parse();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("Received shutdown signal, finishing current cycle");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Without a signal handler the loop runs until killed.
                eprintln!("Unable to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    });

    if let Err(e) = driver::run_daemon(&cli, shutdown_rx).await {
        driver::print_error(&e);
        std::process::exit(driver::exit_code(&e));
    }
}

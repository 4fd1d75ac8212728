//! Log output for a run.
//!
//! A run owns its subscriber: [`build_dispatch`] returns a
//! [`tracing::Dispatch`] that the binaries attach to the run future, so
//! nothing is installed process-wide.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Errors setting up log output.
#[derive(Debug, Error)]
pub enum LogSetupError {
    #[error("unable to write to log file directory '{}': {source}", dir.display())]
    Unwritable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Directory receiving `<file_stem>.log`.
    pub dir: PathBuf,

    pub file_stem: String,

    /// Debug level instead of warn.
    pub verbose: bool,
}

impl LogConfig {
    pub fn new(dir: impl Into<PathBuf>, file_stem: impl Into<String>, verbose: bool) -> Self {
        Self {
            dir: dir.into(),
            file_stem: file_stem.into(),
            verbose,
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.file_stem))
    }

    fn default_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

fn open_log_file(dir: &Path, path: &Path) -> Result<File, LogSetupError> {
    if !dir.is_dir() {
        return Err(LogSetupError::Unwritable {
            dir: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogSetupError::Unwritable {
            dir: dir.to_path_buf(),
            source,
        })
}

/// Build the run's subscriber: human-readable lines on stderr and JSON lines
/// in the log file. `RUST_LOG` overrides the level chosen by `verbose`.
pub fn build_dispatch(config: &LogConfig) -> Result<Dispatch, LogSetupError> {
    let file = open_log_file(&config.dir, &config.file_path())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        );

    Ok(Dispatch::new(subscriber))
}

//! Tracing setup
//!
//! The dashboard owns the terminal, so log output never goes to stdout or
//! stderr. It goes to a file when one is configured and is dropped otherwise.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KUBEDASH_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Once one is installed, later calls keep it
/// and only note the attempt in its log.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let installed = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::sink)
            .try_init(),
    };
    if let Err(e) = installed {
        debug!(error = %e, "keeping existing tracing subscriber");
    }
    Ok(())
}

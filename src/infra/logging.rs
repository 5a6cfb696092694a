use crate::infra::log_file_path;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitLoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: String, source: io::Error },

    #[error("failed to open log file {path}: {source}")]
    OpenFile { path: String, source: io::Error },
}

/// Routes `tracing` output to `<state_dir>/minicrm.log`. The terminal belongs
/// to the TUI, so nothing is written to stdout or stderr. `RUST_LOG` controls
/// the filter (default `info`).
pub fn init_file_logging(state_dir: &Path) -> Result<(), InitLoggingError> {
    fs::create_dir_all(state_dir).map_err(|source| InitLoggingError::CreateDir {
        path: state_dir.display().to_string(),
        source,
    })?;

    let log_path = log_file_path(state_dir);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| InitLoggingError::OpenFile {
            path: log_path.display().to_string(),
            source,
        })?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    Ok(())
}

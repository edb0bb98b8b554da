//! Error types for the backup runner.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Failed to list remote directory {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: Box<BackupError>,
    },

    #[error("Failed to fetch remote file {}: {source}", path.display())]
    Fetch {
        path: PathBuf,
        #[source]
        source: Box<BackupError>,
    },

    #[error("Remote command `{command}` exited with status {status}: {stderr}")]
    RemoteCommand {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Interrupted")]
    Interrupted,
}

impl BackupError {
    /// Fatal errors abort the whole run; everything else only aborts the
    /// host being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackupError::Config(_) | BackupError::Parse(_) | BackupError::Interrupted
        )
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

//! Remote Backup Library
//!
//! Pulls incremental file-tree and MySQL backups from remote hosts over
//! SSH/SFTP into a dated local archive, pruning dumps past their retention.

pub mod config;
pub mod daemon;
pub mod database;
pub mod executor;
pub mod fs;
pub mod remote;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BackupRunner, RunOptions, RunSummary};
pub use utils::errors::{BackupError, Result};

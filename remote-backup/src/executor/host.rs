//! Backup of a single host.
//!
//! One SSH session is opened per host and shared by all of its entries.
//! File entries run first, then database entries, each in configured order.

use crate::config::{DatabaseEntryConfig, FileEntryConfig, HostConfig};
use crate::database::{self, DumpedDatabase};
use crate::fs::take_snapshot;
use crate::remote::{Connector, RemoteSession, SessionGuard, SessionSlot};
use crate::sync::{apply_plan, plan_sync, SyncStats};
use crate::utils::errors::{BackupError, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Per-run settings shared by every host
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Plan only: list and compare, but write nothing locally
    pub dry_run: bool,

    /// Restrict the run to these host ids (empty = all)
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FileEntryReport {
    pub entry: String,
    pub remote_dirs: usize,
    pub remote_files: usize,
    pub planned_pulls: usize,
    pub stats: SyncStats,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseEntryReport {
    pub entry: String,
    pub pruned: Vec<String>,
    pub databases: Vec<String>,
    pub dumped: Vec<DumpedDatabase>,
}

#[derive(Debug, Clone, Default)]
pub struct HostReport {
    pub host: String,
    pub files: Vec<FileEntryReport>,
    pub databases: Vec<DatabaseEntryReport>,
}

pub fn file_entry_dir(host_dir: &Path, entry: &FileEntryConfig) -> PathBuf {
    host_dir.join(format!("files_{}", entry.id()))
}

pub fn database_entry_dir(host_dir: &Path, entry: &DatabaseEntryConfig) -> PathBuf {
    host_dir.join(format!("mysql_{}", entry.id()))
}

/// Back up every entry of `host`. The session is closed when this returns,
/// whether it succeeded or not.
pub fn run_host(
    connector: &dyn Connector,
    host: &HostConfig,
    output_dir: &Path,
    options: &RunOptions,
    cancel: &CancellationToken,
    slot: &SessionSlot,
) -> Result<HostReport> {
    info!("Host: {}", host.id());

    let host_dir = output_dir.join(host.id());
    if !options.dry_run {
        fs::create_dir_all(&host_dir)?;
    }

    info!(address = %host.host, port = host.port, "SSH connecting...");
    let guard = SessionGuard::new(connector.connect(host)?, slot);
    info!("SSH connected.");

    let mut report = HostReport {
        host: host.id().to_string(),
        ..Default::default()
    };

    for entry in &host.files {
        if cancel.is_cancelled() {
            return Err(BackupError::Interrupted);
        }
        let entry_report = run_file_entry(guard.session(), &host_dir, entry, options, cancel)?;
        report.files.push(entry_report);
    }

    for entry in &host.mysql {
        if cancel.is_cancelled() {
            return Err(BackupError::Interrupted);
        }
        let entry_report = run_database_entry(guard.session(), &host_dir, entry, options, cancel)?;
        report.databases.push(entry_report);
    }

    Ok(report)
}

/// Snapshot the remote tree, then pull whatever changed.
pub fn run_file_entry(
    session: &dyn RemoteSession,
    host_dir: &Path,
    entry: &FileEntryConfig,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<FileEntryReport> {
    let remote_root = entry
        .remote_path
        .as_deref()
        .ok_or_else(|| BackupError::Config(format!("files entry {} has no remote_path", entry.id())))?;
    let local_root = file_entry_dir(host_dir, entry);

    info!(entry = entry.id(), remote = %remote_root.display(), "[files] {}", entry.id());

    let snapshot = take_snapshot(session, remote_root)?;
    info!(
        "{} directories and {} files to process.",
        snapshot.dirs.len(),
        snapshot.files.len()
    );

    let plan = plan_sync(&snapshot, &local_root)?;
    info!(
        pulls = plan.pull.len(),
        bytes = plan.pull_bytes(),
        unchanged = plan.unchanged_files,
        "Sync planned"
    );

    let stats = if options.dry_run {
        for file in &plan.pull {
            info!(path = %file.path.display(), bytes = file.size, "Would pull file");
        }
        SyncStats::default()
    } else {
        apply_plan(session, remote_root, &local_root, &plan, cancel)?
    };

    Ok(FileEntryReport {
        entry: entry.id().to_string(),
        remote_dirs: snapshot.dirs.len(),
        remote_files: snapshot.files.len(),
        planned_pulls: plan.pull.len(),
        stats,
    })
}

/// Prune expired dump directories, then dump every database into today's.
pub fn run_database_entry(
    session: &dyn RemoteSession,
    host_dir: &Path,
    entry: &DatabaseEntryConfig,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<DatabaseEntryReport> {
    info!(entry = entry.id(), "[mysql] {}", entry.id());

    let entry_dir = database_entry_dir(host_dir, entry);
    let now = Local::now();

    let pruned = database::prune(&entry_dir, entry.days_to_keep, now.naive_local(), options.dry_run)?;

    let databases = database::list_databases(session, entry)?;
    info!("{} databases to process.", databases.len());

    let dumped = if options.dry_run {
        for name in &databases {
            info!(database = %name, "Would dump database");
        }
        Vec::new()
    } else {
        let bucket_dir = entry_dir.join(database::bucket_name(&now));
        database::dump_databases(session, entry, &databases, &bucket_dir, cancel)?
    };

    Ok(DatabaseEntryReport {
        entry: entry.id().to_string(),
        pruned: pruned.into_iter().map(|b| b.name).collect(),
        databases,
        dumped,
    })
}

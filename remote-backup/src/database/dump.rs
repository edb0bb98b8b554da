//! Database dumps over the remote session.

use super::command::{dump_command, filter_databases, list_databases_command};
use crate::config::DatabaseEntryConfig;
use crate::remote::{RemoteCommand, RemoteSession};
use crate::utils::errors::{BackupError, Result};
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Result of dumping one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedDatabase {
    pub name: String,
    pub path: PathBuf,
    /// Uncompressed SQL bytes received
    pub bytes: u64,
}

/// Dated directory name for a dump run
pub fn bucket_name(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d").to_string()
}

/// File name of one database dump
pub fn dump_file_name(now: &DateTime<Local>, database: &str) -> String {
    format!("{}_{}.sql.gz", now.format("%Y%m%d_%H%M%S"), database)
}

/// Ask the server which databases to dump, minus the excluded ones.
pub fn list_databases(session: &dyn RemoteSession, entry: &DatabaseEntryConfig) -> Result<Vec<String>> {
    let command = list_databases_command(entry);
    let mut stdout = Vec::new();
    run_checked(session, &command, &mut stdout)?;

    Ok(filter_databases(
        &String::from_utf8_lossy(&stdout),
        &entry.exclude,
    ))
}

/// Dump every listed database, one after another, into `bucket_dir`.
pub fn dump_databases(
    session: &dyn RemoteSession,
    entry: &DatabaseEntryConfig,
    databases: &[String],
    bucket_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<DumpedDatabase>> {
    fs::create_dir_all(bucket_dir)?;

    let mut dumped = Vec::with_capacity(databases.len());
    for database in databases {
        if cancel.is_cancelled() {
            return Err(BackupError::Interrupted);
        }

        info!(database = %database, "Pulling database");
        let path = bucket_dir.join(dump_file_name(&Local::now(), database));
        let bytes = dump_database(session, entry, database, &path)?;
        info!(database = %database, bytes, path = %path.display(), "Database dumped");

        dumped.push(DumpedDatabase {
            name: database.clone(),
            path,
            bytes,
        });
    }

    Ok(dumped)
}

/// Stream one `mysqldump` into a gzip file at `path`.
pub fn dump_database(
    session: &dyn RemoteSession,
    entry: &DatabaseEntryConfig,
    database: &str,
    path: &Path,
) -> Result<u64> {
    let command = dump_command(entry, database);
    let file = File::create(path)?;
    let mut encoder = CountingWriter::new(GzEncoder::new(BufWriter::new(file), Compression::default()));

    run_checked(session, &command, &mut encoder)?;

    let bytes = encoder.count;
    let mut writer = encoder.inner.finish()?;
    writer.flush()?;
    Ok(bytes)
}

fn run_checked(session: &dyn RemoteSession, command: &RemoteCommand, stdout: &mut dyn Write) -> Result<()> {
    let output = session.exec(command, stdout)?;
    if !output.success() {
        return Err(BackupError::RemoteCommand {
            command: command.redacted(),
            status: output.exit_status,
            stderr: output.stderr,
        });
    }
    Ok(())
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

//! Retention of dated dump directories.
//!
//! Each database entry keeps one `YYYYMMDD` directory per day a dump was
//! taken. Directories older than the retention window are removed.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SECONDS_PER_DAY: i64 = 86_400;

/// A dated dump directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionBucket {
    pub path: PathBuf,
    pub name: String,
    /// Local midnight of the bucket's date
    pub timestamp: NaiveDateTime,
}

/// Parse a bucket name. Only exactly eight digits forming a valid date count.
pub fn parse_bucket_date(name: &str) -> Option<NaiveDate> {
    if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(name, "%Y%m%d").ok()
}

/// List the dated directories directly under `root`. Other entries are ignored.
pub fn list_buckets(root: &Path) -> io::Result<Vec<RetentionBucket>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut buckets = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(date) = parse_bucket_date(&name) else {
            continue;
        };

        buckets.push(RetentionBucket {
            path: entry.path().to_path_buf(),
            name,
            timestamp: date.and_time(chrono::NaiveTime::MIN),
        });
    }

    Ok(buckets)
}

/// Buckets strictly older than `now - days_to_keep` days. A zero retention
/// never expires anything, and neither does a window reaching back past the
/// earliest representable date.
pub fn expired_buckets(
    buckets: Vec<RetentionBucket>,
    days_to_keep: u32,
    now: NaiveDateTime,
) -> Vec<RetentionBucket> {
    if days_to_keep == 0 {
        return Vec::new();
    }

    let Some(cutoff) = TimeDelta::try_seconds(i64::from(days_to_keep) * SECONDS_PER_DAY)
        .and_then(|window| now.checked_sub_signed(window))
    else {
        return Vec::new();
    };

    buckets
        .into_iter()
        .filter(|bucket| bucket.timestamp < cutoff)
        .collect()
}

/// Remove expired buckets under `root`. With `dry_run` nothing is deleted.
/// Returns the buckets that were (or would have been) removed.
pub fn prune(
    root: &Path,
    days_to_keep: u32,
    now: NaiveDateTime,
    dry_run: bool,
) -> io::Result<Vec<RetentionBucket>> {
    if days_to_keep == 0 {
        return Ok(Vec::new());
    }

    let expired = expired_buckets(list_buckets(root)?, days_to_keep, now);
    for bucket in &expired {
        if dry_run {
            tracing::info!(bucket = %bucket.name, "Would clean expired dumps");
            continue;
        }
        fs::remove_dir_all(&bucket.path)?;
        tracing::info!(bucket = %bucket.name, "Cleaned expired dumps");
    }

    Ok(expired)
}

//! Applying a sync plan to the local archive.

use super::plan::SyncPlan;
use crate::remote::RemoteSession;
use crate::utils::errors::{BackupError, Result};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Outcome of applying a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created_dirs: usize,
    pub pulled_files: usize,
    pub pulled_bytes: u64,
}

/// Create the planned directories, then pull the planned files.
///
/// Transfers overwrite in place. A failure mid-transfer leaves a partial
/// file behind; the next run re-pulls it because its size will not match.
pub fn apply_plan(
    session: &dyn RemoteSession,
    remote_root: &Path,
    local_root: &Path,
    plan: &SyncPlan,
    cancel: &CancellationToken,
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    fs::create_dir_all(local_root)?;
    for dir in &plan.create_dirs {
        fs::create_dir_all(local_root.join(dir))?;
        stats.created_dirs += 1;
    }

    for file in &plan.pull {
        if cancel.is_cancelled() {
            return Err(BackupError::Interrupted);
        }

        info!(path = %file.path.display(), bytes = file.size, "Pulling file");

        let remote = remote_root.join(&file.path);
        let local = local_root.join(&file.path);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }

        let copied = session
            .fetch(&remote, &local)
            .map_err(|e| BackupError::Fetch {
                path: remote.clone(),
                source: Box::new(e),
            })?;

        stats.pulled_files += 1;
        stats.pulled_bytes += copied;
    }

    Ok(stats)
}

//! Incremental sync planning.
//!
//! Compares a remote snapshot with the local archive and decides which
//! directories to create and which files to pull. Uses size + mtime as the
//! change heuristic. Local files that vanished remotely are kept.

use crate::fs::{LocalFileState, RemoteNode, Snapshot};
use std::io;
use std::path::{Path, PathBuf};

/// Work needed to bring the local archive up to date
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Relative directories to create, parents first
    pub create_dirs: Vec<PathBuf>,

    /// Remote files to transfer
    pub pull: Vec<RemoteNode>,

    /// Files already up to date
    pub unchanged_files: usize,
    pub unchanged_bytes: u64,
}

impl SyncPlan {
    pub fn pull_bytes(&self) -> u64 {
        self.pull.iter().map(|f| f.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.create_dirs.is_empty() && self.pull.is_empty()
    }
}

/// Whether a remote file must be (re)transferred.
///
/// Pulls when the local copy is missing, the remote copy is strictly newer,
/// or the sizes differ. A remote file that got older is only re-pulled when
/// its size changed too.
pub fn should_pull(remote: &RemoteNode, local: Option<&LocalFileState>) -> bool {
    match local {
        None => true,
        Some(local) => remote.mtime > local.mtime || remote.size != local.size,
    }
}

/// Build the sync plan for `snapshot` against the archive at `local_root`.
pub fn plan_sync(snapshot: &Snapshot, local_root: &Path) -> io::Result<SyncPlan> {
    let mut plan = SyncPlan::default();

    for dir in &snapshot.dirs {
        if !local_root.join(&dir.path).is_dir() {
            plan.create_dirs.push(dir.path.clone());
        }
    }

    for file in &snapshot.files {
        let local = LocalFileState::stat(&local_root.join(&file.path))?;
        if should_pull(file, local.as_ref()) {
            plan.pull.push(file.clone());
        } else {
            plan.unchanged_files += 1;
            plan.unchanged_bytes += file.size;
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn remote(path: &str, size: u64, mtime: u64) -> RemoteNode {
        RemoteNode {
            path: PathBuf::from(path),
            is_dir: false,
            size,
            mtime,
            atime: mtime,
        }
    }

    fn local(size: u64, mtime: u64) -> LocalFileState {
        LocalFileState { size, mtime }
    }

    #[test]
    fn test_missing_local_always_pulls() {
        for (size, mtime) in [(0, 0), (10, 100), (u64::MAX, u64::MAX)] {
            assert!(should_pull(&remote("f", size, mtime), None));
        }
    }

    #[test]
    fn test_unchanged_never_pulls() {
        // local.mtime >= remote.mtime and equal size
        for (remote_mtime, local_mtime) in [(100, 100), (100, 101), (0, 5_000_000)] {
            assert!(!should_pull(
                &remote("f", 10, remote_mtime),
                Some(&local(10, local_mtime))
            ));
        }
    }

    #[test]
    fn test_newer_remote_pulls() {
        assert!(should_pull(&remote("f", 10, 101), Some(&local(10, 100))));
    }

    #[test]
    fn test_older_remote_only_pulls_on_size_change() {
        assert!(!should_pull(&remote("f", 10, 50), Some(&local(10, 100))));
        assert!(should_pull(&remote("f", 11, 50), Some(&local(10, 100))));
    }

    #[test]
    fn test_plan_against_empty_archive() {
        let out = TempDir::new().unwrap();
        let snapshot = Snapshot {
            dirs: vec![RemoteNode {
                path: PathBuf::from("a"),
                is_dir: true,
                size: 4096,
                mtime: 1,
                atime: 1,
            }],
            files: vec![remote("a/x.txt", 10, 100)],
        };

        let plan = plan_sync(&snapshot, out.path()).unwrap();
        assert_eq!(plan.create_dirs, vec![PathBuf::from("a")]);
        assert_eq!(plan.pull.len(), 1);
        assert_eq!(plan.pull_bytes(), 10);
        assert_eq!(plan.unchanged_files, 0);
    }

    #[test]
    fn test_plan_skips_up_to_date_files() {
        let out = TempDir::new().unwrap();
        fs::create_dir(out.path().join("a")).unwrap();
        fs::write(out.path().join("a/x.txt"), b"0123456789").unwrap();

        // The local copy was written just now, so it is newer than mtime 100.
        let snapshot = Snapshot {
            dirs: vec![RemoteNode {
                path: PathBuf::from("a"),
                is_dir: true,
                size: 4096,
                mtime: 1,
                atime: 1,
            }],
            files: vec![remote("a/x.txt", 10, 100), remote("a/y.txt", 4, 100)],
        };

        let plan = plan_sync(&snapshot, out.path()).unwrap();
        assert!(plan.create_dirs.is_empty());
        assert_eq!(plan.pull, vec![remote("a/y.txt", 4, 100)]);
        assert_eq!(plan.unchanged_files, 1);
        assert_eq!(plan.unchanged_bytes, 10);
    }
}

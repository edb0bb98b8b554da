//! Remote tree snapshots.
//!
//! A snapshot is the full recursive listing of a remote directory, split into
//! directories and files. Both lists are in depth-first pre-order, so every
//! directory appears after its parent.

use crate::remote::{RemoteFileKind, RemoteSession};
use crate::utils::errors::{BackupError, Result};
use std::path::{Path, PathBuf};

/// A file or directory found under the snapshot root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    /// Path relative to the snapshot root
    pub path: PathBuf,

    pub is_dir: bool,

    /// Size in bytes, as listed
    pub size: u64,

    /// Last modified time (seconds since Unix epoch)
    pub mtime: u64,

    /// Last access time (seconds since Unix epoch)
    pub atime: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub dirs: Vec<RemoteNode>,
    pub files: Vec<RemoteNode>,
}

impl Snapshot {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Walk the remote tree under `root`.
///
/// Any listing failure aborts the snapshot; a partial tree is never returned.
pub fn take_snapshot(session: &dyn RemoteSession, root: &Path) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();
    walk(session, root, Path::new(""), &mut snapshot)?;
    Ok(snapshot)
}

fn walk(
    session: &dyn RemoteSession,
    root: &Path,
    relative: &Path,
    snapshot: &mut Snapshot,
) -> Result<()> {
    let dir = if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    };
    let entries = session.read_dir(&dir).map_err(|e| BackupError::Listing {
        path: dir.clone(),
        source: Box::new(e),
    })?;

    for entry in entries {
        if entry.name.is_empty() || entry.name == "." || entry.name == ".." {
            continue;
        }

        let path = relative.join(&entry.name);
        let node = RemoteNode {
            path: path.clone(),
            is_dir: entry.kind == RemoteFileKind::Directory,
            size: entry.size,
            mtime: entry.mtime,
            atime: entry.atime,
        };

        match entry.kind {
            RemoteFileKind::Directory => {
                snapshot.dirs.push(node);
                walk(session, root, &path, snapshot)?;
            }
            RemoteFileKind::File => snapshot.files.push(node),
            RemoteFileKind::Special => {
                tracing::debug!(path = %dir.join(&entry.name).display(), "Skipping special file");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{CommandOutput, RemoteCommand, RemoteDirEntry};
    use std::collections::HashMap;
    use std::io::Write;

    /// Listings keyed by absolute remote directory
    struct ListingSession {
        dirs: HashMap<PathBuf, Vec<RemoteDirEntry>>,
    }

    impl RemoteSession for ListingSession {
        fn read_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
            self.dirs.get(path).cloned().ok_or_else(|| {
                BackupError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ))
            })
        }

        fn fetch(&self, _remote: &Path, _local: &Path) -> Result<u64> {
            unreachable!()
        }

        fn exec(&self, _command: &RemoteCommand, _stdout: &mut dyn Write) -> Result<CommandOutput> {
            unreachable!()
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn dir(name: &str) -> RemoteDirEntry {
        RemoteDirEntry {
            name: name.into(),
            kind: RemoteFileKind::Directory,
            size: 4096,
            mtime: 50,
            atime: 50,
        }
    }

    fn file(name: &str, size: u64, mtime: u64) -> RemoteDirEntry {
        RemoteDirEntry {
            name: name.into(),
            kind: RemoteFileKind::File,
            size,
            mtime,
            atime: mtime + 1,
        }
    }

    fn session(listings: Vec<(&str, Vec<RemoteDirEntry>)>) -> ListingSession {
        ListingSession {
            dirs: listings
                .into_iter()
                .map(|(p, entries)| (PathBuf::from(p), entries))
                .collect(),
        }
    }

    #[test]
    fn test_depth_first_order() {
        let session = session(vec![
            ("/srv", vec![dir("a"), file("top.txt", 3, 10), dir("b")]),
            ("/srv/a", vec![dir("inner"), file("x.txt", 10, 100)]),
            ("/srv/a/inner", vec![file("deep.bin", 7, 20)]),
            ("/srv/b", vec![]),
        ]);

        let snapshot = take_snapshot(&session, Path::new("/srv")).unwrap();

        let dirs: Vec<_> = snapshot.dirs.iter().map(|d| d.path.clone()).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("a"),
                PathBuf::from("a/inner"),
                PathBuf::from("b")
            ]
        );

        let files: Vec<_> = snapshot.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a/inner/deep.bin"),
                PathBuf::from("a/x.txt"),
                PathBuf::from("top.txt")
            ]
        );
        assert_eq!(snapshot.total_bytes(), 20);
    }

    #[test]
    fn test_metadata_taken_verbatim() {
        let session = session(vec![("/srv", vec![file("x.txt", 10, 100)])]);
        let snapshot = take_snapshot(&session, Path::new("/srv")).unwrap();
        assert_eq!(
            snapshot.files[0],
            RemoteNode {
                path: PathBuf::from("x.txt"),
                is_dir: false,
                size: 10,
                mtime: 100,
                atime: 101,
            }
        );
    }

    #[test]
    fn test_subdirectory_listing_failure_aborts() {
        // "/srv/locked" has no listing, so reading it fails.
        let session = session(vec![("/srv", vec![file("ok.txt", 1, 1), dir("locked")])]);
        let err = take_snapshot(&session, Path::new("/srv")).unwrap_err();
        match err {
            BackupError::Listing { path, .. } => assert_eq!(path, PathBuf::from("/srv/locked")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_special_files_are_skipped() {
        let mut fifo = file("queue", 0, 0);
        fifo.kind = RemoteFileKind::Special;
        let session = session(vec![("/srv", vec![fifo, file("real", 1, 1)])]);
        let snapshot = take_snapshot(&session, Path::new("/srv")).unwrap();
        assert_eq!(snapshot.files.len(), 1);
        assert!(snapshot.dirs.is_empty());
    }
}

//! Local file metadata used by the pull decision.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Size and modification time of a file already in the local archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileState {
    /// File size in bytes
    pub size: u64,

    /// Last modified time (seconds since Unix epoch)
    pub mtime: u64,
}

impl LocalFileState {
    /// Stat `path`, returning `None` when nothing exists there.
    pub fn stat(path: &Path) -> io::Result<Option<Self>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mtime = metadata
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Ok(Some(Self {
            size: metadata.len(),
            mtime,
        }))
    }
}

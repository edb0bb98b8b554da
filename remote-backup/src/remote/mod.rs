//! Remote session abstraction.
//!
//! Everything the backup engine needs from a host goes through
//! [`RemoteSession`]: directory listings, file fetches and command execution.
//! The SSH implementation lives in [`ssh`]; tests plug in in-memory sessions.

pub mod command;
pub mod guard;
pub mod proxy;
pub mod ssh;

use crate::config::HostConfig;
use crate::Result;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub use command::RemoteCommand;
pub use guard::{SessionGuard, SessionSlot};
pub use proxy::{Socks5Proxy, TransportConfig};
pub use ssh::SshConnector;

/// Type of a remote directory child, as reported by the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFileKind {
    Directory,
    File,
    /// Sockets, fifos and devices; never transferred
    Special,
}

/// One child of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    pub name: String,
    pub kind: RemoteFileKind,
    pub size: u64,
    /// Seconds since Unix epoch
    pub mtime: u64,
    /// Seconds since Unix epoch
    pub atime: u64,
}

/// Completion status of a remote command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_status: i32,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// An authenticated connection to one host.
pub trait RemoteSession: Send + Sync {
    /// List the immediate children of `path`, without `.` and `..`.
    fn read_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>>;

    /// Copy `remote` into `local`, overwriting it. Returns bytes written.
    fn fetch(&self, remote: &Path, local: &Path) -> Result<u64>;

    /// Run a command, streaming its stdout into `stdout`.
    fn exec(&self, command: &RemoteCommand, stdout: &mut dyn Write) -> Result<CommandOutput>;

    /// Close the connection. Calling it more than once is a no-op.
    fn close(&self) -> Result<()>;

    /// Tear the connection down from another thread while a call may be
    /// blocked on it. Must not wait for that call to return.
    fn interrupt(&self) -> Result<()> {
        self.close()
    }
}

/// Opens sessions for configured hosts.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &HostConfig) -> Result<Arc<dyn RemoteSession>>;
}

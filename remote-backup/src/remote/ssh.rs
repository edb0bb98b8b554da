//! SSH/SFTP session backed by libssh2.

use super::{CommandOutput, Connector, RemoteCommand, RemoteDirEntry, RemoteFileKind, RemoteSession};
use crate::config::HostConfig;
use crate::remote::proxy::TransportConfig;
use crate::utils::errors::{BackupError, Result};
use ssh2::{FileStat, Session, Sftp};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Pause between polls of a command's output streams when neither had data
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Command stderr kept for error reports; the rest is read and dropped
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// Opens [`SshSession`]s using a fixed transport configuration.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    transport: TransportConfig,
}

impl SshConnector {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl Connector for SshConnector {
    fn connect(&self, host: &HostConfig) -> Result<Arc<dyn RemoteSession>> {
        Ok(Arc::new(SshSession::connect(&self.transport, host)?))
    }
}

pub struct SshSession {
    session: Session,
    sftp: Mutex<Sftp>,
    /// Second handle on the session's socket, used to unblock a stuck call
    socket: TcpStream,
    closed: AtomicBool,
}

impl SshSession {
    pub fn connect(transport: &TransportConfig, host: &HostConfig) -> Result<Self> {
        let tcp = transport.open_stream(&host.host, host.port)?;
        let socket = tcp.try_clone()?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        authenticate(&session, host)?;

        let sftp = session.sftp()?;
        Ok(Self {
            session,
            sftp: Mutex::new(sftp),
            socket,
            closed: AtomicBool::new(false),
        })
    }

    fn sftp(&self) -> MutexGuard<'_, Sftp> {
        // A poisoned lock only means another thread panicked mid-call;
        // libssh2 state is still owned by the session.
        self.sftp.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Private key first (when configured), then password.
fn authenticate(session: &Session, host: &HostConfig) -> Result<()> {
    let mut failures = Vec::new();

    if let Some(key) = &host.private_key_path {
        match session.userauth_pubkey_file(&host.username, None, key, None) {
            Ok(()) => return Ok(()),
            Err(e) => failures.push(format!("key {}: {e}", key.display())),
        }
    }

    if let Some(password) = &host.password {
        match session.userauth_password(&host.username, password) {
            Ok(()) => return Ok(()),
            Err(e) => failures.push(format!("password: {e}")),
        }
    }

    if session.authenticated() {
        return Ok(());
    }

    if failures.is_empty() {
        failures.push("no private key or password configured".to_string());
    }
    Err(BackupError::Authentication(format!(
        "{}@{}:{}: {}",
        host.username,
        host.host,
        host.port,
        failures.join("; ")
    )))
}

fn classify(stat: &FileStat) -> RemoteFileKind {
    let file_type = stat.file_type();
    if file_type.is_dir() {
        RemoteFileKind::Directory
    } else if file_type.is_file() || file_type.is_symlink() {
        RemoteFileKind::File
    } else {
        RemoteFileKind::Special
    }
}

impl RemoteSession for SshSession {
    fn read_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
        let listing = self.sftp().readdir(path)?;

        Ok(listing
            .into_iter()
            .filter_map(|(child, stat)| {
                let name = child.file_name()?.to_string_lossy().into_owned();
                Some(RemoteDirEntry {
                    name,
                    kind: classify(&stat),
                    size: stat.size.unwrap_or(0),
                    mtime: stat.mtime.unwrap_or(0),
                    atime: stat.atime.unwrap_or(0),
                })
            })
            .collect())
    }

    fn fetch(&self, remote: &Path, local: &Path) -> Result<u64> {
        let mut source = self.sftp().open(remote)?;
        let mut target = std::fs::File::create(local)?;
        let copied = std::io::copy(&mut source, &mut target)?;
        target.flush()?;
        Ok(copied)
    }

    fn exec(&self, command: &RemoteCommand, stdout: &mut dyn Write) -> Result<CommandOutput> {
        let mut channel = self.session.channel_session()?;
        channel.exec(&command.to_shell())?;

        // Non-blocking while pumping, so the session lock is never held
        // across a read that waits on the remote.
        self.session.set_blocking(false);
        let pumped = pump(&mut channel.stream(0), &mut channel.stderr(), stdout);
        self.session.set_blocking(true);
        let stderr = pumped?;

        channel.wait_close()?;

        Ok(CommandOutput {
            exit_status: channel.exit_status()?,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        })
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.session.disconnect(None, "backup finished", None)?;
        Ok(())
    }

    fn interrupt(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // A disconnect would queue behind the blocked call on the session
        // lock; shutting the socket down makes that call fail instead.
        shutdown_socket(&self.socket)?;
        Ok(())
    }
}

fn shutdown_socket(socket: &TcpStream) -> io::Result<()> {
    match socket.shutdown(Shutdown::Both) {
        Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
        _ => Ok(()),
    }
}

/// Copy `out` into `sink` and collect `err` until both reach EOF, reading
/// whichever has data so neither stream's window fills up while the other
/// is drained. Both readers are expected to be non-blocking.
fn pump(out: &mut impl Read, err: &mut impl Read, sink: &mut dyn Write) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; 32 * 1024];
    let mut stderr = Vec::new();
    let mut out_done = false;
    let mut err_done = false;

    while !(out_done && err_done) {
        let mut idle = true;

        if !out_done {
            match read_ready(out, &mut buf)? {
                Some(0) => out_done = true,
                Some(n) => {
                    sink.write_all(&buf[..n])?;
                    idle = false;
                }
                None => {}
            }
        }

        if !err_done {
            match read_ready(err, &mut buf)? {
                Some(0) => err_done = true,
                Some(n) => {
                    let keep = n.min(MAX_STDERR_BYTES.saturating_sub(stderr.len()));
                    stderr.extend_from_slice(&buf[..keep]);
                    idle = false;
                }
                None => {}
            }
        }

        if idle && !(out_done && err_done) {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    Ok(stderr)
}

/// `None` when the reader has nothing available yet.
fn read_ready(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Option<usize>> {
    match reader.read(buf) {
        Ok(n) => Ok(Some(n)),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::debug!("SSH disconnect on drop failed: {}", e);
        }
    }
}

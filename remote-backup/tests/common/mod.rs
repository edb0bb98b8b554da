//! In-memory remote hosts for driving whole backup runs in tests.

#![allow(dead_code)]

use remote_backup::config::{Config, DatabaseEntryConfig, FileEntryConfig, HostConfig};
use remote_backup::remote::{
    CommandOutput, Connector, RemoteCommand, RemoteDirEntry, RemoteFileKind, RemoteSession,
};
use remote_backup::{BackupError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { content: Vec<u8>, mtime: u64 },
}

/// A fake host with a file tree and a MySQL server
#[derive(Default)]
pub struct FakeHost {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    databases: Mutex<Vec<String>>,
    pub commands: Mutex<Vec<RemoteCommand>>,
    pub fetches: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_dir(&self, path: &str) {
        self.nodes.lock().unwrap().insert(PathBuf::from(path), Node::Dir);
    }

    pub fn add_file(&self, path: &str, content: &[u8], mtime: u64) {
        self.nodes.lock().unwrap().insert(
            PathBuf::from(path),
            Node::File {
                content: content.to_vec(),
                mtime,
            },
        );
    }

    pub fn deny_listing(&self, path: &str) {
        self.unreadable.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn set_databases(&self, names: &[&str]) {
        *self.databases.lock().unwrap() = names.iter().map(|s| s.to_string()).collect();
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn dumped_databases(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.to_shell().contains("mysqldump"))
            .filter_map(|c| c.args.last().cloned())
            .collect()
    }
}

fn not_found(path: &Path) -> BackupError {
    BackupError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

impl RemoteSession for FakeHost {
    fn read_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
        if self.unreadable.lock().unwrap().contains(path) {
            return Err(BackupError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }

        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(not_found(path));
        }

        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                match node {
                    Node::Dir => RemoteDirEntry {
                        name,
                        kind: RemoteFileKind::Directory,
                        size: 4096,
                        mtime: 1,
                        atime: 1,
                    },
                    Node::File { content, mtime } => RemoteDirEntry {
                        name,
                        kind: RemoteFileKind::File,
                        size: content.len() as u64,
                        mtime: *mtime,
                        atime: *mtime,
                    },
                }
            })
            .collect())
    }

    fn fetch(&self, remote: &Path, local: &Path) -> Result<u64> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(remote) {
            Some(Node::File { content, .. }) => {
                std::fs::write(local, content)?;
                self.fetches.fetch_add(1, Ordering::SeqCst);
                Ok(content.len() as u64)
            }
            _ => Err(not_found(remote)),
        }
    }

    fn exec(&self, command: &RemoteCommand, stdout: &mut dyn Write) -> Result<CommandOutput> {
        self.commands.lock().unwrap().push(command.clone());
        let last = command.args.last().cloned().unwrap_or_default();

        if last.starts_with("--execute=") {
            writeln!(stdout, "Database")?;
            for name in self.databases.lock().unwrap().iter() {
                writeln!(stdout, "{name}")?;
            }
            return Ok(CommandOutput::default());
        }

        if self.databases.lock().unwrap().contains(&last) {
            writeln!(stdout, "-- dump of {last}")?;
            return Ok(CommandOutput::default());
        }

        Ok(CommandOutput {
            exit_status: 2,
            stderr: format!("Unknown database '{last}'"),
        })
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out fake hosts by address; unknown addresses refuse the connection.
#[derive(Default)]
pub struct FakeConnector {
    hosts: HashMap<String, Arc<FakeHost>>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn with_host(mut self, address: &str, host: Arc<FakeHost>) -> Self {
        self.hosts.insert(address.to_string(), host);
        self
    }
}

impl Connector for FakeConnector {
    fn connect(&self, host: &HostConfig) -> Result<Arc<dyn RemoteSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.hosts.get(&host.host) {
            Some(fake) => Ok(fake.clone() as Arc<dyn RemoteSession>),
            None => Err(BackupError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{}:{} refused the connection", host.host, host.port),
            ))),
        }
    }
}

pub fn host_config(id: &str, address: &str) -> HostConfig {
    HostConfig {
        id: Some(id.to_string()),
        host: address.to_string(),
        port: 22,
        username: "backup".to_string(),
        password: Some("secret".to_string()),
        private_key_path: None,
        files: Vec::new(),
        mysql: Vec::new(),
    }
}

pub fn files_entry(id: &str, remote_path: &str) -> FileEntryConfig {
    FileEntryConfig {
        id: Some(id.to_string()),
        remote_path: Some(PathBuf::from(remote_path)),
    }
}

pub fn mysql_entry(id: &str, exclude: &[&str], days_to_keep: u32) -> DatabaseEntryConfig {
    DatabaseEntryConfig {
        id: Some(id.to_string()),
        user: Some("root".to_string()),
        password: Some("pw".to_string()),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        days_to_keep,
        mysql_path: "/usr/bin/mysql".to_string(),
        mysqldump_path: "/usr/bin/mysqldump".to_string(),
        ..Default::default()
    }
}

pub fn config(output_dir: &Path, items: Vec<HostConfig>) -> Config {
    Config {
        output_dir: Some(output_dir.to_path_buf()),
        items,
        ..Default::default()
    }
}

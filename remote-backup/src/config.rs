//! Configuration management for the backup runner.
//!
//! Loads the backup definition from a JSON or TOML file. Field names match
//! the historical JSON layout so existing definitions keep working.

use crate::utils::errors::{BackupError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `output_dir`.
pub const OUTPUT_DIR_ENV: &str = "REMOTE_BACKUP_OUTPUT_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Root of the local archive
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Optional SOCKS5 tunnel for every SSH connection
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Hosts to back up, processed in order
    #[serde(default)]
    pub items: Vec<HostConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub socks5: Option<Socks5Config>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Socks5Config {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Host identifier, used as the local directory name
    #[serde(default)]
    pub id: Option<String>,

    /// SSH address
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    #[serde(default)]
    pub files: Vec<FileEntryConfig>,

    #[serde(default)]
    pub mysql: Vec<DatabaseEntryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileEntryConfig {
    #[serde(default)]
    pub id: Option<String>,

    /// Remote directory to mirror
    #[serde(default)]
    pub remote_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseEntryConfig {
    #[serde(default)]
    pub id: Option<String>,

    /// When set, every command runs through `docker exec <container>`
    #[serde(default)]
    pub docker_container: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Database names never dumped, on top of the built-in system schemas
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Retention in days (0 = keep forever)
    #[serde(default)]
    pub days_to_keep: u32,

    #[serde(default = "default_mysql_path")]
    pub mysql_path: String,

    #[serde(default = "default_mysqldump_path")]
    pub mysqldump_path: String,
}

// Default values
fn default_ssh_port() -> u16 {
    22
}

fn default_mysql_path() -> String {
    "/usr/bin/mysql".to_string()
}

fn default_mysqldump_path() -> String {
    "/usr/bin/mysqldump".to_string()
}

impl Default for DatabaseEntryConfig {
    fn default() -> Self {
        Self {
            id: None,
            docker_container: None,
            host: None,
            user: None,
            password: None,
            exclude: Vec::new(),
            days_to_keep: 0,
            mysql_path: default_mysql_path(),
            mysqldump_path: default_mysqldump_path(),
        }
    }
}

impl HostConfig {
    /// Identifier of a validated host.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

impl FileEntryConfig {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

impl DatabaseEntryConfig {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

impl Config {
    /// Load configuration from a file. `.json` files are parsed as JSON,
    /// anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| BackupError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| BackupError::Parse(e.to_string()))
        }
    }

    /// Apply environment overrides (`REMOTE_BACKUP_OUTPUT_DIR`).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                self.output_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Validated output directory.
    pub fn output_dir(&self) -> Result<&Path> {
        self.output_dir
            .as_deref()
            .ok_or_else(|| BackupError::Config("Output directory was not set".into()))
    }

    /// Reject malformed backup definitions before any host is contacted.
    pub fn validate(&self) -> Result<()> {
        self.output_dir()?;

        if self.proxy.enabled && self.proxy.socks5.is_none() {
            return Err(BackupError::Config(
                "proxy is enabled but no socks5 host/port was given".into(),
            ));
        }

        for (index, host) in self.items.iter().enumerate() {
            let host_id = validate_id(host.id.as_deref(), || format!("item #{index}"))?;

            for (n, entry) in host.files.iter().enumerate() {
                let entry_id =
                    validate_id(entry.id.as_deref(), || format!("files #{n} of host {host_id}"))?;
                if entry.remote_path.is_none() {
                    return Err(BackupError::Config(format!(
                        "files entry {entry_id} of host {host_id} has no remote_path"
                    )));
                }
            }

            for (n, entry) in host.mysql.iter().enumerate() {
                validate_id(entry.id.as_deref(), || format!("mysql #{n} of host {host_id}"))?;
            }
        }

        Ok(())
    }
}

/// Ids become local path components, so they must be a single normal name.
fn validate_id<'a>(id: Option<&'a str>, describe: impl Fn() -> String) -> Result<&'a str> {
    let id = match id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(BackupError::Config(format!("ID was not set for {}", describe()))),
    };

    if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
        return Err(BackupError::Config(format!(
            "ID {id:?} of {} is not a valid directory name",
            describe()
        )));
    }

    Ok(id)
}

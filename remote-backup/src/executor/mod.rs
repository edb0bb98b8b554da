//! Run driver: backs up every configured host, one after another.

pub mod host;

use crate::config::{Config, HostConfig};
use crate::remote::{Connector, SessionSlot, SshConnector, TransportConfig};
use crate::utils::errors::{BackupError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

pub use host::{run_host, DatabaseEntryReport, FileEntryReport, HostReport, RunOptions};

/// A host whose backup stopped on an error
#[derive(Debug, Clone)]
pub struct HostFailure {
    pub host: String,
    pub error: String,
}

/// What a run did, host by host
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub completed: Vec<HostReport>,
    pub failed: Vec<HostFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct BackupRunner {
    config: Config,
    output_dir: PathBuf,
    connector: Arc<dyn Connector>,
    options: RunOptions,
}

impl BackupRunner {
    /// Validate the configuration and prepare a run. Any defect here is fatal.
    pub fn new(config: Config, connector: Arc<dyn Connector>, options: RunOptions) -> Result<Self> {
        config.validate()?;
        let output_dir = config.output_dir()?.to_path_buf();

        for wanted in &options.hosts {
            if !config.items.iter().any(|h| h.id() == wanted) {
                return Err(BackupError::Config(format!("unknown host id {wanted:?}")));
            }
        }

        Ok(Self {
            config,
            output_dir,
            connector,
            options,
        })
    }

    /// Runner connecting over SSH, through the configured SOCKS5 proxy if enabled.
    pub fn over_ssh(config: Config, options: RunOptions) -> Result<Self> {
        let transport = TransportConfig::from_config(&config.proxy);
        if let Some(proxy) = &transport.proxy {
            info!("Routing SSH connections through SOCKS5 {}:{}", proxy.host, proxy.port);
        }
        Self::new(config, Arc::new(SshConnector::new(transport)), options)
    }

    fn selected_hosts(&self) -> impl Iterator<Item = &HostConfig> {
        self.config
            .items
            .iter()
            .filter(|h| self.options.hosts.is_empty() || self.options.hosts.iter().any(|w| w == h.id()))
    }

    /// Process hosts in configured order.
    ///
    /// A host that fails is recorded and the run moves on to the next one.
    /// Interruption and configuration defects stop the whole run.
    pub fn run(&self, cancel: &CancellationToken, slot: &SessionSlot) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        let _enter = span.enter();

        if self.options.dry_run {
            info!("Dry run: nothing will be written locally");
        }

        let mut summary = RunSummary {
            run_id,
            completed: Vec::new(),
            failed: Vec::new(),
        };

        for host in self.selected_hosts() {
            if cancel.is_cancelled() {
                return Err(BackupError::Interrupted);
            }

            let host_span = info_span!("host", host = host.id());
            let _host_enter = host_span.enter();

            match run_host(
                self.connector.as_ref(),
                host,
                &self.output_dir,
                &self.options,
                cancel,
                slot,
            ) {
                Ok(report) => summary.completed.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(error = %e, "Backup of host {} failed", host.id());
                    summary.failed.push(HostFailure {
                        host: host.id().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if summary.is_success() {
            info!(hosts = summary.completed.len(), "Backup run finished");
        } else {
            warn!(
                hosts = summary.completed.len(),
                failed = summary.failed.len(),
                "Backup run finished with failures"
            );
        }

        Ok(summary)
    }
}

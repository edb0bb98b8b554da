//! Interrupt handling for SIGTERM and SIGINT.
//!
//! On a signal the run is cancelled and the SSH session in use (if any) is
//! closed. Files or dumps being written are left as they are.

use crate::remote::SessionSlot;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status used after an interrupt (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shutdown coordinator
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
    slot: SessionSlot,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token checked by the run between files, databases and entries
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Where hosts register their open session
    pub fn session_slot(&self) -> SessionSlot {
        self.slot.clone()
    }

    /// Wait for shutdown signal (SIGTERM or SIGINT)
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }
    }

    /// Cancel the run and close the session currently in use.
    pub fn interrupt(&self) {
        self.cancel.cancel();
        if self.slot.close_active() {
            info!("SSH connection closed.");
        }
    }
}

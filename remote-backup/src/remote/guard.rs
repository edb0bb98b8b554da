//! Scoped ownership of the session currently in use.
//!
//! The run driver works on a blocking thread while the signal handler lives
//! on the async runtime. [`SessionSlot`] is the only place they share: it
//! holds either nothing or the one open session, never a half-built one.

use super::RemoteSession;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<Mutex<Option<Arc<dyn RemoteSession>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    /// Take the registered session (if any) and tear it down without waiting
    /// for the call in progress on it. Returns whether a session was closed.
    pub fn close_active(&self) -> bool {
        let Some(session) = self.lock().take() else {
            return false;
        };

        if let Err(e) = session.interrupt() {
            tracing::warn!("Failed to close SSH connection: {}", e);
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn RemoteSession>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registers a session in the slot for its lifetime and closes it on drop.
pub struct SessionGuard {
    session: Arc<dyn RemoteSession>,
    slot: SessionSlot,
}

impl SessionGuard {
    pub fn new(session: Arc<dyn RemoteSession>, slot: &SessionSlot) -> Self {
        *slot.lock() = Some(session.clone());
        Self {
            session,
            slot: slot.clone(),
        }
    }

    pub fn session(&self) -> &dyn RemoteSession {
        self.session.as_ref()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        {
            let mut registered = self.slot.lock();
            if registered
                .as_ref()
                .is_some_and(|s| Arc::ptr_eq(s, &self.session))
            {
                *registered = None;
            }
        }

        match self.session.close() {
            Ok(()) => tracing::info!("SSH connection closed."),
            Err(e) => tracing::warn!("Failed to close SSH connection: {}", e),
        }
    }
}

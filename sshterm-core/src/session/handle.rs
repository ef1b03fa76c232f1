//! The controller's record of its active session.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::CommandSink;

/// Public summary of an active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Unique identifier for this session
    pub id: Uuid,
    /// Remote host
    pub host: String,
    /// Remote user
    pub username: String,
    /// When the shell opened
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    pub(crate) fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            host: host.into(),
            username: username.into(),
            started_at: Utc::now(),
        }
    }
}

/// Owned by the controller while connected
///
/// The transport session and the incoming stream live inside the worker
/// task; the handle keeps the means to stop that task and wait for it.
pub(crate) struct SessionHandle {
    pub(crate) info: SessionInfo,
    pub(crate) sink: CommandSink,
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) const fn new(
        info: SessionInfo,
        sink: CommandSink,
        shutdown: watch::Sender<bool>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            info,
            sink,
            shutdown,
            worker,
        }
    }

    /// Raises the pump's shutdown signal
    pub(crate) fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Signals shutdown and waits for the worker to finish teardown
    pub(crate) async fn shutdown_and_join(self) -> SessionInfo {
        self.signal_shutdown();
        if let Err(e) = self.worker.await {
            tracing::warn!(session_id = %self.info.id, error = %e, "Session worker ended abnormally");
        }
        self.info
    }
}

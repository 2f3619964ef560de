use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Mailer, Notification};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification worker has stopped")]
    WorkerStopped,
}

/// Handle for queueing emails. Cloned into every request through `AppState`.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Spawns the single delivery worker. It exits once every handle is dropped.
    pub fn start(mailer: Arc<dyn Mailer>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, mailer));
        (Self { tx }, worker)
    }

    /// Never blocks and never fails the caller; a stopped worker is only logged.
    pub fn enqueue(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.try_enqueue(notification) {
            warn!(kind, error = %e, "Dropping notification");
        }
    }

    pub fn try_enqueue(&self, notification: Notification) -> Result<(), NotificationError> {
        self.tx.send(notification).map_err(|_| NotificationError::WorkerStopped)
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Notification>, mailer: Arc<dyn Mailer>) {
    while let Some(notification) = rx.recv().await {
        let kind = notification.kind();
        let email = notification.render();
        match mailer.send(&email).await {
            Ok(()) => debug!(kind, to = %email.to, "Notification delivered"),
            // No retries
            Err(e) => error!(kind, to = %email.to, error = %e, "Notification delivery failed"),
        }
    }
    debug!("Notification worker stopped");
}

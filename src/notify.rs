//! Side-channel notifications for the UI shell.
//!
//! Every failure in this crate is surfaced exactly once through this channel
//! and then dropped; nothing retries and nothing escalates to a panic. The
//! front end renders these as toasts; headless callers may simply not
//! subscribe, in which case notifications fall through to the log.

use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, title: impl Into<String>, detail: impl Into<String>) {
        let notification = Notification {
            severity: Severity::Success,
            title: title.into(),
            detail: detail.into(),
        };
        info!(title = %notification.title, detail = %notification.detail, "Notification");
        let _ = self.tx.send(notification);
    }

    pub fn error(&self, title: impl Into<String>, detail: impl Into<String>) {
        let notification = Notification {
            severity: Severity::Error,
            title: title.into(),
            detail: detail.into(),
        };
        warn!(title = %notification.title, detail = %notification.detail, "Notification");
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

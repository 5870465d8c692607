use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Auto-dismiss delay applied when the caller does not pick one.
pub const DEFAULT_DISMISS_MS: i64 = 5000;

/// Visual severity of a transient notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
    Warning,
}

/// A transient notification owned by the [`Notifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Rendering seam for notification and status-indicator side effects.
///
/// The coordinator never touches a UI directly; whatever surface hosts it
/// (terminal, webview, test harness) implements this trait. The default
/// [`TracingSink`] renders through structured logging.
pub trait NotificationSink: Send + Sync {
    /// A notification became visible.
    fn render(&self, notification: &Notification);

    /// A notification was dismissed, either explicitly or by its timer.
    fn dismiss(&self, id: Uuid);

    /// The link status indicator changed.
    fn render_status(&self, connected: bool) {
        let _ = connected;
    }
}

/// Default sink: renders notifications as log lines.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn render(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Error | NotificationKind::Warning => warn!(
                id = %notification.id,
                kind = %notification.kind,
                "{}",
                notification.message
            ),
            _ => info!(
                id = %notification.id,
                kind = %notification.kind,
                "{}",
                notification.message
            ),
        }
    }

    fn dismiss(&self, id: Uuid) {
        debug!(id = %id, "Notification dismissed");
    }

    fn render_status(&self, connected: bool) {
        info!(connected = connected, "Connection status indicator updated");
    }
}

/// Owns the set of currently visible notifications.
///
/// Notifications stack in creation order and are never deduplicated. A
/// notification with a positive dismiss delay is removed by a timer task;
/// one with a delay of zero or less stays until explicitly dismissed.
#[derive(Clone)]
pub struct Notifier {
    active: Arc<RwLock<Vec<Notification>>>,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            active: Arc::new(RwLock::new(Vec::new())),
            sink,
        }
    }

    /// Enqueue a notification and schedule its auto-dismiss timer.
    ///
    /// Must be called from within a tokio runtime when `duration_ms > 0`.
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind, duration_ms: i64) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };

        {
            let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
            active.push(notification.clone());
        }
        self.sink.render(&notification);

        if duration_ms > 0 {
            let notifier = self.clone();
            let id = notification.id;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms as u64)).await;
                notifier.dismiss(id);
            });
        }

        notification
    }

    /// Remove a notification. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let removed = {
            let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
            let before = active.len();
            active.retain(|n| n.id != id);
            active.len() < before
        };
        if removed {
            self.sink.dismiss(id);
        }
        removed
    }

    /// Snapshot of the notifications currently visible, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Forward a status-indicator change to the sink.
    pub fn update_status(&self, connected: bool) {
        self.sink.render_status(connected);
    }

    /// Drop every visible notification. Used on teardown.
    pub fn clear(&self) {
        let dropped: Vec<Uuid> = {
            let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
            let ids = active.iter().map(|n| n.id).collect();
            active.clear();
            ids
        };
        for id in dropped {
            self.sink.dismiss(id);
        }
    }
}

//! User-facing notifications raised by the escrow store.
//!
//! The store talks to a [`Notifier`] chosen at construction time:
//! - [`NoopNotifier`] drops everything (the default)
//! - [`TracingNotifier`] logs toasts and system notifications
//! - [`NotificationLog`] keeps them in memory for a notification list UI
//!
//! Delivery is best-effort. The store logs a failed notification and
//! carries on.

use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Warning,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub read: bool,
}

pub trait Notifier: Send + Sync {
    fn toast(&self, kind: ToastKind, title: &str, message: &str) -> Result<(), NotifyError>;

    fn add_notification(&self, notification: SystemNotification) -> Result<(), NotifyError>;

    fn show_success(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.toast(ToastKind::Success, title, message)
    }

    fn show_error(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.toast(ToastKind::Error, title, message)
    }

    fn show_info(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.toast(ToastKind::Info, title, message)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn toast(&self, _kind: ToastKind, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    fn add_notification(&self, _notification: SystemNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn toast(&self, kind: ToastKind, title: &str, message: &str) -> Result<(), NotifyError> {
        match kind {
            ToastKind::Error => tracing::warn!(title, message, "toast"),
            _ => tracing::info!(?kind, title, message, "toast"),
        }
        Ok(())
    }

    fn add_notification(&self, notification: SystemNotification) -> Result<(), NotifyError> {
        tracing::info!(
            id = %notification.id,
            kind = ?notification.kind,
            title = %notification.title,
            message = %notification.message,
            "system notification"
        );
        Ok(())
    }
}

/// A toast as recorded by [`NotificationLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub message: String,
}

/// Keeps every toast and system notification in memory, newest last.
#[derive(Debug, Default)]
pub struct NotificationLog {
    toasts: Mutex<Vec<Toast>>,
    notifications: Mutex<Vec<SystemNotification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|toasts| toasts.clone())
            .unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<SystemNotification> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .lock()
            .map(|notifications| notifications.iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }

    /// Marks the notification as read. Returns false if no such id exists.
    pub fn mark_read(&self, id: &str) -> bool {
        let Ok(mut notifications) = self.notifications.lock() else {
            return false;
        };
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }
}

impl Notifier for NotificationLog {
    fn toast(&self, kind: ToastKind, title: &str, message: &str) -> Result<(), NotifyError> {
        self.toasts
            .lock()
            .map_err(|_| NotifyError::Unavailable("toast log lock poisoned".into()))?
            .push(Toast {
                kind,
                title: title.to_string(),
                message: message.to_string(),
            });
        Ok(())
    }

    fn add_notification(&self, notification: SystemNotification) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .map_err(|_| NotifyError::Unavailable("notification list lock poisoned".into()))?
            .push(notification);
        Ok(())
    }
}

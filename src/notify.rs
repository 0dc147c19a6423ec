//! Transient user notifications
//!
//! Notices are fire-and-forget: sending never blocks and never fails the caller,
//! even when nobody is listening.

use tokio::sync::mpsc;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational, e.g. voice degraded but text still works
    Info,
    /// Operation failed
    Error,
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message text
    pub message: String,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Cloneable sender for notices
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    /// Create a notifier and the receiving end of its notices
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that only logs
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send a notice at the given level
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };

        match level {
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "user notice"),
            NoticeLevel::Info => {
                tracing::debug!(message = %notice.message, "user notice");
            }
        }

        if let Some(tx) = &self.tx {
            // Receiver gone means the front end is shutting down
            let _ = tx.send(notice);
        }
    }

    /// Send an informational notice
    pub fn info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message);
    }

    /// Send an error notice
    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }
}

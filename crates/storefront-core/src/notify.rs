//! User-visible notifications.
//!
//! The session layer never renders anything itself. Whenever it needs to tell
//! the user something (a rejected login, an expired session, a permission
//! error) it emits a `Notification` to the configured `Notifier`, and the
//! front end decides how to display it.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, info, warn};

/// Shown when a login fails without a server-supplied message.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed, please check your username and password";

/// Shown after a 401 forces the session closed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please log in again";

/// Shown on 403 responses.
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to access this resource";

/// Shown on other error statuses when the server sent no message.
pub const SERVER_ERROR_MESSAGE: &str = "The server encountered an error";

/// Shown when an application-level failure carries no message.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Info => info!(message = %notification.message, "notification"),
            Level::Warning => warn!(message = %notification.message, "notification"),
            Level::Error => error!(message = %notification.message, "notification"),
        }
    }
}

/// Records notifications in emission order.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order_and_drains() {
        let log = NotificationLog::new();
        log.notify(Notification::warning("first"));
        log.notify(Notification::error("second"));

        assert_eq!(log.len(), 2);
        let drained = log.drain();
        assert_eq!(drained[0], Notification::warning("first"));
        assert_eq!(drained[1].level, Level::Error);
        assert!(log.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Notification::error("nope").to_string(), "[error] nope");
    }
}

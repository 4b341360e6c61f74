//! Shopper-facing notices.
//!
//! Cart operations report every outcome (added, out of stock, sync failed...)
//! as a [`Notice`]. Where the notice goes is up to the [`NotificationSink`]:
//! the HTTP layer buffers them per session and hands them back with the next
//! cart response; tests and background tasks just log them.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a notice should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
    /// Error styled to stand out (stock exhausted).
    Alert,
}

/// A short message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            at: Utc::now(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(Severity::Alert, message)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Alert)
    }
}

/// Fire-and-forget destination for notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            tracing::info!(severity = ?notice.severity, message = %notice.message, "shopper notice");
        } else {
            tracing::debug!(severity = ?notice.severity, message = %notice.message, "shopper notice");
        }
    }
}

/// Holds notices until the shopper's next request collects them.
///
/// Only the newest `capacity` notices are kept.
#[derive(Debug)]
pub struct NoticeBuffer {
    capacity: usize,
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBuffer {
    pub const DEFAULT_CAPACITY: usize = 20;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Take every buffered notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.lock().map_or(0, |notices| notices.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NoticeBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl NotificationSink for NoticeBuffer {
    fn notify(&self, notice: Notice) {
        TracingSink.notify(notice.clone());
        let mut notices = match self.notices.lock() {
            Ok(notices) => notices,
            Err(poisoned) => poisoned.into_inner(),
        };
        notices.push(notice);
        if notices.len() > self.capacity {
            let excess = notices.len() - self.capacity;
            notices.drain(..excess);
        }
    }
}

//! User-facing notifications
//!
//! The core never owns a UI. Operations that report success or failure to
//! the user take a sink supplied by the host.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

/// A host capability for showing a leveled message to the user.
pub trait NotificationSink {
    fn notify(&mut self, level: Level, message: &str);
}

/// Routes notifications into the `tracing` pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, level: Level, message: &str) {
        match level {
            Level::Error => tracing::error!(target: "notify", "{}", message),
            Level::Warning => tracing::warn!(target: "notify", "{}", message),
            Level::Info | Level::Success => tracing::info!(target: "notify", %level, "{}", message),
        }
    }
}

/// Keeps every notification; used by tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Vec<(Level, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[(Level, String)] {
        &self.messages
    }

    pub fn last(&self) -> Option<&(Level, String)> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl NotificationSink for MemorySink {
    fn notify(&mut self, level: Level, message: &str) {
        self.messages.push((level, message.to_string()));
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn notify(&mut self, level: Level, message: &str) {
        (**self).notify(level, message)
    }
}

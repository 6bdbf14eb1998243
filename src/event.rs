//! Process-wide event and log hooks.
//!
//! The tree itself stays silent; [`Document`](crate::Document) reports
//! committed transactions, reconcile passes, compactions and rollbacks through
//! these hooks so a host can route them into its own logging stack.

use std::fmt;
use std::sync::{Mutex, OnceLock};

/// Severity attached to [`emit_log`] messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type EventCallback = Box<dyn Fn(&str, &str) + Send + Sync + 'static>;
type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

fn event_slot() -> &'static Mutex<Option<EventCallback>> {
    static SLOT: OnceLock<Mutex<Option<EventCallback>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

fn log_slot() -> &'static Mutex<Option<LogCallback>> {
    static SLOT: OnceLock<Mutex<Option<LogCallback>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

/// Install the event hook, replacing any previous one.
///
/// The hook receives an event name such as `"document.edit"` and a compact
/// `key=value` payload.
pub fn set_event_callback<F>(callback: F)
where
    F: Fn(&str, &str) + Send + Sync + 'static,
{
    if let Ok(mut slot) = event_slot().lock() {
        *slot = Some(Box::new(callback));
    }
}

/// Remove the event hook.
pub fn clear_event_callback() {
    if let Ok(mut slot) = event_slot().lock() {
        *slot = None;
    }
}

/// Emit an event to the installed hook, if any.
pub fn emit_event(name: &str, data: &str) {
    if let Ok(slot) = event_slot().lock() {
        if let Some(callback) = slot.as_ref() {
            callback(name, data);
        }
    }
}

/// Install the log hook, replacing any previous one.
pub fn set_log_callback<F>(callback: F)
where
    F: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    if let Ok(mut slot) = log_slot().lock() {
        *slot = Some(Box::new(callback));
    }
}

/// Remove the log hook.
pub fn clear_log_callback() {
    if let Ok(mut slot) = log_slot().lock() {
        *slot = None;
    }
}

/// Emit a log message to the installed hook, if any.
pub fn emit_log(level: LogLevel, message: &str) {
    if let Ok(slot) = log_slot().lock() {
        if let Some(callback) = slot.as_ref() {
            callback(level, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_and_log_hooks() {
        let events = Arc::new(AtomicUsize::new(0));
        let events_clone = Arc::clone(&events);
        set_event_callback(move |name, data| {
            if name == "unit.event" {
                assert_eq!(data, "version=3");
                events_clone.fetch_add(1, Ordering::SeqCst);
            }
        });
        emit_event("unit.event", "version=3");
        assert_eq!(events.load(Ordering::SeqCst), 1);

        let logs = Arc::new(AtomicUsize::new(0));
        let logs_clone = Arc::clone(&logs);
        set_log_callback(move |level, msg| {
            if msg == "unit log" {
                assert_eq!(level, LogLevel::Warn);
                logs_clone.fetch_add(1, Ordering::SeqCst);
            }
        });
        emit_log(LogLevel::Warn, "unit log");
        assert_eq!(logs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Error);
        assert_eq!(LogLevel::Info.to_string(), "info");
    }
}

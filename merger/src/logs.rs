//! Console progress log.
//!
//! Every step of a merge reports through one process-wide [`ConsoleLog`],
//! which prints entries with a level prefix and keeps a warning count
//! for the final summary. `SHEETMERGE_LOG` sets the minimum level.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

pub const ENV_LOG: &str = "SHEETMERGE_LOG";

/// Log level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    /// Parse a `SHEETMERGE_LOG` value. `off` maps to `None`.
    pub fn parse(value: &str) -> Option<Option<LogLevel>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" | "" => Some(Some(LogLevel::Info)),
            "success" => Some(Some(LogLevel::Success)),
            "warning" | "warn" => Some(Some(LogLevel::Warning)),
            "error" => Some(Some(LogLevel::Error)),
            "off" | "none" => Some(None),
            _ => None,
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth (per-file detail lines sit one level in)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Render the entry as a console line
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global console log
pub static CONSOLE: Lazy<ConsoleLog> = Lazy::new(ConsoleLog::from_env);

const LEVEL_OFF: u8 = u8::MAX;

/// Prints entries at or above a minimum level and counts warnings.
pub struct ConsoleLog {
    min_level: AtomicU8,
    warnings: AtomicUsize,
}

impl ConsoleLog {
    pub fn new(min_level: Option<LogLevel>) -> Self {
        Self {
            min_level: AtomicU8::new(min_level.map_or(LEVEL_OFF, |l| l as u8)),
            warnings: AtomicUsize::new(0),
        }
    }

    fn from_env() -> Self {
        let level = std::env::var(ENV_LOG)
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(Some(LogLevel::Info));
        Self::new(level)
    }

    pub fn set_min_level(&self, level: Option<LogLevel>) {
        self.min_level
            .store(level.map_or(LEVEL_OFF, |l| l as u8), Ordering::Relaxed);
    }

    /// Whether an entry of `level` would be printed
    pub fn enabled(&self, level: LogLevel) -> bool {
        let min = self.min_level.load(Ordering::Relaxed);
        min != LEVEL_OFF && level as u8 >= min
    }

    /// Record an entry; prints it when enabled
    pub fn log(&self, entry: LogEntry) {
        if entry.level == LogLevel::Warning {
            self.warnings.fetch_add(1, Ordering::Relaxed);
        }

        if self.enabled(entry.level) {
            println!("{}", entry.render());
        }
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(Some(LogLevel::Info))
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    CONSOLE.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    CONSOLE.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    CONSOLE.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    CONSOLE.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    CONSOLE.log(LogEntry::info(msg).with_indent(indent));
}

pub fn log_success_indent(msg: impl Into<String>, indent: u8) {
    CONSOLE.log(LogEntry::success(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("WARN"), Some(Some(LogLevel::Warning)));
        assert_eq!(LogLevel::parse("off"), Some(None));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_min_level_filter() {
        let log = ConsoleLog::new(Some(LogLevel::Warning));
        assert!(!log.enabled(LogLevel::Info));
        assert!(log.enabled(LogLevel::Error));

        log.set_min_level(None);
        assert!(!log.enabled(LogLevel::Error));
    }

    #[test]
    fn test_counts_even_when_silent() {
        let log = ConsoleLog::new(None);
        log.log(LogEntry::warning("sheet exists"));
        log.log(LogEntry::error("failed"));
        log.log(LogEntry::info("ignored"));
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_render_indent() {
        let line = LogEntry::success("Copied").with_indent(1).render();
        assert!(line.starts_with("      ✓"));
        assert!(line.ends_with("Copied"));
    }
}

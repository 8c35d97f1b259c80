//! Log levels, run-log options and line decorations.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity of a run-log line, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Options of one [`RunLogger`](super::RunLogger), taken from `[logging]`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Tool stderr lines kept for `show_tail` (0 disables the buffer).
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            error_tail: settings.error_tail,
            show_timestamps: settings.show_timestamps,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&LoggingSettings::default())
    }
}

/// Callback receiving every formatted log line (the CLI prints them).
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// How a line is decorated before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// `$ imctools convert ...`
    Command,
    /// `=== Convert ===`
    Phase,
    Success,
    Warning,
    Error,
}

impl LineKind {
    pub(crate) fn decorate(self, message: &str) -> String {
        match self {
            LineKind::Command => format!("$ {message}"),
            LineKind::Phase => format!("=== {message} ==="),
            LineKind::Success => format!("[SUCCESS] {message}"),
            LineKind::Warning => format!("[WARNING] {message}"),
            LineKind::Error => format!("[ERROR] {message}"),
        }
    }
}

//! Log entries and their logfmt rendering

use std::fmt::{self, Display, Write as _};

use chrono::{DateTime, SecondsFormat, Utc};

/// Severity of a diagnostic entry.
///
/// Ordered from least to most severe so filters can compare levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Warning and error entries count towards the error counter.
    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a level name as used by the `LOGLEVEL` environment variable.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured diagnostic entry: a level, a message and ordered key/value
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub fields: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), fields: Vec::new(), timestamp: Utc::now() }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Append a field. Fields keep insertion order.
    pub fn field(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Copy of this entry with extra context fields appended.
    pub fn with_context(&self, context: &[(String, String)]) -> Self {
        let mut entry = self.clone();
        entry.fields.extend(context.iter().cloned());
        entry
    }

    /// Fields rendered as `key=value` pairs separated by spaces.
    pub fn fields_logfmt(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            push_pair(&mut out, key, value);
        }
        out
    }

    /// Render as a single logfmt line:
    /// `ts=2024-01-02T03:04:05.678Z level=warn msg="Failed to connect" err=...`
    pub fn to_logfmt(&self) -> String {
        let mut out = String::with_capacity(64 + self.message.len());
        push_pair(&mut out, "ts", &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
        out.push(' ');
        push_pair(&mut out, "level", self.level.as_str());
        out.push(' ');
        push_pair(&mut out, "msg", &self.message);
        for (key, value) in &self.fields {
            out.push(' ');
            push_pair(&mut out, key, value);
        }
        out
    }
}

fn push_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    if needs_quotes(value) {
        out.push('"');
        for c in value.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(out, "\\u{{{:x}}}", c as u32);
                }
                c => out.push(c),
            }
        }
        out.push('"');
    } else {
        out.push_str(value);
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.chars().any(|c| c == ' ' || c == '=' || c == '"' || c == '\\' || c.is_control())
}

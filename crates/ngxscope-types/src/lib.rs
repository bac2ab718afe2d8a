//! Shared types for ngxscope
//!
//! This crate contains data structures used across multiple ngxscope crates.

use chrono::{DateTime, FixedOffset};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Channels and events
// ============================================================================

/// A named logical nginx log stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    Access,
    Error,
}

impl LogChannel {
    /// Every channel, in display order
    pub const ALL: [LogChannel; 2] = [LogChannel::Access, LogChannel::Error];

    /// Name used by the poll endpoint's `type` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Error => "error",
        }
    }

    /// Name of the push event carrying this channel's lines
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Access => "access_event",
            Self::Error => "error_event",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "access_event" => Some(Self::Access),
            "error_event" => Some(Self::Error),
            _ => None,
        }
    }

    /// Pane title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Access => "Access Events",
            Self::Error => "Error Events",
        }
    }

    /// Parser rules that apply to lines of this channel
    pub fn format(&self) -> LineFormat {
        match self {
            Self::Access => LineFormat::Access,
            Self::Error => LineFormat::FreeText,
        }
    }

    /// Dense index, for per-channel arrays
    pub fn index(&self) -> usize {
        match self {
            Self::Access => 0,
            Self::Error => 1,
        }
    }

    /// The other channel
    pub fn sibling(&self) -> Self {
        match self {
            Self::Access => Self::Error,
            Self::Error => Self::Access,
        }
    }
}

impl std::fmt::Display for LogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How log lines are acquired from the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Subscribe to `access_event` / `error_event` and append each line
    Push,
    /// Periodically fetch the last N lines of each channel
    #[default]
    Poll,
}

impl SourceMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

/// Which pattern set the line parser applies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineFormat {
    /// Combined web-access log lines
    Access,
    /// Error log and systemd journal lines
    FreeText,
}

/// Rejection of an untyped event payload at the subscription boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("unknown event name `{0}`")]
    UnknownEvent(String),
    #[error("event `{event}` carried a {kind} payload, expected a string")]
    NotAString { event: String, kind: &'static str },
}

/// One new log line delivered by the push event source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub channel: LogChannel,
    pub line: String,
}

impl LogEvent {
    pub fn new(channel: LogChannel, line: impl Into<String>) -> Self {
        Self {
            channel,
            line: line.into(),
        }
    }

    /// Validate a raw bridge payload before it enters the pipeline
    pub fn from_payload(event_name: &str, payload: serde_json::Value) -> Result<Self, EventError> {
        let channel = LogChannel::from_event_name(event_name)
            .ok_or_else(|| EventError::UnknownEvent(event_name.to_string()))?;

        match payload {
            serde_json::Value::String(line) => Ok(Self { channel, line }),
            other => Err(EventError::NotAString {
                event: event_name.to_string(),
                kind: json_kind(&other),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// Parsed entries
// ============================================================================

/// Severity inferred from free-text lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
    #[default]
    Unclassified,
}

impl Severity {
    /// Keyword search order; the first hit wins
    pub const KEYWORDS: [(&'static str, Severity); 4] = [
        ("error", Severity::Error),
        ("warn", Severity::Warn),
        ("info", Severity::Info),
        ("debug", Severity::Debug),
    ];

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERR",
            Self::Warn => "WRN",
            Self::Info => "INF",
            Self::Debug => "DBG",
            Self::Unclassified => "---",
        }
    }

    /// Get display color for this severity
    pub fn color(&self) -> Color {
        match self {
            Self::Error => Color::Red,
            Self::Warn => Color::Yellow,
            Self::Info => Color::Green,
            Self::Debug => Color::Cyan,
            Self::Unclassified => Color::White,
        }
    }
}

/// Fields of one combined-format access log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessRecord {
    pub ip: String,
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub status: String,
    pub size: String,
    pub referrer: String,
    pub user_agent: String,
}

impl AccessRecord {
    pub fn status_code(&self) -> Option<u16> {
        self.status.parse().ok()
    }

    /// Parse the bracketed timestamp, e.g. `15/Jun/2024:12:34:56 +0000`
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.timestamp, "%d/%b/%Y:%H:%M:%S %z").ok()
    }

    /// Display color for the status code class
    pub fn status_color(&self) -> Color {
        match self.status_code() {
            Some(200..=299) => Color::Green,
            Some(300..=399) => Color::Cyan,
            Some(400..=499) => Color::Yellow,
            Some(500..=599) => Color::Red,
            _ => Color::White,
        }
    }
}

/// Error log / journal line split into timestamp, severity and message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreeTextRecord {
    pub timestamp: Option<String>,
    pub severity: Severity,
    pub message: String,
}

/// Display model computed on demand from a raw line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLogEntry {
    Access(AccessRecord),
    FreeText(FreeTextRecord),
    /// The line did not fit the expected shape; carries it verbatim
    Unparsed(String),
}

impl ParsedLogEntry {
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Self::Unparsed(_))
    }
}

/// How log rows are presented
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Raw,
    Formatted,
}

impl DisplayMode {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Raw => Self::Formatted,
            Self::Formatted => Self::Raw,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Formatted => "formatted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_payload_validation() {
        let event = LogEvent::from_payload("access_event", json!("GET / 200")).unwrap();
        assert_eq!(event.channel, LogChannel::Access);
        assert_eq!(event.line, "GET / 200");

        let err = LogEvent::from_payload("error_event", json!({"line": "x"})).unwrap_err();
        assert!(matches!(err, EventError::NotAString { kind: "object", .. }));

        let err = LogEvent::from_payload("test_event", json!("x")).unwrap_err();
        assert_eq!(err, EventError::UnknownEvent("test_event".to_string()));
    }

    #[test]
    fn test_channel_names() {
        for channel in LogChannel::ALL {
            assert_eq!(LogChannel::from_event_name(channel.event_name()), Some(channel));
            assert_eq!(channel.sibling().sibling(), channel);
        }
        assert_eq!(LogChannel::Error.as_str(), "error");
    }

    #[test]
    fn test_access_record_helpers() {
        let record = AccessRecord {
            ip: "10.0.0.1".to_string(),
            timestamp: "15/Jun/2024:12:34:56 +0000".to_string(),
            method: "GET".to_string(),
            path: "/".to_string(),
            protocol: "HTTP/1.1".to_string(),
            status: "404".to_string(),
            size: "-".to_string(),
            referrer: "-".to_string(),
            user_agent: "curl/8.0".to_string(),
        };
        assert_eq!(record.status_code(), Some(404));
        assert_eq!(record.status_color(), Color::Yellow);
        let time = record.time().unwrap();
        assert_eq!(time.format("%H:%M:%S").to_string(), "12:34:56");
    }

    #[test]
    fn test_display_mode_toggle() {
        assert_eq!(DisplayMode::default(), DisplayMode::Raw);
        assert_eq!(DisplayMode::Raw.toggle(), DisplayMode::Formatted);
        assert_eq!(DisplayMode::Formatted.toggle(), DisplayMode::Raw);
    }
}

use std::sync::LazyLock;

use regex::Regex;

use ngxscope_types::{AccessRecord, FreeTextRecord, LineFormat, ParsedLogEntry, Severity};

/// Combined log format: `<ip> - - [<ts>] "<method> <path> <proto>" <status> <size> "<ref>" "<ua>"`
static ACCESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\S+) \S+ \S+ \[([^\]]+)\] "(\S+) (\S+) (\S+)" (\d{3}) (\d+|-) "([^"]*)" "([^"]*)""#,
    )
    .expect("access log pattern compiles")
});

/// Leading syslog-style timestamp: `Jun 15 12:34:56`
static SYSLOG_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})(?:\s+(.*))?$")
        .expect("syslog timestamp pattern compiles")
});

/// Log parser for extracting structure from raw log lines
///
/// Parsing is a best-effort heuristic. Lines that do not fit the access
/// pattern come back as [`ParsedLogEntry::Unparsed`]; nothing here panics.
pub struct LogParser;

impl LogParser {
    /// Parse a raw log line with the rules for `format`
    pub fn parse(raw: &str, format: LineFormat) -> ParsedLogEntry {
        let line = raw.trim_end_matches(['\r', '\n']);
        match format {
            LineFormat::Access => Self::parse_access(line)
                .map(ParsedLogEntry::Access)
                .unwrap_or_else(|| ParsedLogEntry::Unparsed(raw.to_string())),
            LineFormat::FreeText => ParsedLogEntry::FreeText(Self::parse_free_text(line)),
        }
    }

    /// Extract combined-format fields, or `None` if the line does not match
    pub fn parse_access(line: &str) -> Option<AccessRecord> {
        let caps = ACCESS_PATTERN.captures(line)?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();

        Some(AccessRecord {
            ip: field(1),
            timestamp: field(2),
            method: field(3),
            path: field(4),
            protocol: field(5),
            status: field(6),
            size: field(7),
            referrer: field(8),
            user_agent: field(9),
        })
    }

    /// Split a free-text line into an optional leading timestamp and message
    pub fn parse_free_text(line: &str) -> FreeTextRecord {
        let severity = Self::classify(line);

        if let Some(caps) = SYSLOG_TIMESTAMP.captures(line) {
            let timestamp = caps.get(1).map(|m| m.as_str().to_string());
            let message = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            return FreeTextRecord {
                timestamp,
                severity,
                message: message.to_string(),
            };
        }

        FreeTextRecord {
            timestamp: None,
            severity,
            message: line.trim().to_string(),
        }
    }

    /// Infer severity by case-insensitive keyword search
    ///
    /// The first keyword found in the order error, warn, info, debug wins.
    /// A line that merely mentions "error" is classified as an error.
    pub fn classify(line: &str) -> Severity {
        let lower = line.to_lowercase();
        Severity::KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, severity)| *severity)
            .unwrap_or_default()
    }
}

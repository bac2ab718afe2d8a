use ngxscope_types::{DisplayMode, LogChannel, ParsedLogEntry};

use crate::parser::LogParser;

/// One renderable row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Row<'a> {
    /// Unmodified text
    Raw(&'a str),
    /// Structured record, or a raw-fallback entry when the line did not parse
    Parsed { raw: &'a str, entry: ParsedLogEntry },
}

/// Why a channel has nothing to show
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// No line has been received yet
    NoData,
    /// The search query matched none of the available lines
    NoMatches { available: usize },
}

impl Placeholder {
    /// The user should be told to clear the search
    pub fn suggests_clearing_search(&self) -> bool {
        matches!(self, Self::NoMatches { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection<'a> {
    Rows(Vec<Row<'a>>),
    Empty(Placeholder),
}

/// Map filtered lines to rows for `mode`
///
/// `available` is the unfiltered line count of the channel; it decides which
/// placeholder an empty input produces.
pub fn project<'a>(
    lines: &[&'a str],
    available: usize,
    mode: DisplayMode,
    channel: LogChannel,
) -> Projection<'a> {
    if lines.is_empty() {
        return Projection::Empty(if available == 0 {
            Placeholder::NoData
        } else {
            Placeholder::NoMatches { available }
        });
    }

    let rows = match mode {
        DisplayMode::Raw => lines.iter().map(|line| Row::Raw(*line)).collect(),
        DisplayMode::Formatted => lines
            .iter()
            .map(|line| Row::Parsed {
                raw: *line,
                entry: LogParser::parse(line, channel.format()),
            })
            .collect(),
    };

    Projection::Rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngxscope_types::Severity;

    const ACCESS: &str = r#"192.168.1.1 - - [15/Jun/2024:12:34:56 +0000] "GET /index.html HTTP/1.1" 200 512 "http://example.com/prev.html" "Mozilla/5.0""#;

    #[test]
    fn test_raw_mode_is_one_row_per_line() {
        let lines = [ACCESS, "garbage"];
        let Projection::Rows(rows) = project(&lines, 2, DisplayMode::Raw, LogChannel::Access) else {
            panic!("expected rows");
        };
        assert_eq!(rows, vec![Row::Raw(ACCESS), Row::Raw("garbage")]);
    }

    #[test]
    fn test_formatted_mode_mixes_structured_and_fallback_rows() {
        let lines = [ACCESS, "garbage"];
        let Projection::Rows(rows) =
            project(&lines, 2, DisplayMode::Formatted, LogChannel::Access)
        else {
            panic!("expected rows");
        };
        assert!(matches!(&rows[0], Row::Parsed { entry: ParsedLogEntry::Access(r), .. } if r.ip == "192.168.1.1"));
        assert!(matches!(&rows[1], Row::Parsed { entry: ParsedLogEntry::Unparsed(s), .. } if s == "garbage"));
        assert!(matches!(&rows[1], Row::Parsed { raw: "garbage", .. }));
    }

    #[test]
    fn test_formatted_error_channel_uses_free_text_rules() {
        let lines = ["2024/06/15 12:00:00 [warn] 12#0: conflicting server name"];
        let Projection::Rows(rows) =
            project(&lines, 1, DisplayMode::Formatted, LogChannel::Error)
        else {
            panic!("expected rows");
        };
        assert!(matches!(
            &rows[0],
            Row::Parsed { entry: ParsedLogEntry::FreeText(r), .. } if r.severity == Severity::Warn
        ));
    }

    #[test]
    fn test_empty_and_filtered_empty_are_distinct() {
        let never = project(&[], 0, DisplayMode::Raw, LogChannel::Access);
        let filtered = project(&[], 5, DisplayMode::Raw, LogChannel::Access);

        assert_eq!(never, Projection::Empty(Placeholder::NoData));
        assert_eq!(
            filtered,
            Projection::Empty(Placeholder::NoMatches { available: 5 })
        );
        assert_ne!(never, filtered);
        assert!(!Placeholder::NoData.suggests_clearing_search());
        assert!(Placeholder::NoMatches { available: 5 }.suggests_clearing_search());
    }
}

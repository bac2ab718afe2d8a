use tracing::debug;

use ngxscope_types::{DisplayMode, LogChannel};

use crate::acquire::{FetchError, LogUpdate};
use crate::buffer::{LogBuffer, MAX_LOG_LINES};
use crate::filter::{FilterCache, SearchQuery, filter_lines};
use crate::projector::{Projection, project};

/// State of one log view: a buffer per channel plus search and display mode
///
/// Only [`LogView::apply`] and [`LogView::clear_all`] mutate the buffers.
/// Once deactivated, updates are ignored.
pub struct LogView {
    buffers: [LogBuffer; 2],

    /// Last fetch failure per channel (poll mode)
    errors: [Option<FetchError>; 2],

    /// Sequence number of the newest applied poll result per channel
    applied_seq: [Option<u64>; 2],

    /// Memoized filter results per channel
    caches: [FilterCache; 2],

    query: SearchQuery,
    mode: DisplayMode,
    active: bool,
}

impl LogView {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: [LogBuffer::new(capacity), LogBuffer::new(capacity)],
            errors: [None, None],
            applied_seq: [None, None],
            caches: [FilterCache::default(), FilterCache::default()],
            query: SearchQuery::default(),
            mode: DisplayMode::default(),
            active: true,
        }
    }

    /// Apply one update; returns whether the view changed
    pub fn apply(&mut self, update: LogUpdate) -> bool {
        if !self.active {
            return false;
        }

        match update {
            LogUpdate::Line(event) => {
                self.buffers[event.channel.index()].push(event.line);
                true
            }
            LogUpdate::Snapshot {
                channel,
                seq,
                lines,
            } => {
                if self.is_stale(channel, seq) {
                    debug!(%channel, seq, "discarding out-of-order snapshot");
                    return false;
                }
                let i = channel.index();
                self.applied_seq[i] = Some(seq);
                self.buffers[i].replace(lines);
                self.errors[i] = None;
                true
            }
            LogUpdate::FetchFailed {
                channel,
                seq,
                error,
            } => {
                if self.is_stale(channel, seq) {
                    debug!(%channel, seq, "discarding out-of-order fetch failure");
                    return false;
                }
                // Previous lines stay visible
                let i = channel.index();
                self.applied_seq[i] = Some(seq);
                self.errors[i] = Some(error);
                true
            }
        }
    }

    fn is_stale(&self, channel: LogChannel, seq: u64) -> bool {
        self.applied_seq[channel.index()].is_some_and(|applied| seq <= applied)
    }

    pub fn buffer(&self, channel: LogChannel) -> &LogBuffer {
        &self.buffers[channel.index()]
    }

    pub fn error(&self, channel: LogChannel) -> Option<&FetchError> {
        self.errors[channel.index()].as_ref()
    }

    /// Empty every channel and forget fetch errors
    pub fn clear_all(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.errors = [None, None];
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Replace the search text; filtering is live
    pub fn set_query(&mut self, text: &str) {
        if text != self.query.as_str() {
            self.query = SearchQuery::new(text);
        }
    }

    pub fn clear_query(&mut self) {
        self.set_query("");
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
    }

    /// Bring the memoized filter results up to date
    pub fn sync_filters(&mut self) {
        for channel in LogChannel::ALL {
            let i = channel.index();
            self.caches[i].refresh(&self.buffers[i], &self.query);
        }
    }

    /// Lines of `channel` matching the current query, oldest first
    pub fn visible(&self, channel: LogChannel) -> Vec<&str> {
        let i = channel.index();
        let buffer = &self.buffers[i];
        match self.caches[i].indices(buffer, &self.query) {
            Some(indices) => indices.iter().filter_map(|&n| buffer.get(n)).collect(),
            None => filter_lines(buffer.iter(), &self.query),
        }
    }

    /// Rows for the whole filtered channel in the current mode
    pub fn projection(&self, channel: LogChannel) -> Projection<'_> {
        let lines = self.visible(channel);
        project(&lines, self.buffer(channel).len(), self.mode, channel)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop accepting updates
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(MAX_LOG_LINES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{Placeholder, Row};
    use ngxscope_types::LogEvent;

    fn snapshot(channel: LogChannel, seq: u64, lines: &[&str]) -> LogUpdate {
        LogUpdate::Snapshot {
            channel,
            seq,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn failure(channel: LogChannel, seq: u64) -> LogUpdate {
        LogUpdate::FetchFailed {
            channel,
            seq,
            error: FetchError::Backend("permission denied".to_string()),
        }
    }

    #[test]
    fn test_push_lines_append_per_channel() {
        let mut view = LogView::default();
        view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Access, "a1")));
        view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Error, "e1")));
        view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Access, "a2")));

        assert_eq!(view.visible(LogChannel::Access), vec!["a1", "a2"]);
        assert_eq!(view.visible(LogChannel::Error), vec!["e1"]);
    }

    #[test]
    fn test_failure_in_one_channel_keeps_both_buffers() {
        let mut view = LogView::default();
        view.apply(snapshot(LogChannel::Access, 1, &["old access"]));
        view.apply(snapshot(LogChannel::Error, 1, &["old error"]));

        view.apply(failure(LogChannel::Access, 2));
        view.apply(snapshot(LogChannel::Error, 2, &["new error"]));

        assert_eq!(view.visible(LogChannel::Access), vec!["old access"]);
        assert_eq!(view.visible(LogChannel::Error), vec!["new error"]);
        assert_eq!(
            view.error(LogChannel::Access),
            Some(&FetchError::Backend("permission denied".to_string()))
        );
        assert_eq!(view.error(LogChannel::Error), None);
    }

    #[test]
    fn test_success_clears_channel_error() {
        let mut view = LogView::default();
        view.apply(failure(LogChannel::Error, 1));
        assert!(view.error(LogChannel::Error).is_some());

        view.apply(snapshot(LogChannel::Error, 2, &["ok"]));
        assert!(view.error(LogChannel::Error).is_none());
    }

    #[test]
    fn test_older_completion_is_discarded() {
        let mut view = LogView::default();
        assert!(view.apply(snapshot(LogChannel::Access, 3, &["newest"])));
        assert!(!view.apply(snapshot(LogChannel::Access, 2, &["older"])));
        assert!(!view.apply(failure(LogChannel::Access, 1)));

        assert_eq!(view.visible(LogChannel::Access), vec!["newest"]);
        assert!(view.error(LogChannel::Access).is_none());

        // Sequence numbers are tracked per channel
        assert!(view.apply(snapshot(LogChannel::Error, 1, &["e"])));
    }

    #[test]
    fn test_clear_all_resets_buffers_and_errors() {
        let mut view = LogView::default();
        view.apply(snapshot(LogChannel::Access, 1, &["a"]));
        view.apply(failure(LogChannel::Error, 1));

        view.clear_all();

        assert!(view.buffer(LogChannel::Access).is_empty());
        assert!(view.buffer(LogChannel::Error).is_empty());
        assert!(view.error(LogChannel::Error).is_none());
        assert_eq!(
            view.projection(LogChannel::Access),
            Projection::Empty(Placeholder::NoData)
        );
    }

    #[test]
    fn test_query_filters_without_refetch() {
        let mut view = LogView::default();
        view.apply(snapshot(
            LogChannel::Access,
            1,
            &["GET /a", "POST /b", "get /c", "PUT /d", "DELETE /e"],
        ));

        view.set_query("get");
        view.sync_filters();
        assert_eq!(view.visible(LogChannel::Access), vec!["GET /a", "get /c"]);

        view.set_query("nothing-matches");
        assert_eq!(
            view.projection(LogChannel::Access),
            Projection::Empty(Placeholder::NoMatches { available: 5 })
        );

        view.clear_query();
        assert_eq!(view.visible(LogChannel::Access).len(), 5);
    }

    #[test]
    fn test_cached_and_uncached_visible_agree() {
        let mut view = LogView::default();
        for i in 0..50 {
            view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Error, format!("line {i}"))));
        }
        view.set_query("1");

        let uncached: Vec<String> = view
            .visible(LogChannel::Error)
            .iter()
            .map(|s| s.to_string())
            .collect();
        view.sync_filters();
        let cached = view.visible(LogChannel::Error);
        assert_eq!(cached, uncached);
    }

    #[test]
    fn test_mode_toggle_changes_rows() {
        let mut view = LogView::default();
        view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Access, "not an access line")));

        assert!(matches!(
            view.projection(LogChannel::Access),
            Projection::Rows(rows) if rows == vec![Row::Raw("not an access line")]
        ));

        view.toggle_mode();
        assert_eq!(view.mode(), DisplayMode::Formatted);
        let Projection::Rows(rows) = view.projection(LogChannel::Access) else {
            panic!("expected rows");
        };
        assert!(matches!(&rows[0], Row::Parsed { entry, .. } if entry.is_unparsed()));
    }

    #[test]
    fn test_deactivated_view_ignores_updates() {
        let mut view = LogView::default();
        view.deactivate();
        assert!(!view.apply(LogUpdate::Line(LogEvent::new(LogChannel::Access, "late"))));
        assert!(!view.apply(snapshot(LogChannel::Error, 1, &["late"])));
        assert!(view.buffer(LogChannel::Access).is_empty());
        assert!(view.buffer(LogChannel::Error).is_empty());
    }
}
